use clap::Parser;
use domtrace_cli::CliConfigOverrides;
use domtrace_cli::record::run_record;
use domtrace_cli::recordings::ShowCommand;
use domtrace_cli::recordings::run_analyze;
use domtrace_cli::recordings::run_delete;
use domtrace_cli::recordings::run_list;
use domtrace_cli::recordings::run_show;
use tracing_subscriber::EnvFilter;

/// Record browser sessions (DOM mutations, console output, errors and
/// clicks) to JSON and inspect them later.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct MultitoolCli {
    #[clap(flatten)]
    config_overrides: CliConfigOverrides,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Open a browser and record until Enter is pressed.
    Record {
        /// Page to open once capture is attached.
        url: Option<String>,
    },

    /// List saved recordings, newest first.
    #[clap(visible_alias = "ls")]
    List,

    /// Print a saved recording's metadata, optionally with filtered events.
    Show(ShowCommand),

    /// Summarize a saved recording.
    Analyze { session_id: String },

    /// Delete every saved file for a session.
    #[clap(visible_alias = "rm")]
    Delete { session_id: String },

    /// Serve the recorder as an MCP server over stdin/stdout.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = MultitoolCli::parse();
    let overrides = cli.config_overrides.into_overrides();
    match cli.subcommand {
        Subcommand::Record { url } => run_record(overrides, url).await?,
        Subcommand::List => run_list(overrides)?,
        Subcommand::Show(cmd) => run_show(overrides, cmd)?,
        Subcommand::Analyze { session_id } => run_analyze(overrides, &session_id)?,
        Subcommand::Delete { session_id } => run_delete(overrides, &session_id)?,
        Subcommand::Mcp => domtrace_mcp_server::run_main(overrides).await?,
    }
    Ok(())
}
