pub mod record;
pub mod recordings;

use std::path::PathBuf;

use clap::Args;
use domtrace_core::ConfigOverrides;

/// Flags shared by every subcommand that layer over `config.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct CliConfigOverrides {
    /// Run Chrome without a visible window.
    #[arg(long, global = true)]
    pub headless: bool,

    /// Directory holding saved recordings.
    #[arg(long, value_name = "DIR", global = true)]
    pub recordings_dir: Option<PathBuf>,

    /// Stop capturing once this many events have been recorded.
    #[arg(long, value_name = "N", global = true)]
    pub max_events: Option<usize>,

    /// Extra pattern marking a field as sensitive. May be repeated.
    #[arg(long = "selector", value_name = "PATTERN", global = true)]
    pub sensitive_selectors: Vec<String>,

    /// Chrome or Chromium executable to launch.
    #[arg(long = "chrome", value_name = "PATH", global = true)]
    pub executable: Option<PathBuf>,
}

impl CliConfigOverrides {
    pub fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            recordings_dir: self.recordings_dir,
            max_events: self.max_events,
            // Absent flag defers to config.toml and DOMTRACE_HEADLESS.
            headless: self.headless.then_some(true),
            sensitive_selectors: self.sensitive_selectors,
            executable: self.executable,
        }
    }
}
