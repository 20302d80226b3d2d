//! Subcommands over saved recordings. None of these launch a browser.

use anyhow::Context;
use clap::Parser;
use domtrace_core::Config;
use domtrace_core::ConfigOverrides;
use domtrace_core::SessionStore;
use domtrace_core::analyze;
use domtrace_protocol::EventQuery;
use domtrace_protocol::EventType;
use domtrace_protocol::RecordingListEntry;

use crate::record::render_summary;

#[derive(Debug, Parser)]
pub struct ShowCommand {
    /// Session ID of the recording.
    pub session_id: String,

    /// Print the matching events, not just metadata and counts.
    #[arg(long)]
    pub events: bool,

    /// Only events of this type. May be repeated.
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_event_type)]
    pub event_types: Vec<EventType>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub offset: Option<usize>,

    /// Only events at or after this timestamp.
    #[arg(long = "from", value_name = "TIMESTAMP")]
    pub from_timestamp: Option<String>,

    /// Only events at or before this timestamp.
    #[arg(long = "to", value_name = "TIMESTAMP")]
    pub to_timestamp: Option<String>,
}

impl ShowCommand {
    pub fn query(&self) -> EventQuery {
        EventQuery {
            event_types: (!self.event_types.is_empty()).then(|| self.event_types.clone()),
            limit: self.limit,
            offset: self.offset,
            from_timestamp: self.from_timestamp.clone(),
            to_timestamp: self.to_timestamp.clone(),
        }
    }
}

fn parse_event_type(value: &str) -> Result<EventType, String> {
    value.parse().map_err(|err| format!("{err}"))
}

fn open_store(overrides: ConfigOverrides) -> anyhow::Result<SessionStore> {
    let config = Config::load_with_overrides(overrides).context("error loading config")?;
    Ok(SessionStore::from_config(&config))
}

pub fn run_list(overrides: ConfigOverrides) -> anyhow::Result<()> {
    let store = open_store(overrides)?;
    let entries = store.list()?;
    if entries.is_empty() {
        println!("No recordings in {}", store.dir().display());
        return Ok(());
    }
    for entry in &entries {
        println!("{}", render_list_entry(entry));
    }
    Ok(())
}

pub fn run_show(overrides: ConfigOverrides, cmd: ShowCommand) -> anyhow::Result<()> {
    let store = open_store(overrides)?;
    let recording = store
        .load_filtered(&cmd.session_id, &cmd.query(), cmd.events)?
        .with_context(|| format!("recording not found: {}", cmd.session_id))?;
    println!("{}", serde_json::to_string_pretty(&recording)?);
    Ok(())
}

pub fn run_analyze(overrides: ConfigOverrides, session_id: &str) -> anyhow::Result<()> {
    let store = open_store(overrides)?;
    let document = store
        .load(session_id)?
        .with_context(|| format!("recording not found: {session_id}"))?;
    println!("Recording {session_id}");
    print!("{}", render_summary(&analyze(&document.events)));
    Ok(())
}

pub fn run_delete(overrides: ConfigOverrides, session_id: &str) -> anyhow::Result<()> {
    let store = open_store(overrides)?;
    if !store.delete(session_id)? {
        anyhow::bail!("recording not found: {session_id}");
    }
    println!("Deleted {session_id}");
    Ok(())
}

pub fn render_list_entry(entry: &RecordingListEntry) -> String {
    format!(
        "{}  {:>6} events  {}  {}",
        entry.session_id,
        entry.event_count,
        entry.start_time.as_deref().unwrap_or("-"),
        entry.url.as_deref().unwrap_or("-"),
    )
}
