// crates/shoal-cli/src/commands/events.rs
//
// `shoal events`: the committed event log, oldest first.

use clap::Args;

use crate::commands::EventRow;
use crate::context::Session;
use crate::output::{emit, OutputFormat};

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Only show events released by this operation (e.g. "submit").
    #[arg(long)]
    pub operation: Option<String>,
    /// Show only the most recent N events.
    #[arg(long)]
    pub last: Option<usize>,
}

/// Run the events command.
pub fn run(session: &Session, args: &EventsArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut records = session.store().list_events()?;
    // Commit time first, then id.
    records.sort_by(|a, b| a.committed_at.cmp(&b.committed_at).then(a.id.cmp(&b.id)));

    if let Some(operation) = &args.operation {
        records.retain(|r| &r.operation == operation);
    }
    if let Some(last) = args.last {
        let skip = records.len().saturating_sub(last);
        records.drain(..skip);
    }

    let rows: Vec<EventRow> = records.iter().map(EventRow::from).collect();
    emit(format, &rows, &records);
    Ok(())
}
