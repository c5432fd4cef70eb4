// crates/shoal-cli/src/commands/mod.rs
//
// Command module declarations for the Shoal CLI, plus the argument parsers
// and committed-operation report they share.

pub mod events;
pub mod gov;
pub mod init;
pub mod keygen;
pub mod slots;
pub mod status;
pub mod submit;
pub mod token;
pub mod vault;

use serde::Serialize;
use tabled::Tabled;

use shoal_core::events::EventRecord;
use shoal_core::types::Address;
use shoal_economics::Ether;

use crate::output::{format_json, format_table, FieldRow, OutputFormat};

/// clap value parser for decimal ETH amounts ("1.5", "32"), returned in wei.
pub fn parse_eth_amount(s: &str) -> Result<u128, String> {
    Ether::parse_eth(s)
        .map(|e| e.wei)
        .ok_or_else(|| format!("{:?} is not a decimal amount with at most 18 fractional digits", s))
}

/// clap value parser for hex addresses.
pub fn parse_address(s: &str) -> Result<Address, String> {
    s.parse::<Address>().map_err(|e| e.to_string())
}

#[derive(Debug, Tabled)]
pub struct EventRow {
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Committed")]
    pub committed_at: String,
    #[tabled(rename = "Operation")]
    pub operation: String,
    #[tabled(rename = "Event")]
    pub event: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

impl From<&EventRecord> for EventRow {
    fn from(record: &EventRecord) -> Self {
        let details = serde_json::to_string(&record.event).unwrap_or_default();
        Self {
            id: record.id.to_string(),
            committed_at: record.committed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            operation: record.operation.clone(),
            event: record.event.name().to_string(),
            details,
        }
    }
}

#[derive(Serialize)]
struct Committed<'a, T: Serialize> {
    result: &'a T,
    events: &'a [EventRecord],
}

/// Print the outcome of a committed operation and the events it released.
pub fn print_committed<T: Serialize>(
    format: OutputFormat,
    summary: Vec<FieldRow>,
    result: &T,
    events: &[EventRecord],
) {
    match format {
        OutputFormat::Json => println!("{}", format_json(&Committed { result, events })),
        OutputFormat::Table => {
            println!("{}", format_table(&summary));
            if !events.is_empty() {
                let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
                println!();
                println!("{}", format_table(&rows));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::events::Event;
    use shoal_economics::WEI_PER_ETH;

    #[test]
    fn test_parse_eth_amount() {
        assert_eq!(parse_eth_amount("2").unwrap(), 2 * WEI_PER_ETH);
        assert_eq!(parse_eth_amount("0.000000000000000001").unwrap(), 1);
        assert!(parse_eth_amount("abc").is_err());
        assert!(parse_eth_amount("1.0000000000000000001").is_err());
    }

    #[test]
    fn test_parse_address() {
        let addr = Address([3; 32]);
        assert_eq!(parse_address(&addr.to_string()).unwrap(), addr);
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn test_event_row_details() {
        let record = EventRecord::new("set_withhold_ratio", Event::WithholdRatioSet { ratio: 42 });
        let row = EventRow::from(&record);
        assert_eq!(row.event, "withhold_ratio_set");
        assert_eq!(row.operation, "set_withhold_ratio");
        assert!(row.details.contains("42"));
    }
}
