// crates/shoal-cli/src/commands/slots.rs
//
// `shoal slots {add, generate, list}`: register staking slots with the
// allocator and inspect free and funded slots.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use shoal_core::error::ShoalError;
use shoal_core::traits::SlotAllocator;
use shoal_core::types::{SlotId, StakingSlot};
use shoal_store::{build_slot, synthetic_slot, SLOT_SIGNATURE_LEN};

use crate::context::{LocalState, Session};
use crate::output::{emit, format_table, FieldRow, OutputFormat};

/// Slot registry subcommands.
#[derive(Debug, Subcommand)]
pub enum SlotsCmd {
    /// Register one slot from operator-supplied deposit data.
    Add {
        /// Validator public key (hex, 48 bytes).
        #[arg(long)]
        id: String,
        /// Deposit signature (hex, 96 bytes).
        #[arg(long)]
        signature: String,
    },
    /// Register deterministic local slots bound to the configured credential.
    Generate {
        /// Number of slots to register.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// List free and funded slots.
    List,
}

#[derive(Debug, Serialize, Tabled)]
struct SlotRow {
    #[tabled(rename = "Slot")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Run the slots subcommand.
pub fn run(session: &Session, cmd: &SlotsCmd, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        SlotsCmd::Add { id, signature } => add(session, id, signature, format),
        SlotsCmd::Generate { count } => generate(session, *count, format),
        SlotsCmd::List => list(session, format),
    }
}

fn register(state: &mut LocalState, slot: StakingSlot) -> Result<(), ShoalError> {
    if state.minter.active_slots().contains(&slot.id) {
        return Err(ShoalError::State(format!("Slot {} is already funded", slot.id)));
    }
    state.allocator.push(slot)
}

fn add(session: &Session, id: &str, signature: &str, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let id: SlotId = id.parse()?;
    let signature = hex::decode(signature.trim_start_matches("0x"))?;
    if signature.len() != SLOT_SIGNATURE_LEN {
        return Err(ShoalError::Validation(format!(
            "Deposit signature must be {} bytes, got {}",
            SLOT_SIGNATURE_LEN,
            signature.len()
        ))
        .into());
    }

    let mut state = session.load_state()?;
    let slot = build_slot(id.0, session.config.credential()?, signature);
    let rows = [SlotRow {
        id: slot.id.to_string(),
        status: "free".to_string(),
    }];
    register(&mut state, slot)?;
    session.save_state(&state)?;
    tracing::info!(slot = %rows[0].id, "Registered slot");

    emit(format, &rows, &rows);
    Ok(())
}

fn generate(session: &Session, count: u32, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = session.load_state()?;
    let credential = session.config.credential()?;
    let start = (state.allocator.free_slots() + state.minter.active_slots().len()) as u32;

    let mut rows = Vec::new();
    for index in start..start.saturating_add(count) {
        let slot = synthetic_slot(index, credential);
        rows.push(SlotRow {
            id: slot.id.to_string(),
            status: "free".to_string(),
        });
        register(&mut state, slot)?;
    }
    session.save_state(&state)?;
    tracing::info!(count, free = state.allocator.free_slots(), "Registered slots");

    emit(format, &rows, &rows);
    Ok(())
}

fn list(session: &Session, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let state = session.load_state()?;
    let mut rows: Vec<SlotRow> = state
        .allocator
        .iter()
        .map(|slot| SlotRow {
            id: slot.id.to_string(),
            status: "free".to_string(),
        })
        .collect();
    rows.extend(state.minter.active_slots().iter().map(|id| SlotRow {
        id: id.to_string(),
        status: "funded".to_string(),
    }));

    match format {
        OutputFormat::Json => emit(format, &rows, &rows),
        OutputFormat::Table => {
            let summary = vec![
                FieldRow::new("Free", state.allocator.free_slots()),
                FieldRow::new("Funded", state.minter.active_slots().len()),
            ];
            println!("{}", format_table(&summary));
            if !rows.is_empty() {
                println!();
                println!("{}", format_table(&rows));
            }
        }
    }
    Ok(())
}
