// crates/shoal-cli/src/commands/status.rs
//
// `shoal status`: minter, reserve, slot, and vault totals at a glance.

use serde::Serialize;

use shoal_core::traits::{ReceiptLedger, SlotAllocator};
use shoal_economics::PRECISION;

use crate::context::Session;
use crate::output::{emit, eth, FieldRow, OutputFormat};

#[derive(Serialize)]
struct StatusReport {
    now: u64,
    unit_size: u128,
    withhold_ratio: u32,
    minter_balance: u128,
    withheld_reserve: u128,
    free_balance: u128,
    available_units: u128,
    funded_slots: usize,
    free_slots: usize,
    total_staked: u128,
    submit_paused: bool,
    batch_deposit_paused: bool,
    receipt_supply: u128,
    vault_total_assets: u128,
    vault_total_shares: u128,
    price_per_share: u128,
    cycle_end: u64,
    recorded_events: usize,
}

/// Run the status command.
pub fn run(session: &Session, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let protocol = session.protocol()?;
    let minter = protocol.minter();
    let vault = protocol.vault();
    let now = protocol.now();

    let report = StatusReport {
        now,
        unit_size: minter.unit_size(),
        withhold_ratio: minter.withhold_ratio(),
        minter_balance: minter.balance(),
        withheld_reserve: minter.withheld_reserve(),
        free_balance: minter.free_balance(),
        available_units: minter.available_units(),
        funded_slots: minter.active_slots().len(),
        free_slots: protocol.allocator().free_slots(),
        total_staked: protocol.sink().total_deposited(),
        submit_paused: minter.is_submit_paused(),
        batch_deposit_paused: minter.is_batch_deposit_paused(),
        receipt_supply: protocol.ledger().total_supply(),
        vault_total_assets: vault.total_assets(now),
        vault_total_shares: vault.total_shares(),
        price_per_share: vault.price_per_share(now)?,
        cycle_end: vault.cycle_end(),
        recorded_events: session.store().list_events()?.len(),
    };

    let rows = vec![
        FieldRow::new("Unit size", eth(report.unit_size)),
        FieldRow::new(
            "Withhold ratio",
            format!("{} / {}", report.withhold_ratio, PRECISION),
        ),
        FieldRow::new("Minter balance", eth(report.minter_balance)),
        FieldRow::new("Withheld reserve", eth(report.withheld_reserve)),
        FieldRow::new("Free balance", eth(report.free_balance)),
        FieldRow::new("Available units", report.available_units),
        FieldRow::new("Funded slots", report.funded_slots),
        FieldRow::new("Free slots", report.free_slots),
        FieldRow::new("Total staked", eth(report.total_staked)),
        FieldRow::new("Submit paused", report.submit_paused),
        FieldRow::new("Batch deposit paused", report.batch_deposit_paused),
        FieldRow::new("Receipt supply", eth(report.receipt_supply)),
        FieldRow::new("Vault assets", eth(report.vault_total_assets)),
        FieldRow::new("Vault shares", eth(report.vault_total_shares)),
        FieldRow::new("Price per share", eth(report.price_per_share)),
        FieldRow::new("Cycle end", report.cycle_end),
        FieldRow::new("Recorded events", report.recorded_events),
    ];
    emit(format, &rows, &report);
    Ok(())
}
