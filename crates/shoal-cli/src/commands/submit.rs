// crates/shoal-cli/src/commands/submit.rs
//
// `shoal submit`, `shoal submit-and-stake`, `shoal batch-deposit`: the
// minter's user-facing operations.

use clap::Args;
use serde::Serialize;

use shoal_core::traits::SlotAllocator;
use shoal_core::types::Address;

use crate::commands::{parse_address, parse_eth_amount, print_committed};
use crate::context::Session;
use crate::output::{eth, FieldRow, OutputFormat};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Amount of base asset to submit, in ETH.
    #[arg(value_parser = parse_eth_amount)]
    pub amount: u128,
    /// Receive the receipt tokens at this address instead of the caller's.
    #[arg(long, value_parser = parse_address)]
    pub recipient: Option<Address>,
}

#[derive(Debug, Args)]
pub struct BatchDepositArgs {
    /// Fund at most this many units (0 = every available unit).
    #[arg(long, default_value_t = 0)]
    pub max_units: u32,
}

#[derive(Serialize)]
struct SubmitReport {
    recipient: Address,
    minted: u128,
    withheld: u128,
}

#[derive(Serialize)]
struct StakeReport {
    recipient: Address,
    submitted: u128,
    shares: u128,
}

/// Run the submit command.
pub fn run_submit(session: &Session, args: &SubmitArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let caller = session.caller()?;
    let mut protocol = session.protocol()?;
    let (recipient, submission) = match &args.recipient {
        Some(recipient) => (*recipient, protocol.submit(&caller, recipient, args.amount)?),
        None => (caller, protocol.submit_for_self(&caller, args.amount)?),
    };
    let events = session.commit(&mut protocol)?;

    let report = SubmitReport {
        recipient,
        minted: submission.minted,
        withheld: submission.withheld,
    };
    let rows = vec![
        FieldRow::new("Recipient", recipient),
        FieldRow::new("Minted", eth(report.minted)),
        FieldRow::new("Withheld", eth(report.withheld)),
    ];
    print_committed(format, rows, &report, &events);
    Ok(())
}

/// Run the submit-and-stake command.
pub fn run_submit_and_stake(
    session: &Session,
    args: &SubmitArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let caller = session.caller()?;
    let recipient = args.recipient.unwrap_or(caller);
    let mut protocol = session.protocol()?;
    let shares = protocol.submit_and_stake(&caller, &recipient, args.amount)?;
    let events = session.commit(&mut protocol)?;

    let report = StakeReport {
        recipient,
        submitted: args.amount,
        shares,
    };
    let rows = vec![
        FieldRow::new("Recipient", recipient),
        FieldRow::new("Submitted", eth(report.submitted)),
        FieldRow::new("Shares", eth(report.shares)),
    ];
    print_committed(format, rows, &report, &events);
    Ok(())
}

/// Run the batch-deposit command.
pub fn run_batch_deposit(
    session: &Session,
    args: &BatchDepositArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut protocol = session.protocol()?;
    let funded = protocol.batch_deposit(args.max_units)?;
    let events = session.commit(&mut protocol)?;

    let ids: Vec<String> = funded.iter().map(|id| id.to_string()).collect();
    let rows = vec![
        FieldRow::new("Funded units", funded.len()),
        FieldRow::new("Free balance", eth(protocol.minter().free_balance())),
        FieldRow::new("Free slots left", protocol.allocator().free_slots()),
    ];
    print_committed(format, rows, &ids, &events);
    Ok(())
}
