// crates/shoal-cli/src/commands/gov.rs
//
// `shoal gov ...`: governance commands. The acting account must be one of
// the configured governors.

use clap::Subcommand;

use shoal_core::traits::Authority;
use shoal_core::types::Address;
use shoal_economics::PRECISION;

use crate::commands::{parse_address, parse_eth_amount, print_committed};
use crate::context::Session;
use crate::output::{eth, FieldRow, OutputFormat};

/// Governance subcommands.
#[derive(Debug, Subcommand)]
pub enum GovCmd {
    /// Set the share of future submissions held back in the reserve.
    SetRatio {
        /// Ratio out of 1,000,000 (e.g. 100000 = 10%).
        ratio: u32,
    },
    /// Move part of the withheld reserve to a recipient.
    MoveReserve {
        #[arg(long, value_parser = parse_address)]
        to: Address,
        /// Amount in ETH.
        #[arg(long, value_parser = parse_eth_amount)]
        amount: u128,
    },
    /// Pause or resume submissions.
    ToggleSubmitPause,
    /// Pause or resume batch deposits.
    ToggleBatchPause,
    /// Send free base asset to the beneficiary.
    RecoverBase {
        /// Amount in ETH.
        #[arg(value_parser = parse_eth_amount)]
        amount: u128,
    },
}

/// Run the governance subcommand.
pub fn run(session: &Session, cmd: &GovCmd, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let caller = session.caller()?;
    let mut protocol = session.protocol()?;

    match cmd {
        GovCmd::SetRatio { ratio } => {
            protocol.set_withhold_ratio(&caller, *ratio)?;
            let events = session.commit(&mut protocol)?;
            let percent = *ratio as f64 * 100.0 / PRECISION as f64;
            let rows = vec![FieldRow::new("Withhold ratio", format!("{} ({:.4}%)", ratio, percent))];
            print_committed(format, rows, ratio, &events);
        }
        GovCmd::MoveReserve { to, amount } => {
            protocol.move_withheld_reserve(&caller, to, *amount)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![
                FieldRow::new("To", to),
                FieldRow::new("Moved", eth(*amount)),
                FieldRow::new("Reserve left", eth(protocol.minter().withheld_reserve())),
            ];
            print_committed(format, rows, amount, &events);
        }
        GovCmd::ToggleSubmitPause => {
            let paused = protocol.toggle_submit_pause(&caller)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![FieldRow::new("Submit paused", paused)];
            print_committed(format, rows, &paused, &events);
        }
        GovCmd::ToggleBatchPause => {
            let paused = protocol.toggle_batch_deposit_pause(&caller)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![FieldRow::new("Batch deposit paused", paused)];
            print_committed(format, rows, &paused, &events);
        }
        GovCmd::RecoverBase { amount } => {
            protocol.recover_base_asset(&caller, *amount)?;
            let events = session.commit(&mut protocol)?;
            let beneficiary = protocol.authority().beneficiary();
            let rows = vec![
                FieldRow::new("Beneficiary", beneficiary),
                FieldRow::new("Recovered", eth(*amount)),
                FieldRow::new("Paid to beneficiary", eth(protocol.payments().balance_of(&beneficiary))),
            ];
            print_committed(format, rows, amount, &events);
        }
    }
    Ok(())
}
