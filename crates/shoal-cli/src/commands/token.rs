// crates/shoal-cli/src/commands/token.rs
//
// `shoal token {transfer, approve, balance}`: receipt token ledger commands.

use clap::Subcommand;
use serde::Serialize;

use shoal_core::traits::{ReceiptLedger, TokenLedger};
use shoal_core::types::Address;

use crate::commands::{parse_address, parse_eth_amount, print_committed};
use crate::context::Session;
use crate::output::{emit, eth, FieldRow, OutputFormat};

/// Receipt token subcommands.
#[derive(Debug, Subcommand)]
pub enum TokenCmd {
    /// Transfer receipt tokens from the acting account.
    Transfer {
        #[arg(long, value_parser = parse_address)]
        to: Address,
        /// Amount in ETH.
        #[arg(long, value_parser = parse_eth_amount)]
        amount: u128,
    },
    /// Set a spender's allowance over the acting account's receipt tokens.
    Approve {
        #[arg(long, value_parser = parse_address)]
        spender: Address,
        /// Allowance in ETH.
        #[arg(long, value_parser = parse_eth_amount, conflicts_with = "unlimited")]
        amount: Option<u128>,
        /// Grant an allowance that is never spent down.
        #[arg(long)]
        unlimited: bool,
    },
    /// Show a receipt token balance.
    Balance {
        /// Account to inspect (defaults to the acting account).
        #[arg(long, value_parser = parse_address)]
        address: Option<Address>,
    },
}

#[derive(Serialize)]
struct BalanceReport {
    address: Address,
    balance: u128,
    permit_nonce: u64,
    total_supply: u128,
}

/// Run the token subcommand.
pub fn run(session: &Session, cmd: &TokenCmd, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TokenCmd::Transfer { to, amount } => {
            let caller = session.caller()?;
            let mut protocol = session.protocol()?;
            protocol.transfer_receipt(&caller, to, *amount)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![
                FieldRow::new("To", to),
                FieldRow::new("Amount", eth(*amount)),
                FieldRow::new("Balance", eth(protocol.ledger().balance_of(&caller))),
            ];
            print_committed(format, rows, amount, &events);
        }
        TokenCmd::Approve {
            spender,
            amount,
            unlimited,
        } => {
            let allowance = if *unlimited {
                u128::MAX
            } else {
                amount.ok_or("Pass --amount or --unlimited")?
            };
            let caller = session.caller()?;
            let mut protocol = session.protocol()?;
            protocol.approve_receipt(&caller, spender, allowance)?;
            let events = session.commit(&mut protocol)?;
            let shown = if allowance == u128::MAX {
                "unlimited".to_string()
            } else {
                eth(allowance)
            };
            let rows = vec![FieldRow::new("Spender", spender), FieldRow::new("Allowance", shown)];
            print_committed(format, rows, &allowance, &events);
        }
        TokenCmd::Balance { address } => {
            let address = match address {
                Some(a) => *a,
                None => session.caller()?,
            };
            let state = session.load_state()?;
            let report = BalanceReport {
                address,
                balance: state.ledger.balance_of(&address),
                permit_nonce: state.ledger.nonce(&address),
                total_supply: state.ledger.total_supply(),
            };
            let rows = vec![
                FieldRow::new("Address", address),
                FieldRow::new("Balance", eth(report.balance)),
                FieldRow::new("Permit nonce", report.permit_nonce),
                FieldRow::new("Total supply", eth(report.total_supply)),
            ];
            emit(format, &rows, &report);
        }
    }
    Ok(())
}
