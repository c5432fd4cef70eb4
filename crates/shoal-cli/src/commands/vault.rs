// crates/shoal-cli/src/commands/vault.rs
//
// `shoal vault ...`: stake vault commands for entering and leaving the vault,
// reward syncs, signed pre-authorizations, share transfers, and read-only
// views of the exchange rate and reward cycle.

use clap::{Args, Subcommand};
use serde::Serialize;

use shoal_core::crypto::Keypair;
use shoal_core::events::EventRecord;
use shoal_core::permit::PreAuthorization;
use shoal_core::types::Address;
use shoal_economics::SHARE_UNIT;

use crate::commands::{parse_address, parse_eth_amount, print_committed};
use crate::context::{LocalProtocol, Session};
use crate::output::{emit, eth, FieldRow, OutputFormat};

/// Amount plus optional receiver, shared by deposit and mint.
#[derive(Debug, Args)]
pub struct EnterArgs {
    /// Amount in ETH (assets for deposit, shares for mint).
    #[arg(value_parser = parse_eth_amount)]
    pub amount: u128,
    /// Credit the shares to this address instead of the caller.
    #[arg(long, value_parser = parse_address)]
    pub receiver: Option<Address>,
}

/// Amount plus optional receiver and owner, shared by withdraw and redeem.
#[derive(Debug, Args)]
pub struct ExitArgs {
    /// Amount in ETH (assets for withdraw, shares for redeem).
    #[arg(value_parser = parse_eth_amount)]
    pub amount: u128,
    /// Send the receipt tokens to this address instead of the caller.
    #[arg(long, value_parser = parse_address)]
    pub receiver: Option<Address>,
    /// Burn shares of this owner, spending the caller's share allowance.
    #[arg(long, value_parser = parse_address)]
    pub owner: Option<Address>,
}

#[derive(Debug, Args)]
pub struct PermitArgs {
    #[command(flatten)]
    pub enter: EnterArgs,
    /// Seconds the signed pre-authorization stays valid.
    #[arg(long, default_value_t = 3600)]
    pub valid_for: u64,
}

/// Vault subcommands.
#[derive(Debug, Subcommand)]
pub enum VaultCmd {
    /// Deposit receipt tokens for shares. Needs an allowance for the vault.
    Deposit(EnterArgs),
    /// Mint an exact number of shares.
    Mint(EnterArgs),
    /// Withdraw an exact amount of receipt tokens.
    Withdraw(ExitArgs),
    /// Redeem an exact number of shares.
    Redeem(ExitArgs),
    /// Pick up newly arrived rewards and roll the cycle if it ended.
    Sync,
    /// Show the current price of one share.
    Price,
    /// Sign a pre-authorization for the deposited assets and deposit.
    PermitDeposit(PermitArgs),
    /// Sign a pre-authorization for the assets the mint costs and mint.
    PermitMint(PermitArgs),
    /// Transfer shares from the acting account.
    TransferShares {
        #[arg(long, value_parser = parse_address)]
        to: Address,
        #[arg(long, value_parser = parse_eth_amount)]
        shares: u128,
    },
    /// Let a spender withdraw or redeem the acting account's shares.
    ApproveShares {
        #[arg(long, value_parser = parse_address)]
        spender: Address,
        #[arg(long, value_parser = parse_eth_amount)]
        shares: u128,
    },
    /// Show vault totals, reward cycle state, and an account's position.
    Info {
        #[arg(long, value_parser = parse_address)]
        address: Option<Address>,
    },
}

#[derive(Serialize)]
struct MoveReport {
    assets: u128,
    shares: u128,
}

#[derive(Serialize)]
struct VaultInfo {
    now: u64,
    total_assets: u128,
    total_shares: u128,
    price_per_share: u128,
    last_sync_assets: u128,
    pending_reward: u128,
    vesting_reward: u128,
    queued_reward: u128,
    cycle_length: u64,
    cycle_end: u64,
    account: Address,
    shares: u128,
    max_withdraw: u128,
}

/// Run the vault subcommand.
pub fn run(session: &Session, cmd: &VaultCmd, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        VaultCmd::Deposit(args) => enter(session, args, false, format),
        VaultCmd::Mint(args) => enter(session, args, true, format),
        VaultCmd::Withdraw(args) => exit(session, args, false, format),
        VaultCmd::Redeem(args) => exit(session, args, true, format),
        VaultCmd::Sync => sync(session, format),
        VaultCmd::Price => price(session, format),
        VaultCmd::PermitDeposit(args) => permit_enter(session, args, false, format),
        VaultCmd::PermitMint(args) => permit_enter(session, args, true, format),
        VaultCmd::TransferShares { to, shares } => {
            let caller = session.caller()?;
            let mut protocol = session.protocol()?;
            protocol.transfer_shares(&caller, to, *shares)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![
                FieldRow::new("To", to),
                FieldRow::new("Shares", eth(*shares)),
                FieldRow::new("Shares left", eth(protocol.vault().share_balance(&caller))),
            ];
            print_committed(format, rows, shares, &events);
            Ok(())
        }
        VaultCmd::ApproveShares { spender, shares } => {
            let caller = session.caller()?;
            let mut protocol = session.protocol()?;
            protocol.approve_shares(&caller, spender, *shares)?;
            let events = session.commit(&mut protocol)?;
            let rows = vec![FieldRow::new("Spender", spender), FieldRow::new("Shares", eth(*shares))];
            print_committed(format, rows, shares, &events);
            Ok(())
        }
        VaultCmd::Info { address } => info(session, *address, format),
    }
}

fn report_move(format: OutputFormat, protocol: &LocalProtocol, report: MoveReport, events: &[EventRecord]) {
    let rows = vec![
        FieldRow::new("Assets", eth(report.assets)),
        FieldRow::new("Shares", eth(report.shares)),
        FieldRow::new("Total assets", eth(protocol.total_assets())),
        FieldRow::new("Total shares", eth(protocol.vault().total_shares())),
    ];
    print_committed(format, rows, &report, events);
}

fn enter(session: &Session, args: &EnterArgs, by_shares: bool, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let caller = session.caller()?;
    let receiver = args.receiver.unwrap_or(caller);
    let mut protocol = session.protocol()?;
    let report = if by_shares {
        let assets = protocol.mint(&caller, args.amount, &receiver)?;
        MoveReport {
            assets,
            shares: args.amount,
        }
    } else {
        let shares = protocol.deposit(&caller, args.amount, &receiver)?;
        MoveReport {
            assets: args.amount,
            shares,
        }
    };
    let events = session.commit(&mut protocol)?;
    report_move(format, &protocol, report, &events);
    Ok(())
}

fn exit(session: &Session, args: &ExitArgs, by_shares: bool, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let caller = session.caller()?;
    let receiver = args.receiver.unwrap_or(caller);
    let owner = args.owner.unwrap_or(caller);
    let mut protocol = session.protocol()?;
    let report = if by_shares {
        let assets = protocol.redeem(&caller, args.amount, &receiver, &owner)?;
        MoveReport {
            assets,
            shares: args.amount,
        }
    } else {
        let shares = protocol.withdraw(&caller, args.amount, &receiver, &owner)?;
        MoveReport {
            assets: args.amount,
            shares,
        }
    };
    let events = session.commit(&mut protocol)?;
    report_move(format, &protocol, report, &events);
    Ok(())
}

/// Sign a pre-authorization granting the vault `amount` over the caller's
/// receipt tokens, using the caller's current permit nonce.
fn sign_for_vault(keypair: &Keypair, protocol: &LocalProtocol, amount: u128, valid_for: u64) -> PreAuthorization {
    let nonce = protocol.ledger().nonce(&keypair.address());
    let deadline = protocol.now().saturating_add(valid_for);
    PreAuthorization::sign(keypair, protocol.vault().address(), amount, nonce, deadline)
}

fn permit_enter(session: &Session, args: &PermitArgs, by_shares: bool, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = session.keypair()?;
    let caller = keypair.address();
    let receiver = args.enter.receiver.unwrap_or(caller);
    let mut protocol = session.protocol()?;

    let report = if by_shares {
        let cost = protocol.vault().preview_mint(args.enter.amount, protocol.now())?;
        let authorization = sign_for_vault(&keypair, &protocol, cost, args.valid_for);
        let assets = protocol.mint_with_authorization(&caller, args.enter.amount, &receiver, &authorization)?;
        MoveReport {
            assets,
            shares: args.enter.amount,
        }
    } else {
        let authorization = sign_for_vault(&keypair, &protocol, args.enter.amount, args.valid_for);
        let shares = protocol.deposit_with_authorization(&caller, args.enter.amount, &receiver, &authorization)?;
        MoveReport {
            assets: args.enter.amount,
            shares,
        }
    };
    let events = session.commit(&mut protocol)?;
    report_move(format, &protocol, report, &events);
    Ok(())
}

fn sync(session: &Session, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut protocol = session.protocol()?;
    let outcome = protocol.sync_rewards()?;
    let events = session.commit(&mut protocol)?;

    let rows = vec![
        FieldRow::new("Newly arrived", eth(outcome.newly_arrived)),
        FieldRow::new("Cycle rolled", outcome.cycle_rolled),
        FieldRow::new("Cycle end", outcome.cycle_end),
        FieldRow::new("Pending", eth(protocol.vault().pending_reward())),
        FieldRow::new("Vesting", eth(protocol.vault().vesting_reward())),
        FieldRow::new("Queued", eth(protocol.vault().queued_reward())),
    ];
    print_committed(format, rows, &outcome, &events);
    Ok(())
}

fn price(session: &Session, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let protocol = session.protocol()?;
    let price = protocol.price_per_share()?;
    let rows = vec![FieldRow::new(
        "Price per share",
        format!("{} per {}", eth(price), eth(SHARE_UNIT)),
    )];
    emit(format, &rows, &price);
    Ok(())
}

fn info(session: &Session, address: Option<Address>, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let account = match address {
        Some(a) => a,
        None => session.caller()?,
    };
    let protocol = session.protocol()?;
    let vault = protocol.vault();
    let now = protocol.now();

    let report = VaultInfo {
        now,
        total_assets: vault.total_assets(now),
        total_shares: vault.total_shares(),
        price_per_share: vault.price_per_share(now)?,
        last_sync_assets: vault.last_sync_assets(),
        pending_reward: vault.pending_reward(),
        vesting_reward: vault.vesting_reward(),
        queued_reward: vault.queued_reward(),
        cycle_length: vault.cycle_length(),
        cycle_end: vault.cycle_end(),
        account,
        shares: vault.share_balance(&account),
        max_withdraw: vault.max_withdraw(&account, now)?,
    };
    let rows = vec![
        FieldRow::new("Total assets", eth(report.total_assets)),
        FieldRow::new("Total shares", eth(report.total_shares)),
        FieldRow::new("Price per share", eth(report.price_per_share)),
        FieldRow::new("Last sync assets", eth(report.last_sync_assets)),
        FieldRow::new("Pending reward", eth(report.pending_reward)),
        FieldRow::new("Vesting reward", eth(report.vesting_reward)),
        FieldRow::new("Queued reward", eth(report.queued_reward)),
        FieldRow::new("Cycle length (s)", report.cycle_length),
        FieldRow::new("Cycle end", report.cycle_end),
        FieldRow::new("Account", account),
        FieldRow::new("Shares", eth(report.shares)),
        FieldRow::new("Max withdraw", eth(report.max_withdraw)),
    ];
    emit(format, &rows, &report);
    Ok(())
}
