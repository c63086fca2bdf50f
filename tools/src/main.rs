//! payout-runner: headless runner and inspection tool for the payout
//! engine.
//!
//! Usage:
//!   payout-runner --db payouts.db --treasury 1
//!   payout-runner --db payouts.db --treasury 1 --dry-run --balance 5000000000000
//!
//! Without --dry-run the tool only reports what a run would pay:
//! pending awards grouped per recipient, plus outstanding royalties.
//! With --dry-run it executes a full run against a built-in simulated
//! chain so status transitions and aggregation can be inspected without
//! touching an RPC endpoint.

use anyhow::Result;
use num_bigint::BigUint;
use payout_core::aggregate::aggregate_awards;
use payout_core::connector::{
    AssetMetadata, ChainMetadata, ChainProvider, EvmChain, SubmitOutcome, SubstrateChain,
    TerminalStatus,
};
use payout_core::engine::PayoutEngine;
use payout_core::error::PayoutResult;
use payout_core::progress::{ProgressSink, RunSummary};
use payout_core::record::ChainOptions;
use payout_core::secret::SecretDecryptor;
use payout_core::store::PayoutStore;
use std::cell::RefCell;
use std::env;
use std::rc::Rc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let treasury_id = parse_arg(&args, "--treasury", 1i64);
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let balance = parse_arg(&args, "--balance", 1_000_000_000_000_000_000u64);
    let decimals = parse_arg(&args, "--decimals", 12u32);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("payouts.db");
    let key = args
        .windows(2)
        .find(|w| w[0] == "--key")
        .map(|w| w[1].as_str())
        .unwrap_or("");

    println!("payout-runner");
    println!("  db:       {db}");
    println!("  treasury: {treasury_id}");
    println!("  mode:     {}", if dry_run { "dry-run" } else { "report" });
    println!();

    let store = PayoutStore::open(db)?;
    store.migrate()?;

    print_report(&store, treasury_id)?;

    if dry_run {
        if key.is_empty() {
            log::warn!("No --key supplied; dry-run passes wallet secrets through unchanged");
        }
        let chains = SimChains::new(balance, decimals);
        let decryptor = PassthroughDecryptor;
        let engine = PayoutEngine::new(&store, &chains, &decryptor);
        let mut sink = StdoutSink;

        let summary = engine.run(&mut sink, key, treasury_id)?;
        print_summary(&summary, chains.submission_count());
    }

    Ok(())
}

fn print_report(store: &PayoutStore, treasury_id: i64) -> Result<()> {
    let pending = store.pending_awards(treasury_id)?;
    let royalties = store.pending_royalties(treasury_id)?;
    let aggregates = aggregate_awards(&pending);

    println!("=== PENDING PAYOUTS ===");
    if aggregates.is_empty() {
        println!("  (none)");
    }
    for a in &aggregates {
        println!(
            "  user {:>6} | {:>3} award(s) | {} {} (royalty {})",
            a.user_id,
            a.record_ids.len(),
            a.net_value(),
            a.treasury.coin_name,
            a.royalty_value,
        );
    }
    println!("  outstanding royalties: {}", royalties.len());
    println!();
    Ok(())
}

fn print_summary(summary: &RunSummary, transfers: u64) {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  transfers:           {transfers}");
    println!("  submitted:           {}", summary.submitted);
    println!("  failed:              {}", summary.failed);
    println!("  skipped:             {}", summary.skipped);
    println!("  royalties submitted: {}", summary.royalties_submitted);
    println!("  royalties failed:    {}", summary.royalties_failed);
    println!("  royalties skipped:   {}", summary.royalties_skipped);
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

// ── Progress to stdout ─────────────────────────────────────────

struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn processing(&mut self, current: usize, total: usize) {
        println!("  processing {current}/{total}");
    }

    fn processed(&mut self) {
        println!("  done");
    }
}

// ── Dry-run chain ──────────────────────────────────────────────
// A single funded wallet on a chain that includes every transaction.
// Receivers start empty, so existential-deposit and min-balance policy
// branches are exercised exactly as they would be against a real chain.

struct SimState {
    balance: BigUint,
    decimals: u32,
    submissions: u64,
}

struct SimChains {
    state: Rc<RefCell<SimState>>,
}

const SIM_WALLET: &str = "sim-wallet";

impl SimChains {
    fn new(balance: u64, decimals: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                balance: BigUint::from(balance),
                decimals,
                submissions: 0,
            })),
        }
    }

    fn submission_count(&self) -> u64 {
        self.state.borrow().submissions
    }

    fn submit(state: &Rc<RefCell<SimState>>, amount: &BigUint) -> String {
        let mut s = state.borrow_mut();
        if s.balance >= *amount {
            s.balance -= amount;
        }
        s.submissions += 1;
        format!("0x{}", uuid::Uuid::new_v4().simple())
    }
}

impl ChainProvider for SimChains {
    fn connect_substrate(
        &self,
        _rpc_url: &str,
        _options: &ChainOptions,
    ) -> PayoutResult<Box<dyn SubstrateChain>> {
        Ok(Box::new(SimHandle {
            state: self.state.clone(),
        }))
    }

    fn connect_evm(&self, _rpc_url: &str) -> PayoutResult<Box<dyn EvmChain>> {
        Ok(Box::new(SimHandle {
            state: self.state.clone(),
        }))
    }
}

struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimHandle {
    fn balance_of(&self, address: &str) -> BigUint {
        if address == SIM_WALLET {
            self.state.borrow().balance.clone()
        } else {
            BigUint::default()
        }
    }
}

impl SubstrateChain for SimHandle {
    fn metadata(&self) -> PayoutResult<ChainMetadata> {
        Ok(ChainMetadata {
            token_decimals: self.state.borrow().decimals,
            // Zero deposit: a dry run never needs a top-up.
            existential_deposit: BigUint::default(),
        })
    }

    fn free_balance(&self, address: &str) -> PayoutResult<BigUint> {
        Ok(self.balance_of(address))
    }

    fn asset_metadata(&self, _asset_id: u32) -> PayoutResult<AssetMetadata> {
        Ok(AssetMetadata {
            decimals: self.state.borrow().decimals,
            min_balance: BigUint::default(),
        })
    }

    fn asset_balance(&self, _asset_id: u32, address: &str) -> PayoutResult<BigUint> {
        Ok(self.balance_of(address))
    }

    fn encode_address(&self, address: &str, _prefix: u16) -> PayoutResult<String> {
        Ok(address.to_string())
    }

    fn derive_address(&self, _secret: &str) -> PayoutResult<String> {
        Ok(SIM_WALLET.to_string())
    }

    fn submit_native_transfer(
        &self,
        _secret: &str,
        _receiver: &str,
        amount: &BigUint,
        _tip: u64,
    ) -> PayoutResult<SubmitOutcome> {
        Ok(SubmitOutcome {
            status: TerminalStatus::InBlock,
            tx_hash: Some(SimChains::submit(&self.state, amount)),
            dispatch_error: None,
        })
    }

    fn submit_asset_transfer(
        &self,
        _secret: &str,
        _asset_id: u32,
        _receiver: &str,
        amount: &BigUint,
        _tip: u64,
    ) -> PayoutResult<SubmitOutcome> {
        Ok(SubmitOutcome {
            status: TerminalStatus::InBlock,
            tx_hash: Some(SimChains::submit(&self.state, amount)),
            dispatch_error: None,
        })
    }
}

impl EvmChain for SimHandle {
    fn native_balance(&self, address: &str) -> PayoutResult<BigUint> {
        Ok(self.balance_of(address))
    }

    fn token_balance(&self, _token_address: &str, address: &str) -> PayoutResult<BigUint> {
        Ok(self.balance_of(address))
    }

    fn derive_address(&self, _private_key: &str) -> PayoutResult<String> {
        Ok(SIM_WALLET.to_string())
    }

    fn submit_native_transfer(
        &self,
        _private_key: &str,
        _receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String> {
        Ok(SimChains::submit(&self.state, amount))
    }

    fn submit_token_transfer(
        &self,
        _private_key: &str,
        _token_address: &str,
        _receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String> {
        Ok(SimChains::submit(&self.state, amount))
    }
}

// ── Dry-run decryption ─────────────────────────────────────────

/// Treats stored secrets as plaintext. Deployments wire in a real
/// decryptor; the dry run never signs anything, so the secret's value
/// does not matter.
struct PassthroughDecryptor;

impl SecretDecryptor for PassthroughDecryptor {
    fn decrypt(&self, ciphertext: &str, _key: &str) -> PayoutResult<String> {
        Ok(ciphertext.to_string())
    }
}
