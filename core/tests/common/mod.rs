//! Shared test fixtures: an in-memory store, scripted mock chains for
//! both families, a mock decryptor, and a recording progress sink.

#![allow(dead_code)]

use num_bigint::BigUint;
use payout_core::connector::{
    AssetMetadata, ChainMetadata, ChainProvider, EvmChain, SubmitOutcome, SubstrateChain,
    TerminalStatus,
};
use payout_core::error::{PayoutError, PayoutResult};
use payout_core::progress::{ProgressEvent, ProgressSink};
use payout_core::record::{ChainOptions, Treasury};
use payout_core::secret::SecretDecryptor;
use payout_core::store::PayoutStore;
use payout_core::types::{ChainFamily, TreasuryId};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

pub fn store() -> PayoutStore {
    let store = PayoutStore::in_memory().expect("open in-memory store");
    store.migrate().expect("migrate");
    store
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn big(v: u64) -> BigUint {
    BigUint::from(v)
}

// ── Treasury fixtures ──────────────────────────────────────────

pub fn substrate_treasury(id: TreasuryId) -> Treasury {
    Treasury {
        id,
        name: format!("treasury-{id}"),
        family: ChainFamily::Substrate,
        coin_name: "DOT".into(),
        rpc_url: "wss://chain.test".into(),
        wallet_secret: "enc:seed".into(),
        chain_prefix: 0,
        chain_options: None,
        is_native: true,
        token_address: None,
        token_decimals: 10,
        asset_id: None,
        royalty_enabled: false,
        royalty_address: None,
        royalty_percentage: None,
        send_min_balance: false,
        send_existential_deposit: false,
    }
}

pub fn evm_treasury(id: TreasuryId) -> Treasury {
    Treasury {
        id,
        name: format!("treasury-{id}"),
        family: ChainFamily::Evm,
        coin_name: "GLMR".into(),
        rpc_url: "https://chain.test".into(),
        wallet_secret: "enc:key".into(),
        chain_prefix: 0,
        chain_options: None,
        is_native: true,
        token_address: None,
        token_decimals: 18,
        asset_id: None,
        royalty_enabled: false,
        royalty_address: None,
        royalty_percentage: None,
        send_min_balance: false,
        send_existential_deposit: false,
    }
}

// ── Mock chains ────────────────────────────────────────────────

/// One recorded transfer submission, either family.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: &'static str,
    pub receiver: String,
    pub amount: BigUint,
    pub asset_id: Option<u32>,
}

#[derive(Default)]
pub struct ChainState {
    /// Address the treasury secret derives to, both families.
    pub wallet_address: String,
    pub token_decimals: u32,
    pub existential_deposit: BigUint,
    pub free_balances: HashMap<String, BigUint>,
    pub asset_decimals: u32,
    pub asset_min_balance: BigUint,
    pub asset_balances: HashMap<(u32, String), BigUint>,
    pub native_balances: HashMap<String, BigUint>,
    pub token_balances: HashMap<String, BigUint>,
    /// Terminal status for the next substrate submission; InBlock when
    /// empty.
    pub next_statuses: Vec<TerminalStatus>,
    /// Dispatch error attached to the next included submission.
    pub next_dispatch_error: Option<String>,
    pub refuse_connect: bool,
    pub substrate_connects: usize,
    pub evm_connects: usize,
    pub submissions: Vec<Submission>,
}

/// Scripted provider for both chain families, shared state.
#[derive(Clone, Default)]
pub struct MockChains {
    pub state: Rc<RefCell<ChainState>>,
}

impl MockChains {
    pub fn new() -> Self {
        let chains = MockChains::default();
        {
            let mut state = chains.state.borrow_mut();
            state.wallet_address = "WALLET".into();
            // Match the substrate_treasury fixture's 10-decimal token.
            state.token_decimals = 10;
        }
        chains
    }

    pub fn connect_count(&self) -> usize {
        let s = self.state.borrow();
        s.substrate_connects + s.evm_connects
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.borrow().submissions.clone()
    }

    pub fn set_free_balance(&self, address: &str, balance: u64) {
        self.state
            .borrow_mut()
            .free_balances
            .insert(address.into(), big(balance));
    }

    pub fn set_asset_balance(&self, asset_id: u32, address: &str, balance: u64) {
        self.state
            .borrow_mut()
            .asset_balances
            .insert((asset_id, address.into()), big(balance));
    }

    pub fn set_native_balance(&self, address: &str, balance: u64) {
        self.state
            .borrow_mut()
            .native_balances
            .insert(address.into(), big(balance));
    }

    pub fn set_token_balance(&self, address: &str, balance: u64) {
        self.state
            .borrow_mut()
            .token_balances
            .insert(address.into(), big(balance));
    }

    fn next_outcome(state: &mut ChainState) -> SubmitOutcome {
        let status = if state.next_statuses.is_empty() {
            TerminalStatus::InBlock
        } else {
            state.next_statuses.remove(0)
        };
        SubmitOutcome {
            status,
            tx_hash: Some(format!("0x{}", uuid::Uuid::new_v4().simple())),
            dispatch_error: state.next_dispatch_error.take(),
        }
    }
}

impl ChainProvider for MockChains {
    fn connect_substrate(
        &self,
        _rpc_url: &str,
        _options: &ChainOptions,
    ) -> PayoutResult<Box<dyn SubstrateChain>> {
        let mut state = self.state.borrow_mut();
        if state.refuse_connect {
            return Err(PayoutError::Chain("RPC connection failed".into()));
        }
        state.substrate_connects += 1;
        drop(state);
        Ok(Box::new(SubstrateHandle {
            state: self.state.clone(),
        }))
    }

    fn connect_evm(&self, _rpc_url: &str) -> PayoutResult<Box<dyn EvmChain>> {
        let mut state = self.state.borrow_mut();
        if state.refuse_connect {
            return Err(PayoutError::Chain("RPC connection failed".into()));
        }
        state.evm_connects += 1;
        drop(state);
        Ok(Box::new(EvmHandle {
            state: self.state.clone(),
        }))
    }
}

struct SubstrateHandle {
    state: Rc<RefCell<ChainState>>,
}

impl SubstrateChain for SubstrateHandle {
    fn metadata(&self) -> PayoutResult<ChainMetadata> {
        let s = self.state.borrow();
        Ok(ChainMetadata {
            token_decimals: s.token_decimals,
            existential_deposit: s.existential_deposit.clone(),
        })
    }

    fn free_balance(&self, address: &str) -> PayoutResult<BigUint> {
        Ok(self
            .state
            .borrow()
            .free_balances
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn asset_metadata(&self, _asset_id: u32) -> PayoutResult<AssetMetadata> {
        let s = self.state.borrow();
        Ok(AssetMetadata {
            decimals: s.asset_decimals,
            min_balance: s.asset_min_balance.clone(),
        })
    }

    fn asset_balance(&self, asset_id: u32, address: &str) -> PayoutResult<BigUint> {
        Ok(self
            .state
            .borrow()
            .asset_balances
            .get(&(asset_id, address.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn encode_address(&self, address: &str, _prefix: u16) -> PayoutResult<String> {
        Ok(address.to_string())
    }

    fn derive_address(&self, _secret: &str) -> PayoutResult<String> {
        Ok(self.state.borrow().wallet_address.clone())
    }

    fn submit_native_transfer(
        &self,
        _secret: &str,
        receiver: &str,
        amount: &BigUint,
        _tip: u64,
    ) -> PayoutResult<SubmitOutcome> {
        let mut s = self.state.borrow_mut();
        let outcome = MockChains::next_outcome(&mut s);
        if matches!(
            outcome.status,
            TerminalStatus::InBlock | TerminalStatus::Finalized
        ) {
            let wallet = s.wallet_address.clone();
            debit(&mut s.free_balances, &wallet, amount);
            credit(&mut s.free_balances, receiver, amount);
        }
        s.submissions.push(Submission {
            kind: "substrate_native",
            receiver: receiver.to_string(),
            amount: amount.clone(),
            asset_id: None,
        });
        Ok(outcome)
    }

    fn submit_asset_transfer(
        &self,
        _secret: &str,
        asset_id: u32,
        receiver: &str,
        amount: &BigUint,
        _tip: u64,
    ) -> PayoutResult<SubmitOutcome> {
        let mut s = self.state.borrow_mut();
        let outcome = MockChains::next_outcome(&mut s);
        s.submissions.push(Submission {
            kind: "substrate_asset",
            receiver: receiver.to_string(),
            amount: amount.clone(),
            asset_id: Some(asset_id),
        });
        Ok(outcome)
    }
}

struct EvmHandle {
    state: Rc<RefCell<ChainState>>,
}

impl EvmChain for EvmHandle {
    fn native_balance(&self, address: &str) -> PayoutResult<BigUint> {
        Ok(self
            .state
            .borrow()
            .native_balances
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn token_balance(&self, _token_address: &str, address: &str) -> PayoutResult<BigUint> {
        Ok(self
            .state
            .borrow()
            .token_balances
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    fn derive_address(&self, _private_key: &str) -> PayoutResult<String> {
        Ok(self.state.borrow().wallet_address.clone())
    }

    fn submit_native_transfer(
        &self,
        _private_key: &str,
        receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String> {
        let mut s = self.state.borrow_mut();
        let wallet = s.wallet_address.clone();
        debit(&mut s.native_balances, &wallet, amount);
        s.submissions.push(Submission {
            kind: "evm_native",
            receiver: receiver.to_string(),
            amount: amount.clone(),
            asset_id: None,
        });
        Ok(format!("0x{}", uuid::Uuid::new_v4().simple()))
    }

    fn submit_token_transfer(
        &self,
        _private_key: &str,
        _token_address: &str,
        receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String> {
        let mut s = self.state.borrow_mut();
        let wallet = s.wallet_address.clone();
        debit(&mut s.token_balances, &wallet, amount);
        s.submissions.push(Submission {
            kind: "evm_token",
            receiver: receiver.to_string(),
            amount: amount.clone(),
            asset_id: None,
        });
        Ok(format!("0x{}", uuid::Uuid::new_v4().simple()))
    }
}

fn debit(balances: &mut HashMap<String, BigUint>, address: &str, amount: &BigUint) {
    if let Some(balance) = balances.get_mut(address) {
        if *balance >= *amount {
            *balance -= amount;
        } else {
            *balance = BigUint::default();
        }
    }
}

fn credit(balances: &mut HashMap<String, BigUint>, address: &str, amount: &BigUint) {
    let entry = balances.entry(address.to_string()).or_default();
    *entry += amount;
}

// ── Decryption and progress ────────────────────────────────────

/// Accepts exactly one key; strips the `enc:` prefix as "decryption".
pub struct MockDecryptor {
    pub key: String,
}

impl MockDecryptor {
    pub fn new(key: &str) -> Self {
        Self { key: key.into() }
    }
}

impl SecretDecryptor for MockDecryptor {
    fn decrypt(&self, ciphertext: &str, key: &str) -> PayoutResult<String> {
        if key != self.key {
            return Err(PayoutError::InvalidEncryptionKey);
        }
        Ok(ciphertext.strip_prefix("enc:").unwrap_or(ciphertext).into())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ProgressEvent>,
}

impl ProgressSink for RecordingSink {
    fn processing(&mut self, current: usize, total: usize) {
        self.events.push(ProgressEvent::Processing { current, total });
    }

    fn processed(&mut self) {
        self.events.push(ProgressEvent::Processed);
    }
}
