//! Chain connector interfaces.
//!
//! The engine does not implement RPC transport, key derivation, or
//! signing — it consumes these capabilities through the traits below.
//! Both families share the same shape: connect, query, submit, await a
//! terminal status. Submission blocks until the connector reports a
//! terminal outcome; a connection handle releases its resources when
//! dropped, on success and failure paths alike.

use crate::error::PayoutResult;
use crate::record::ChainOptions;
use num_bigint::BigUint;

/// Chain-level constants read once per connection.
#[derive(Debug, Clone)]
pub struct ChainMetadata {
    pub token_decimals: u32,
    /// Minimum balance an account must hold to stay alive.
    pub existential_deposit: BigUint,
}

/// Asset-pallet metadata for one asset id.
#[derive(Debug, Clone)]
pub struct AssetMetadata {
    pub decimals: u32,
    pub min_balance: BigUint,
}

/// The chain-reported outcome of a submitted transaction, observed via
/// the connector's block-inclusion notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    InBlock,
    Finalized,
    Invalid,
    Usurped,
    Dropped,
    FinalityTimeout,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalStatus::InBlock => "in block",
            TerminalStatus::Finalized => "finalized",
            TerminalStatus::Invalid => "invalid",
            TerminalStatus::Usurped => "usurped",
            TerminalStatus::Dropped => "dropped",
            TerminalStatus::FinalityTimeout => "timeout",
        }
    }
}

/// What a submission resolved to once the chain reached a terminal
/// status. A transaction can be included in a block and still carry a
/// dispatch error; the submission procedures treat that as failure.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub status: TerminalStatus,
    pub tx_hash: Option<String>,
    pub dispatch_error: Option<String>,
}

/// An open connection to a substrate-family chain.
pub trait SubstrateChain {
    fn metadata(&self) -> PayoutResult<ChainMetadata>;

    /// Free balance of an account, in smallest units.
    fn free_balance(&self, address: &str) -> PayoutResult<BigUint>;

    fn asset_metadata(&self, asset_id: u32) -> PayoutResult<AssetMetadata>;

    /// Asset balance of an account; zero when the account holds none.
    fn asset_balance(&self, asset_id: u32, address: &str) -> PayoutResult<BigUint>;

    /// Re-encode an SS58 address under the chain's prefix.
    fn encode_address(&self, address: &str, prefix: u16) -> PayoutResult<String>;

    /// Address of the account a secret URI derives to.
    fn derive_address(&self, secret: &str) -> PayoutResult<String>;

    /// Sign and submit a keep-alive native transfer, blocking until a
    /// terminal status.
    fn submit_native_transfer(
        &self,
        secret: &str,
        receiver: &str,
        amount: &BigUint,
        tip: u64,
    ) -> PayoutResult<SubmitOutcome>;

    /// Sign and submit a keep-alive asset transfer, blocking until a
    /// terminal status.
    fn submit_asset_transfer(
        &self,
        secret: &str,
        asset_id: u32,
        receiver: &str,
        amount: &BigUint,
        tip: u64,
    ) -> PayoutResult<SubmitOutcome>;
}

/// An open connection to an EVM-family chain.
pub trait EvmChain {
    fn native_balance(&self, address: &str) -> PayoutResult<BigUint>;

    fn token_balance(&self, token_address: &str, address: &str) -> PayoutResult<BigUint>;

    /// Address of the account a private key derives to.
    fn derive_address(&self, private_key: &str) -> PayoutResult<String>;

    /// Sign and submit a plain value transfer; returns the receipt's
    /// transaction hash.
    fn submit_native_transfer(
        &self,
        private_key: &str,
        receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String>;

    /// Sign and submit an encoded token transfer call (the connector
    /// estimates gas and gas price); returns the receipt's hash.
    fn submit_token_transfer(
        &self,
        private_key: &str,
        token_address: &str,
        receiver: &str,
        amount: &BigUint,
    ) -> PayoutResult<String>;
}

/// Opens connections for either chain family. Connection failures
/// classify as general errors.
pub trait ChainProvider {
    fn connect_substrate(
        &self,
        rpc_url: &str,
        options: &ChainOptions,
    ) -> PayoutResult<Box<dyn SubstrateChain>>;

    fn connect_evm(&self, rpc_url: &str) -> PayoutResult<Box<dyn EvmChain>>;
}
