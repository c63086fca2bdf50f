//! Wallet-secret decryption interface.
//!
//! Treasury secrets are stored encrypted; the operator supplies the key
//! when starting a run. The decrypted material lives only in process
//! memory for the duration of the run and is never written anywhere.

use crate::error::PayoutResult;

pub trait SecretDecryptor {
    /// Decrypt a stored wallet secret with the run's key.
    ///
    /// Implementations must fail with
    /// [`PayoutError::InvalidEncryptionKey`](crate::error::PayoutError)
    /// when the key is wrong or malformed, so the failure lands on
    /// status 7 rather than a general error.
    fn decrypt(&self, ciphertext: &str, key: &str) -> PayoutResult<String>;
}
