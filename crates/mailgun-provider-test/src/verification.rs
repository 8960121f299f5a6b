//! Verification helpers for reconcile scenarios
//!
//! Assertions over the calls [`FakeMailgun`] received and the secrets a
//! [`MemorySecretStore`] holds.

use thiserror::Error;

use crate::fake::FakeMailgun;
use crate::MemorySecretStore;
use mailgun_reconcile_common::SecretReference;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected calls {expected:?}, got {actual:?}")]
    CallMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Expected a call '{call}', got {actual:?}")]
    CallNotFound { call: String, actual: Vec<String> },

    #[error("Expected '{first}' before '{second}', got {actual:?}")]
    CallOrder {
        first: String,
        second: String,
        actual: Vec<String>,
    },

    #[error("Expected secret '{secret}' to exist")]
    SecretNotFound { secret: String },

    #[error("Expected secret '{secret}' to be absent")]
    SecretPresent { secret: String },

    #[error("Expected key '{key}' in secret '{secret}'")]
    KeyNotFound { secret: String, key: String },

    #[error("Value mismatch for {secret}:{key}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        secret: String,
        key: String,
        expected: String,
        actual: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Call log verification helper
pub struct CallVerifier<'a> {
    fake: &'a FakeMailgun,
}

impl<'a> CallVerifier<'a> {
    pub fn new(fake: &'a FakeMailgun) -> Self {
        Self { fake }
    }

    /// Verify the exact call log, as `"METHOD /path"` lines
    pub fn assert_calls(&self, expected: &[&str]) -> VerifyResult<()> {
        let actual = self.fake.call_log();
        if actual != expected {
            return Err(VerificationError::CallMismatch {
                expected: expected.iter().map(|c| c.to_string()).collect(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify that only GET calls were made
    pub fn assert_no_mutations(&self) -> VerifyResult<()> {
        let mutating: Vec<String> = self
            .fake
            .mutating_calls()
            .iter()
            .map(ToString::to_string)
            .collect();
        if !mutating.is_empty() {
            return Err(VerificationError::CallMismatch {
                expected: Vec::new(),
                actual: mutating,
            });
        }
        Ok(())
    }

    /// Verify that a call was made at least once
    pub fn assert_called(&self, call: &str) -> VerifyResult<()> {
        let actual = self.fake.call_log();
        if !actual.iter().any(|c| c == call) {
            return Err(VerificationError::CallNotFound {
                call: call.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Verify that `first` was made before `second`
    pub fn assert_call_order(&self, first: &str, second: &str) -> VerifyResult<()> {
        let actual = self.fake.call_log();
        let first_at = actual.iter().position(|c| c == first);
        let second_at = actual.iter().rposition(|c| c == second);
        match (first_at, second_at) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::CallOrder {
                first: first.to_string(),
                second: second.to_string(),
                actual,
            }),
        }
    }
}

/// Secret store verification helper
pub struct SecretVerifier<'a> {
    store: &'a MemorySecretStore,
}

impl<'a> SecretVerifier<'a> {
    pub fn new(store: &'a MemorySecretStore) -> Self {
        Self { store }
    }

    /// Verify that a secret key has a specific value
    pub fn assert_key(&self, secret: &SecretReference, key: &str, expected: &str) -> VerifyResult<()> {
        let data = self
            .store
            .snapshot(secret)
            .ok_or_else(|| VerificationError::SecretNotFound {
                secret: secret.to_string(),
            })?;
        let actual = data.get(key).ok_or_else(|| VerificationError::KeyNotFound {
            secret: secret.to_string(),
            key: key.to_string(),
        })?;
        let actual = String::from_utf8_lossy(actual);
        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                secret: secret.to_string(),
                key: key.to_string(),
                expected: expected.to_string(),
                actual: actual.into_owned(),
            });
        }
        Ok(())
    }

    /// Verify that every key is present, whatever its value
    pub fn assert_keys(&self, secret: &SecretReference, keys: &[&str]) -> VerifyResult<()> {
        let data = self
            .store
            .snapshot(secret)
            .ok_or_else(|| VerificationError::SecretNotFound {
                secret: secret.to_string(),
            })?;
        for key in keys {
            if !data.contains_key(*key) {
                return Err(VerificationError::KeyNotFound {
                    secret: secret.to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Verify that a secret does not exist
    pub fn assert_absent(&self, secret: &SecretReference) -> VerifyResult<()> {
        if self.store.snapshot(secret).is_some() {
            return Err(VerificationError::SecretPresent {
                secret: secret.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailgun_transport::{ApiRequest, CancellationToken, Transport};

    #[tokio::test]
    async fn test_call_verifier() {
        let fake = FakeMailgun::new();
        let _ = fake
            .execute(ApiRequest::get(["v3", "routes", "r1"]), &CancellationToken::new())
            .await;

        let verifier = CallVerifier::new(&fake);
        verifier.assert_calls(&["GET /v3/routes/r1"]).unwrap();
        verifier.assert_no_mutations().unwrap();
        assert!(verifier.assert_called("DELETE /v3/routes/r1").is_err());
        assert!(verifier
            .assert_call_order("GET /v3/routes/r1", "POST /v3/routes")
            .is_err());
    }

    #[test]
    fn test_secret_verifier() {
        let store = MemorySecretStore::new();
        let secret = SecretReference::new("alerts-smtp", "mail");
        let verifier = SecretVerifier::new(&store);
        verifier.assert_absent(&secret).unwrap();

        store.insert(&secret, [("username", "alerts")]);
        verifier.assert_key(&secret, "username", "alerts").unwrap();
        assert!(matches!(
            verifier.assert_key(&secret, "username", "other"),
            Err(VerificationError::ValueMismatch { .. })
        ));
        assert!(matches!(
            verifier.assert_keys(&secret, &["username", "password"]),
            Err(VerificationError::KeyNotFound { .. })
        ));
    }
}
