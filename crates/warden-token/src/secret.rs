use std::env;
use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

use crate::error::SecretError;

/// Length of the raw HMAC key in bytes.
pub const SECRET_LEN: usize = 32;

/// Environment variable read by [`SigningSecret::from_env`], expected to hold
/// the key as a 64-character hex string.
pub const SECRET_ENV: &str = "WARDEN_SIGNING_SECRET";

/// Symmetric key used to sign and verify tokens.
///
/// The raw bytes never leave this type: `Debug` prints only the key id,
/// there is no `Serialize` implementation, and the buffer is zeroized on
/// drop. Anything that needs to name the key in logs uses [`key_id`].
///
/// [`key_id`]: SigningSecret::key_id
#[derive(Clone, ZeroizeOnDrop)]
pub struct SigningSecret {
    bytes: [u8; SECRET_LEN],
}

impl SigningSecret {
    /// Generates a fresh secret from the OS entropy source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self { bytes }
    }

    /// Parses a secret from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, SecretError> {
        let decoded = hex::decode(hex_str)?;
        let bytes: [u8; SECRET_LEN] =
            decoded
                .try_into()
                .map_err(|rejected: Vec<u8>| SecretError::InvalidLength {
                    expected: SECRET_LEN,
                    actual: rejected.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Loads the secret from [`SECRET_ENV`], falling back to a fresh random
    /// secret when the variable is absent or unusable.
    ///
    /// The fallback keeps single-process setups working out of the box;
    /// tokens minted under an ephemeral secret do not survive a restart.
    pub fn from_env() -> Self {
        match env::var(SECRET_ENV) {
            Ok(raw) => match Self::from_hex(raw.trim()) {
                Ok(secret) => {
                    tracing::debug!(key_id = %secret.key_id(), "signing secret loaded from environment");
                    secret
                }
                Err(e) => {
                    tracing::warn!(error = %e, "invalid WARDEN_SIGNING_SECRET, generating ephemeral secret");
                    Self::generate()
                }
            },
            Err(_) => {
                tracing::debug!("WARDEN_SIGNING_SECRET not set, generating ephemeral secret");
                Self::generate()
            }
        }
    }

    /// Stable identifier for this key, safe to log.
    ///
    /// Format: `sha256:<hex>` over the raw key bytes.
    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(self.bytes);
        format!("sha256:{}", hex::encode(digest))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}
