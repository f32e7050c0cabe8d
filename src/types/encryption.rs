//! Cipher operation metadata
//!
//! Only lengths, timing and the session id are recorded. Plaintext and
//! ciphertext never reach the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{format_stamp, format_timestamp};

/// Direction of a cipher operation with the length pair that fits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum CipherOperation {
    Encryption {
        original_length: usize,
        encrypted_length: usize,
    },
    Decryption {
        encrypted_length: usize,
        decrypted_length: usize,
    },
}

impl CipherOperation {
    pub fn is_encryption(&self) -> bool {
        matches!(self, CipherOperation::Encryption { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            CipherOperation::Encryption { .. } => "encryption",
            CipherOperation::Decryption { .. } => "decryption",
        }
    }
}

/// One entry in the cipher ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionOperation {
    pub timestamp: String,
    pub username: String,
    #[serde(flatten)]
    pub operation: CipherOperation,
    pub session_id: String,
}

impl EncryptionOperation {
    pub fn new(at: DateTime<Utc>, username: impl Into<String>, operation: CipherOperation) -> Self {
        let username = username.into();
        Self {
            timestamp: format_timestamp(at),
            session_id: session_id_for(&username, at),
            username,
            operation,
        }
    }

    pub fn encryption(
        at: DateTime<Utc>,
        username: impl Into<String>,
        original_length: usize,
        encrypted_length: usize,
    ) -> Self {
        Self::new(
            at,
            username,
            CipherOperation::Encryption {
                original_length,
                encrypted_length,
            },
        )
    }

    pub fn decryption(
        at: DateTime<Utc>,
        username: impl Into<String>,
        encrypted_length: usize,
        decrypted_length: usize,
    ) -> Self {
        Self::new(
            at,
            username,
            CipherOperation::Decryption {
                encrypted_length,
                decrypted_length,
            },
        )
    }
}

/// `<username>_<YYYYmmdd_HHMMSS>`
pub fn session_id_for(username: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", username, format_stamp(at))
}
