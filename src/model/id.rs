//! Content-derived identifiers for transactions.
//!
//! A transaction's identity comes from the evidence that produced it, never from values parsed out
//! of that evidence. Re-scanning the same message history therefore reconciles to the same
//! records: the amount or category of a record may change between scans but its id may not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// The namespace under which transaction ids are derived. Changing it changes every id.
const TRANSACTION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_93d4_4b57_a0e2_5c7d_31b8_e94f);

/// Separates the components of the canonical string.
const SEPARATOR: &str = "_";

/// A stable identifier for a `Transaction`: a name-based (version 5) UUID in dashed hex form.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Derives the identifier from the sender address, body and timestamp of a message.
    ///
    /// The address is trimmed and lower-cased, the body is trimmed with its case preserved, and a
    /// missing timestamp counts as the epoch. This never fails, even for empty strings.
    pub fn derive(address: &str, body: &str, timestamp: Option<DateTime<Utc>>) -> Self {
        let canonical = canonical_string(address, body, timestamp);
        let uuid = Uuid::new_v5(&TRANSACTION_NAMESPACE, canonical.as_bytes());
        Self(uuid.hyphenated().to_string())
    }

    /// Wraps an identifier that was previously derived, e.g. one read back from the database or
    /// typed by a user.
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn canonical_string(address: &str, body: &str, timestamp: Option<DateTime<Utc>>) -> String {
    let address = address.trim().to_lowercase();
    let body = body.trim();
    let millis = timestamp.map(|t| t.timestamp_millis()).unwrap_or(0);
    format!("{address}{SEPARATOR}{body}{SEPARATOR}{millis}")
}
