use crate::model::{Amount, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound message considered as evidence of a financial event.
///
/// Everything except `address` and `body` is a signal that an upstream parser may or may not have
/// detected, so each of those fields is optional. An absent field means "not detected", which is
/// different from "detected as an empty string".
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Evidence {
    pub address: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Evidence {
    pub fn new(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// The identifier that any transaction derived from this evidence will carry.
    pub fn transaction_id(&self) -> TransactionId {
        TransactionId::derive(&self.address, &self.body, self.timestamp)
    }

    /// The amount the parser extracted, preferring the exact numeric value over the display text.
    pub fn detected_amount(&self) -> Option<Amount> {
        if let Some(amount) = self.numeric_amount.and_then(Amount::from_f64) {
            return Some(amount);
        }
        self.display_amount
            .as_deref()
            .and_then(Amount::from_display)
    }
}
