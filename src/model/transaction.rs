use crate::model::{Amount, CategoryId, Evidence, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A financial event derived from one piece of `Evidence`.
///
/// The `id` is computed from the evidence when the transaction is constructed and cannot be changed
/// afterwards. The category assignment is the only part of a stored transaction that is expected to
/// change over its lifetime, so it is the only field with a setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    id: TransactionId,
    date: DateTime<Utc>,
    amount: Amount,
    is_income: bool,
    original_message: Evidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category_id: Option<CategoryId>,
}

impl Transaction {
    /// Creates a transaction from its originating evidence. The enrichment fields start out as
    /// whatever the evidence detected and can be overridden with the `with_*` methods.
    pub fn new(evidence: Evidence, date: DateTime<Utc>, amount: Amount, is_income: bool) -> Self {
        let id = evidence.transaction_id();
        Self {
            id,
            date,
            amount,
            is_income,
            description: None,
            provider: evidence.provider.clone(),
            contact_name: evidence.recipient_contact.clone(),
            account_info: evidence.source_account.clone(),
            user_id: None,
            category_id: None,
            original_message: evidence,
        }
    }

    /// Reassembles a transaction from storage, trusting the stored `id`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: TransactionId,
        date: DateTime<Utc>,
        amount: Amount,
        is_income: bool,
        original_message: Evidence,
        description: Option<String>,
        provider: Option<String>,
        contact_name: Option<String>,
        account_info: Option<String>,
        user_id: Option<String>,
        category_id: Option<CategoryId>,
    ) -> Self {
        Self {
            id,
            date,
            amount,
            is_income,
            original_message,
            description,
            provider,
            contact_name,
            account_info,
            user_id,
            category_id,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_contact_name(mut self, contact_name: Option<String>) -> Self {
        self.contact_name = contact_name;
        self
    }

    pub fn with_account_info(mut self, account_info: Option<String>) -> Self {
        self.account_info = account_info;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn is_income(&self) -> bool {
        self.is_income
    }

    pub fn original_message(&self) -> &Evidence {
        &self.original_message
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn contact_name(&self) -> Option<&str> {
        self.contact_name.as_deref()
    }

    pub fn account_info(&self) -> Option<&str> {
        self.account_info.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category_id.as_ref()
    }

    /// Assigns, or with `None` clears, the category of this transaction.
    pub fn set_category_id(&mut self, category_id: Option<CategoryId>) {
        self.category_id = category_id;
    }
}
