use serde::{Deserialize, Serialize};

/// Account metadata as exchanged with the remote document store. A record is keyed by the
/// externally assigned `document_id` together with the owning `user_id`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub document_id: String,
    pub user_id: String,
    pub contact_name: String,
    pub phone_number: String,
    pub account_number: String,
    pub bank_name: String,
}
