//! Types that represent the core data model, such as `Evidence`, `Transaction` and `Category`.
mod account;
mod amount;
mod category;
mod evidence;
mod id;
mod transaction;

pub use account::AccountInfo;
pub use amount::{Amount, AmountError};
pub use category::{Category, CategoryId, Color};
pub(crate) use category::{default_categories, DEFAULT_CATEGORIES};
pub use evidence::Evidence;
pub use id::TransactionId;
pub use transaction::Transaction;
