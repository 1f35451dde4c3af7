//! A local ledger of financial transactions derived from bank SMS messages.
//!
//! Each message (`model::Evidence`) yields at most one `model::Transaction`, whose id is derived
//! from the message content. Storing the same message again replaces the record instead of
//! duplicating it. The `store` traits describe the queries available over transactions,
//! categories and accounts; the SQLite implementation lives behind `Config`.

pub mod args;
mod backup;
pub mod commands;
mod config;
mod db;
mod error;
mod ingest;
pub mod model;
pub mod spending;
pub mod store;
mod utils;


pub use config::Config;
pub use db::Table;
pub use error::{Error, ErrorType, Result};
pub use ingest::ImportReport;
