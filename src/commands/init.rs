use crate::args::InitArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories, an initial `config.json` and the database.
///
/// # Arguments
/// - `ledger_home` - The directory that will be the root of data directory, e.g. `$HOME/sms-ledger`
/// - `args` - Settings to record in `config.json`
///
/// # Errors
/// - Returns an error if any file operations fail or if the directory already holds a ledger.
pub async fn init(ledger_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let config = Config::create(ledger_home, args.user_id().map(str::to_string))
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the ledger directory at {}",
        config.root().display()
    )
    .into())
}
