use crate::args::ImportArgs;
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::ingest::{import_csv, ImportReport};
use crate::{Config, Result};

/// Imports a CSV file of parsed message evidence. See `sms-ledger import --help` for the format.
pub async fn import(config: Config, args: &ImportArgs) -> Result<Out<ImportReport>> {
    let report = import_csv(&config, args.file())
        .await
        .pub_result(ErrorType::Import)?;
    let message = format!(
        "Imported {} and replaced {}",
        plural(report.inserted, "new transaction", "new transactions"),
        plural(report.replaced, "existing transaction", "existing transactions"),
    );
    Ok(Out::new(message, report))
}
