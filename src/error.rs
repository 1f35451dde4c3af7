use serde::{Deserialize, Serialize};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a failure that is reported to the user of a command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The data directory or its `config.json` could not be created, read or validated.
    Config,
    /// A storage fault: I/O failure, constraint violation, or a failed migration.
    Database,
    /// An import file could not be read or one of its rows is malformed.
    Import,
    /// The arguments of a request do not make sense, e.g. an unparseable color.
    Request,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// Attaches an `ErrorType` to the error of a `Result` before it leaves a public command function.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Result<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let message = format!("{error_type} error");
            e.context(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_pub_result_prefixes_error_type() {
        let result: Result<()> = Err(anyhow!("disk I/O error"));
        let err = result.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(err.to_string(), "database error");
        assert_eq!(format!("{err:#}"), "database error: disk I/O error");
    }

    #[test]
    fn test_pub_result_passes_ok_through() {
        let result: Result<u8> = Ok(7);
        assert_eq!(result.pub_result(ErrorType::Config).unwrap(), 7);
    }
}
