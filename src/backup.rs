//! Rotating database backups taken before bulk writes.

use crate::db::Db;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use std::path::PathBuf;
use tracing::debug;

/// Prefix for SQLite backup files.
pub(crate) const SQLITE: &str = "ledger.sqlite";

/// Manages backup file creation and rotation.
///
/// Create an instance via `Config::backup()`.
#[derive(Debug, Clone)]
pub(crate) struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
    db: Db,
}

impl Backup {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
            db: config.db().clone(),
        }
    }

    /// Writes a consistent copy of the database to the backups directory.
    ///
    /// The filename format is `ledger.sqlite.YYYY-MM-DD-NNN`. Old backups are rotated so that at
    /// most `backup_copies` remain.
    ///
    /// Returns the path to the created backup file.
    pub(crate) async fn copy_sqlite(&self) -> Result<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(SQLITE, &date).await?;
        let path = self.backups_dir.join(format!("{SQLITE}.{date}-{seq:03}"));

        self.db.snapshot_into(&path).await?;
        debug!("Backed up the database to {}", path.display());

        self.rotate(SQLITE).await?;
        Ok(path)
    }

    /// Scans the backups directory for files with the given prefix and date and returns the next
    /// sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name();
            if let Some(seq) = parse_sequence_number(&file_name.to_string_lossy(), prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }

        Ok(max_seq + 1)
    }

    /// Deletes the oldest backups with `prefix`, keeping `backup_copies` of them.
    async fn rotate(&self, prefix: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, String)> = Vec::new();

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name, prefix) {
                files.push((entry.path(), name));
            }
        }

        // Names sort by date, then by sequence number.
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            debug!("Removing old backup {}", path.display());
            utils::remove(&path).await?;
        }

        Ok(())
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses the sequence number from a name like `{prefix}.{date}-{NNN}`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    let expected_start = format!("{prefix}.{date}-");
    filename.strip_prefix(&expected_start)?.parse().ok()
}

fn is_backup_file(filename: &str, prefix: &str) -> bool {
    let Some(rest) = filename.strip_prefix(&format!("{prefix}.")) else {
        return false;
    };
    // YYYY-MM-DD-NNN
    rest.len() == 14 && rest.chars().all(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("ledger.sqlite.2025-12-14-001", SQLITE, "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("ledger.sqlite.2025-12-14-042", SQLITE, "2025-12-14"),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number("ledger.sqlite.2025-12-13-001", SQLITE, "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("other.2025-12-14-001", SQLITE, "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("ledger.sqlite.2025-12-14-001", SQLITE));
        assert!(!is_backup_file("ledger.sqlite-wal", SQLITE));
        assert!(!is_backup_file("ledger.sqlite.2025-12-14-001.json", SQLITE));
        assert!(!is_backup_file("config.json", SQLITE));
    }

    #[tokio::test]
    async fn test_copy_sqlite_rotates() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();

        let mut made = Vec::new();
        for _ in 0..(env.config().backup_copies() + 2) {
            made.push(backup.copy_sqlite().await.unwrap());
        }

        let mut remaining = 0;
        let mut dir = utils::read_dir(env.config().backups()).await.unwrap();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            assert!(is_backup_file(&entry.file_name().to_string_lossy(), SQLITE));
            remaining += 1;
        }
        assert_eq!(remaining, env.config().backup_copies());
        assert!(!made[0].exists());
        assert!(made.last().unwrap().is_file());
    }
}
