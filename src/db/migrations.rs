use std::path::{Path, PathBuf};

use rusqlite::params;

use crate::error::{AppError, Result};

use super::Repository;

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

/// A migration script pair discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: String,
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Finds `<version>.up.sql` files in `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "migrations directory {} does not exist",
            dir.display()
        )));
    }

    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if let Some(version) = file_name.strip_suffix(UP_SUFFIX) {
            if version.is_empty() {
                continue;
            }
            migrations.push(Migration {
                version: version.to_string(),
                up: entry.path(),
                down: dir.join(format!("{version}{DOWN_SUFFIX}")),
            });
        }
    }

    migrations.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(migrations)
}

/// Applies every migration in `dir` missing from `schema_migrations`.
/// Returns the versions applied by this call.
pub async fn run(repository: &Repository, dir: &Path) -> Result<Vec<String>> {
    let mut applied = Vec::new();

    for migration in discover(dir)? {
        let version = migration.version.clone();
        let already_applied = repository
            .connection()
            .call({
                let version = version.clone();
                move |conn| {
                    let count: i64 = conn.query_row(
                        "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
                        params![version],
                        |row| row.get(0),
                    )?;
                    Ok(count > 0)
                }
            })
            .await?;
        if already_applied {
            tracing::debug!(version = %version, "Migration already applied");
            continue;
        }

        let sql = tokio::fs::read_to_string(&migration.up).await?;
        tracing::info!(
            version = %version,
            reversible = migration.down.is_file(),
            "Applying migration"
        );

        // Script and ledger row commit together, so a failed script is retried next run.
        repository
            .connection()
            .call({
                let version = version.clone();
                move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute_batch(&sql)?;
                    tx.execute(
                        "INSERT INTO schema_migrations (version) VALUES (?1)",
                        params![version],
                    )?;
                    tx.commit()?;
                    Ok(())
                }
            })
            .await
            .map_err(|source| AppError::Migration {
                version: version.clone(),
                source,
            })?;

        applied.push(version);
    }

    tracing::info!(count = applied.len(), "Migrations complete");
    Ok(applied)
}
