use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Ordered schema steps. `user_version` records the last one applied.
const MIGRATIONS: &[(i32, &str)] = &[(1, include_str!("schemas/schema_v1.sql"))];

fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;
    let latest = latest_version();

    if applied > latest {
        bail!("kv store schema v{applied} is newer than this build understands (v{latest})");
    }

    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > applied)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (version, sql) in pending {
        tx.execute_batch(sql)
            .with_context(|| format!("kv store migration v{version} failed"))?;
    }
    tx.pragma_update(None, "user_version", latest)
        .context("failed to record schema version")?;
    tx.commit().context("failed to commit migrations")
}
