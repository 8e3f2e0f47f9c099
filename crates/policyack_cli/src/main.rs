//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `policyack_core` linkage and storage wiring from a shell.
//! - Print the latest-policy coverage line for the configured database.

use policyack_core::db::open_db;
use policyack_core::{
    core_version, init_logging, CoreConfig, PolicyAckService, SqliteKeyValueStore, SystemClock,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("policyack_core version={}", core_version());

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("logging disabled: {err}");
        }
    }

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("event=cli_start module=cli status=error error={}", err);
            eprintln!("failed to open `{}`: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let service = PolicyAckService::open(SqliteKeyValueStore::new(&conn), SystemClock);
    let summary = service.latest_summary();
    println!(
        "latest policy=\"{}\" version={} acknowledged={}/{} coverage={}% pending={}",
        summary.policy.title,
        summary.policy.version_label(),
        summary.coverage.acknowledged,
        summary.coverage.total,
        summary.percentage,
        summary.pending
    );

    ExitCode::SUCCESS
}
