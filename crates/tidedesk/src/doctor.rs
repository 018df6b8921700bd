// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidedesk doctor` command implementation.
//!
//! Runs diagnostic checks against the Tidedesk environment to identify
//! configuration issues, database problems, and cache connectivity.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use tidedesk_cache::ConversationCache;
use tidedesk_config::TidedeskConfig;
use tidedesk_config::validation::validate_config;
use tidedesk_core::TidedeskError;
use tidedesk_storage::Database;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

/// Run the `tidedesk doctor` command.
///
/// With `--plain`, disables colored output. Returns an error (and a nonzero
/// exit) when any check fails.
pub async fn run_doctor(config: &TidedeskConfig, plain: bool) -> Result<(), TidedeskError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config).await,
        check_database(config).await,
        check_cache(config).await,
    ];

    println!();
    println!("  tidedesk doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line = match result.status {
            CheckStatus::Pass => {
                if use_color {
                    use colored::Colorize;
                    let symbol = "✓".green();
                    format!("    {symbol} {:<12} {} ({duration_ms}ms)", result.name, result.message)
                } else {
                    format!("    [OK]   {:<12} {} ({duration_ms}ms)", result.name, result.message)
                }
            }
            CheckStatus::Warn => {
                warn_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "!".yellow();
                    format!("    {symbol} {:<12} {} ({duration_ms}ms)", result.name, result.message)
                } else {
                    format!("    [WARN] {:<12} {} ({duration_ms}ms)", result.name, result.message)
                }
            }
            CheckStatus::Fail => {
                fail_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "✗".red();
                    format!("    {symbol} {:<12} {} ({duration_ms}ms)", result.name, result.message)
                } else {
                    format!("    [FAIL] {:<12} {} ({duration_ms}ms)", result.name, result.message)
                }
            }
        };
        println!("{line}");
    }

    println!();
    println!("  {} checks, {fail_count} failed, {warn_count} warnings", results.len());
    println!();

    if fail_count > 0 {
        return Err(TidedeskError::Internal(format!(
            "{fail_count} doctor check(s) failed"
        )));
    }
    Ok(())
}

async fn check_config(config: &TidedeskConfig) -> CheckResult {
    let start = Instant::now();
    match validate_config(config) {
        Ok(()) => CheckResult {
            name: "config".to_string(),
            status: CheckStatus::Pass,
            message: "valid".to_string(),
            duration: start.elapsed(),
        },
        Err(errors) => CheckResult {
            name: "config".to_string(),
            status: CheckStatus::Fail,
            message: format!("{} validation error(s)", errors.len()),
            duration: start.elapsed(),
        },
    }
}

async fn check_database(config: &TidedeskConfig) -> CheckResult {
    let start = Instant::now();
    let result = async {
        let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(|e| TidedeskError::Storage { source: Box::new(e) })?;
        db.close().await
    }
    .await;

    match result {
        Ok(()) => CheckResult {
            name: "database".to_string(),
            status: CheckStatus::Pass,
            message: format!("reachable at {}", config.storage.database_path),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name: "database".to_string(),
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}

async fn check_cache(config: &TidedeskConfig) -> CheckResult {
    let start = Instant::now();
    let cache = ConversationCache::connect(&config.cache).await;
    let alive = cache.ping().await;
    let backend = cache.backend_name();

    // The in-process fallback is healthy but worth surfacing: the operator
    // probably expected Redis.
    let status = if !alive {
        CheckStatus::Fail
    } else if config.cache.enabled && backend == "in-process" {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    let message = match status {
        CheckStatus::Pass => format!("{backend} backend responding"),
        CheckStatus::Warn => "redis unreachable, running on in-process fallback".to_string(),
        CheckStatus::Fail => format!("{backend} backend not responding"),
    };
    CheckResult {
        name: "cache".to_string(),
        status,
        message,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config(dir: &std::path::Path) -> TidedeskConfig {
        let mut config = TidedeskConfig::default();
        config.storage.database_path = dir.join("doctor.db").to_string_lossy().to_string();
        config.cache.enabled = false;
        config
    }

    #[tokio::test]
    async fn doctor_passes_on_healthy_fallback_setup() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        run_doctor(&config, true).await.unwrap();
    }

    #[tokio::test]
    async fn config_check_flags_invalid_values() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.memory.continuity_window_hours = 0;
        let result = check_config(&config).await;
        assert_eq!(result.status, CheckStatus::Fail);
    }

    #[tokio::test]
    async fn cache_check_warns_when_redis_expected_but_absent() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.cache.enabled = true;
        config.cache.url = "redis://127.0.0.1:1".to_string();
        config.cache.connect_timeout_ms = 100;
        let result = check_cache(&config).await;
        assert_eq!(result.status, CheckStatus::Warn);
    }
}
