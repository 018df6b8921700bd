// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tidedesk archive` command implementation.
//!
//! Runs the archival sweep: resolved conversations whose `resolved_at` is
//! older than the age threshold transition to `archived`. Archival is the
//! system's only form of deletion; no rows are removed.

use tidedesk_cache::ConversationCache;
use tidedesk_config::TidedeskConfig;
use tidedesk_core::TidedeskError;
use tidedesk_memory::ConversationMemory;
use tidedesk_storage::Database;
use tracing::info;

/// Run the `tidedesk archive` command.
///
/// `days` overrides the configured `memory.archive_after_days` threshold.
/// Returns the number of conversations archived.
pub async fn run_archive(
    config: &TidedeskConfig,
    days: Option<i64>,
) -> Result<usize, TidedeskError> {
    let days = days.unwrap_or(config.memory.archive_after_days);
    if days <= 0 {
        return Err(TidedeskError::Config(format!(
            "archive threshold must be positive, got {days}"
        )));
    }

    let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
    let cache = ConversationCache::connect(&config.cache).await;
    let memory = ConversationMemory::new(db.clone(), cache, &config.memory);

    let archived = memory.archive_stale(days).await?;
    info!(days, archived, "archival sweep finished");

    db.close().await?;
    Ok(archived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tidedesk_core::types::{Conversation, ConversationStatus, now_rfc3339};
    use tidedesk_storage::queries::conversations;

    fn test_config(dir: &std::path::Path) -> TidedeskConfig {
        let mut config = TidedeskConfig::default();
        config.storage.database_path = dir.join("archive.db").to_string_lossy().to_string();
        config.cache.enabled = false;
        config
    }

    fn resolved_conversation(id: &str, resolved_at: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            customer_id: "cust-1".to_string(),
            status: ConversationStatus::Resolved,
            priority: None,
            category: None,
            message_count: 0,
            escalated: false,
            human_agent_id: None,
            customer_context: None,
            classification_history: vec![],
            articles_referenced: vec![],
            created_at: resolved_at.to_string(),
            updated_at: resolved_at.to_string(),
            resolved_at: Some(resolved_at.to_string()),
        }
    }

    #[tokio::test]
    async fn archives_only_conversations_past_the_threshold() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let db = Database::open(&config.storage.database_path, true).await.unwrap();
        // Resolved years before any reasonable threshold.
        conversations::create_conversation(
            &db,
            &resolved_conversation("conv-old", "2020-01-01T00:00:00.000Z"),
        )
        .await
        .unwrap();
        // Resolved just now; must survive the sweep.
        conversations::create_conversation(
            &db,
            &resolved_conversation("conv-fresh", &now_rfc3339()),
        )
        .await
        .unwrap();
        db.close().await.unwrap();

        let archived = run_archive(&config, Some(30)).await.unwrap();
        assert_eq!(archived, 1);

        let db = Database::open(&config.storage.database_path, true).await.unwrap();
        let old = conversations::get_conversation(&db, "conv-old")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.status, ConversationStatus::Archived);
        let fresh = conversations::get_conversation(&db, "conv-fresh")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.status, ConversationStatus::Resolved);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_nonpositive_threshold() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let err = run_archive(&config, Some(0)).await.unwrap_err();
        assert!(matches!(err, TidedeskError::Config(_)));
    }
}
