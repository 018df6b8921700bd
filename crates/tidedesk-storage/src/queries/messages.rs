// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations. Messages are immutable once inserted.

use rusqlite::params;
use tidedesk_core::TidedeskError;
use tidedesk_core::types::{Message, Role};

use crate::database::{Database, map_tr_err};

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, classification_result, tools_used, \
     processing_time_ms, created_at";

/// Convert a rusqlite row (selected with [`MESSAGE_COLUMNS`]) into a [`Message`].
pub(crate) fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    let classification_result: Option<String> = row.get(4)?;
    let tools_used: String = row.get(5)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: Role::from_str_value(&role),
        content: row.get(3)?,
        classification_result: classification_result.and_then(|s| serde_json::from_str(&s).ok()),
        tools_used: serde_json::from_str(&tools_used).unwrap_or_default(),
        processing_time_ms: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert a message row inside an existing transaction.
pub(crate) fn insert_message_tx(
    conn: &rusqlite::Connection,
    msg: &Message,
) -> rusqlite::Result<()> {
    let classification_result = msg
        .classification_result
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let tools_used = serde_json::to_string(&msg.tools_used)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, content, classification_result, \
         tools_used, processing_time_ms, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            msg.id,
            msg.conversation_id,
            msg.role.as_str(),
            msg.content,
            classification_result,
            tools_used,
            msg.processing_time_ms,
            msg.created_at,
        ],
    )?;
    Ok(())
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), TidedeskError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            insert_message_tx(conn, &msg)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get messages for a conversation in chronological order, capped at `limit`.
pub async fn get_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, TidedeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC, rowid ASC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC, rowid ASC"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Count persisted messages for a conversation.
///
/// Used to verify the `message_count` denormalization invariant.
pub async fn count_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<i64, TidedeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}
