//! PostgreSQL implementation of the conversation store.
//!
//! Conversations are created implicitly on first append through an atomic
//! insert-or-get on the session key, so concurrent first-appends for the
//! same unknown key land in one conversation record.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::domain::conversation::{Conversation, Message, NewMessage, Role};
use crate::ports::{ConversationStore, StoreError};

#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolves the conversation id for a session key, creating the row if
    /// absent. The no-op DO UPDATE makes RETURNING fire on conflict too.
    async fn insert_or_get_conversation(
        tx: &mut Transaction<'_, Postgres>,
        session_key: &str,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO conversations (session_key)
            VALUES ($1)
            ON CONFLICT (session_key)
            DO UPDATE SET session_key = EXCLUDED.session_key
            RETURNING id
            "#,
        )
        .bind(session_key)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to upsert conversation: {e}")))?;

        Ok(row.get("id"))
    }

    async fn insert_messages(
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: i64,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        for message in messages.iter().filter(|m| !m.is_empty()) {
            let sources = message
                .sources
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| StoreError::Database(format!("Failed to encode sources: {e}")))?;
            let follow_ups = message
                .follow_ups
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(|e| StoreError::Database(format!("Failed to encode follow-ups: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO messages (
                    conversation_id, role, content, author_id,
                    sources, follow_ups, images
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(conversation_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(&message.author_id)
            .bind(sources)
            .bind(follow_ups)
            .bind(&message.images)
            .execute(&mut **tx)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to insert message: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn get(&self, session_key: &str) -> Result<Option<Conversation>, StoreError> {
        // Both reads run inside one transaction so the message list can
        // never be truncated relative to the conversation row.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {e}")))?;

        let conv_row = sqlx::query(
            r#"
            SELECT id, greeted, display_name
            FROM conversations
            WHERE session_key = $1
            "#,
        )
        .bind(session_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch conversation: {e}")))?;

        let conv_row = match conv_row {
            Some(row) => row,
            None => return Ok(None),
        };
        let conversation_id: i64 = conv_row.get("id");

        let message_rows = sqlx::query(
            r#"
            SELECT id, role, content, author_id, created_at,
                   sources, follow_ups, images
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch messages: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit read: {e}")))?;

        let messages = message_rows
            .iter()
            .map(|row| {
                let sources: Option<serde_json::Value> = row.get("sources");
                let sources = sources
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| StoreError::Corrupt(format!("bad sources payload: {e}")))?;
                let follow_ups: Option<serde_json::Value> = row.get("follow_ups");
                let follow_ups = follow_ups
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| StoreError::Corrupt(format!("bad follow-up payload: {e}")))?;

                let role: &str = row.get("role");
                Ok(Message {
                    id: row.get("id"),
                    role: Role::parse(role),
                    content: row.get("content"),
                    author_id: row.get("author_id"),
                    created_at: row.get("created_at"),
                    sources,
                    follow_ups,
                    images: row.get("images"),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(Conversation {
            session_key: session_key.to_string(),
            greeted: conv_row.get("greeted"),
            display_name: conv_row.get("display_name"),
            messages,
        }))
    }

    async fn append(&self, session_key: &str, messages: &[NewMessage]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {e}")))?;

        let conversation_id = Self::insert_or_get_conversation(&mut tx, session_key).await?;
        Self::insert_messages(&mut tx, conversation_id, messages).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit append: {e}")))?;
        Ok(())
    }

    async fn upsert_greeting(
        &self,
        session_key: &str,
        display_name: Option<&str>,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to start transaction: {e}")))?;

        let conversation_id = Self::insert_or_get_conversation(&mut tx, session_key).await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET greeted = TRUE, display_name = $2
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(display_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to mark greeted: {e}")))?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to clear messages: {e}")))?;

        Self::insert_messages(&mut tx, conversation_id, messages).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to commit greeting: {e}")))?;
        Ok(())
    }
}
