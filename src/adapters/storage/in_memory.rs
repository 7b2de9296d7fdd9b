//! In-memory conversation store for tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::conversation::{Conversation, Message, NewMessage};
use crate::ports::{ConversationStore, StoreError};

/// Hash-map-backed store. A single mutex over the whole map gives the same
/// atomicity the database adapter gets from transactions, which is what the
/// concurrent first-append guarantee needs.
#[derive(Default)]
pub struct InMemoryConversationStore {
    inner: Mutex<HashMap<String, Record>>,
    next_id: Mutex<i64>,
}

struct Record {
    greeted: bool,
    display_name: Option<String>,
    messages: Vec<Message>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&self, next_id: &mut i64, message: &NewMessage) -> Message {
        *next_id += 1;
        Message {
            id: *next_id,
            role: message.role,
            content: message.content.clone(),
            author_id: message.author_id.clone(),
            created_at: Utc::now(),
            sources: message.sources.clone(),
            follow_ups: message.follow_ups.clone(),
            images: message.images.clone(),
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, session_key: &str) -> Result<Option<Conversation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(session_key).map(|record| Conversation {
            session_key: session_key.to_string(),
            greeted: record.greeted,
            display_name: record.display_name.clone(),
            messages: record.messages.clone(),
        }))
    }

    async fn append(&self, session_key: &str, messages: &[NewMessage]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let record = inner.entry(session_key.to_string()).or_insert_with(|| Record {
            greeted: false,
            display_name: None,
            messages: Vec::new(),
        });

        for message in messages.iter().filter(|m| !m.is_empty()) {
            let stamped = self.stamp(&mut next_id, message);
            record.messages.push(stamped);
        }
        Ok(())
    }

    async fn upsert_greeting(
        &self,
        session_key: &str,
        display_name: Option<&str>,
        messages: &[NewMessage],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let stamped = messages
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| self.stamp(&mut next_id, m))
            .collect();

        inner.insert(
            session_key.to_string(),
            Record {
                greeted: true,
                display_name: display_name.map(str::to_string),
                messages: stamped,
            },
        );
        Ok(())
    }
}
