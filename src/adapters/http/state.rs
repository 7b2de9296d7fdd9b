//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use crate::application::chat::{ChatPipeline, Greeter};
use crate::application::insights::InsightsService;
use crate::ports::ConversationStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub store: Arc<dyn ConversationStore>,
    pub greeter: Arc<Greeter>,
    pub insights: Arc<InsightsService>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ChatPipeline>,
        store: Arc<dyn ConversationStore>,
        greeter: Arc<Greeter>,
        insights: Arc<InsightsService>,
    ) -> Self {
        Self {
            pipeline,
            store,
            greeter,
            insights,
        }
    }
}
