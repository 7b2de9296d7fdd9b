//! Domain layer: conversation model and investment scoring.

pub mod conversation;
pub mod scoring;
