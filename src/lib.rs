//! Propsight - conversational AI backend for real-estate market analytics
//!
//! Streams chat answers over SSE while orchestrating a tool-using reasoning
//! agent, persists conversation history in PostgreSQL, and produces
//! deterministic investment-score insights.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
