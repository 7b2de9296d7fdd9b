//! Application services built on the ports.

pub mod chat;
pub mod insights;
