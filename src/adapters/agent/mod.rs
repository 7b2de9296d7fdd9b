//! Agent-engine adapters.

mod remote;
mod scripted;

pub use remote::{RemoteAgentEngine, RemoteEngineConfig};
pub use scripted::ScriptedAgentEngine;
