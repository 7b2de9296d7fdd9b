//! Chat-streaming pipeline.
//!
//! Request flow: [`window::ContextWindowBuilder`] rebuilds bounded context
//! from stored history, the agent engine produces a raw event stream,
//! [`normalizer::normalize`] classifies it into the closed event set, and
//! [`aggregator::ChatPipeline`] drives emission to the client while building
//! the turn that [`finalizer::PersistenceFinalizer`] writes on completion.

pub mod aggregator;
pub mod enhance;
pub mod finalizer;
pub mod normalizer;
pub mod protocol;
pub mod window;

pub use aggregator::{ChatPipeline, StreamAggregate, StreamOutcome, ANONYMOUS_KEY};
pub use enhance::{Degraded, FollowUpSuggester, Greeter, Summarizer, DEFAULT_GREETING};
pub use protocol::{ErrorCode, Stage, StreamMessage};
pub use window::ContextWindowBuilder;
