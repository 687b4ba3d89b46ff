//! Trawl Config
//!
//! Request and configuration types for trawl runs.
//!
//! Requests are the JSON inputs an actor run is started with ([`TaskRequest`]
//! for browsing tasks, [`LlmsTxtRequest`] for llms.txt generation). They are
//! validated before any side effect happens.
//!
//! [`ActorConfig`] holds everything the process environment contributes. It is
//! resolved once at startup and handed down explicitly; nothing below the
//! binary reads environment variables.

mod actor;
mod error;
mod request;
mod secret;

pub use actor::{ActorConfig, AgentSettings, StorageBackend, StorageConfig, env};
pub use error::ConfigError;
pub use request::{ActorInput, LlmsTxtRequest, TaskRequest, ValidatedTask, is_valid_storage_id};
pub use secret::Secret;
