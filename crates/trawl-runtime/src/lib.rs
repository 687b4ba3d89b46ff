//! Trawl Runtime
//!
//! This crate ties the pieces of a run together:
//!
//! - [`Publisher`] uploads collected artifacts to the run's key-value store,
//!   allocating collision-free keys and reusing keys for unchanged content
//! - [`finalize`] aggregates publish outcomes into a [`ResultRecord`]
//! - [`TaskRun`] drives a browsing task end to end (validate, run the agent,
//!   collect, publish, append the record)
//! - [`LlmsTxtRun`] turns a store of design files into an llms.txt document
//!
//! Storage is reached through a [`Platform`], so the same pipelines run
//! against a local directory, the hosting platform's API, or memory.

mod error;
mod llms_txt;
mod platform;
mod publish;
mod result;
mod submit;
mod task_run;

pub use error::RuntimeError;
pub use llms_txt::{LLMS_TXT_MODEL, LlmsTxtRecord, LlmsTxtRun, clean_llms_txt};
pub use platform::{ApifyPlatform, LocalPlatform, MemoryPlatform, Platform, platform_for};
pub use publish::{DEFAULT_CONCURRENCY, PublishReport, Publisher};
pub use result::{PublishFailure, ResultRecord, RunStatus, StoredFile, finalize};
pub use submit::{Submission, Submitter, submission_url};
pub use task_run::TaskRun;
