//! Upstream source providers for Artifact Manager
//!
//! The engine sees upstream repositories through the [`SourceProvider`]
//! trait: resolve a reference to a concrete SHA plus file list, then fetch
//! files one by one. Providers are the only I/O in the workspace expected
//! to have real latency, so fetches run under a deadline, honor a shared
//! cancellation flag, and retry transient failures with exponential
//! backoff. No storage lock is ever held while a provider call is in
//! flight; callers fully materialize content before opening a transaction.

pub mod cancel;
pub mod dir;
pub mod error;
pub mod git;
pub mod provider;
pub mod retry;

pub use cancel::CancelFlag;
pub use dir::DirSource;
pub use error::{Error, Result};
pub use git::GitSource;
pub use provider::{ResolvedSource, SourceProvider, SourceRef, fetch_file_set};
pub use retry::FetchLimits;
