//! Shared test utilities for the artifact-manager workspace.
//!
//! Provides the [`TestCollection`] fixture: a temporary store root plus
//! temporary project directories, with helpers for seeding entries and
//! editing deployed copies. Dev-dependency only, never published.

pub mod collection;

pub use collection::TestCollection;
