//! Persistence port for Artifact Manager
//!
//! Owns the on-disk collection store: TOML indexes for collection entries,
//! deployment records, and snapshots, plus a hash-addressed object
//! directory holding every artifact content state ever written. The store
//! has single-writer semantics: all mutation goes through
//! [`Store::with_txn`], which holds an exclusive advisory lock for the
//! duration of one tightly-scoped transaction.
//!
//! Record types are validated at this boundary (artifact names, attribute
//! keys); engine code above never re-validates.

pub mod error;
pub mod layout;
pub mod model;
pub mod store;

pub use error::{Error, Result};
pub use layout::StoreLayout;
pub use model::{
    ArtifactId, ArtifactType, CollectionEntry, Deployment, LineageEvent, LineageKind, SnapshotId,
    SnapshotRecord, TrustLevel, UpstreamRef,
};
pub use store::{Store, Txn, TxnScope};
