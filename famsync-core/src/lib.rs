//! Reconciliation engine for family calendar sync.
//!
//! Child calendars are kept in step with a set of parent calendars: each
//! child receives every event of its copy-all parents plus any parent event
//! matching one of its keywords. The engine only ever touches events it
//! created itself, recognized by the origin marker it stamps on them.
//!
//! This crate provides:
//! - the event model and fingerprinting (`event`, `fingerprint`)
//! - the selection policy (`matcher`, `window`, `desired`)
//! - diffing and applying per child (`diff`, `reconcile`)
//! - the pass orchestrator (`sync`)
//! - backends: the `CalendarBackend` trait, an in-memory backend and the
//!   provider subprocess protocol (`backend`, `remote`)

pub mod backend;
pub mod config;
pub mod desired;
pub mod diff;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod matcher;
pub mod reconcile;
pub mod remote;
pub mod summary;
pub mod sync;
pub mod window;

pub use backend::{CalendarBackend, MemoryBackend};
pub use config::{ChildConfig, EngineSettings, LoadedConfig, SyncConfig, SyncOptions};
pub use error::{SyncError, SyncResult};
pub use event::{CalendarId, EventKey, OriginMarker, OwnedEvent, SourceEvent, SyncedEvent};
pub use fingerprint::{Fingerprint, fingerprint};
pub use remote::ProviderBackend;
pub use summary::{ChildStatus, ChildSummary, PassSummary, SyncFailure};
pub use sync::{ChildPlan, PassPlan, SyncEngine};
pub use window::SyncWindow;

pub use tokio_util::sync::CancellationToken;
