//! Persistence contract and reference store for the Manifesto world protocol.
//!
//! This crate provides:
//! - the `WorldStore` async port over worlds, edges, snapshots, proposals,
//!   decisions, bindings, and the genesis marker
//! - the `ObservableWorldStore` extension: per-event-kind and catch-all
//!   listeners with per-listener error isolation
//! - `InMemoryWorldStore`, the in-memory reference implementation used for
//!   tests, demos, and embedding

pub mod error;
pub mod memory;
pub mod observable;
pub mod traits;

pub use error::StoreError;
pub use memory::InMemoryWorldStore;
pub use observable::{EventListener, ListenerId, ObservableWorldStore};
pub use traits::{ProposalFilter, StoreResult, StoreStats, WorldStore};
