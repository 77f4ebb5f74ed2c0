//! Persisted, reactive session state.
//!
//! Provides:
//! - `SessionRecord`: the single unit of truth (`is_authenticated` +
//!   optional `UserProfile`), replaced atomically on every mutation
//! - `SessionStore`: file-backed holder with synchronous observer fan-out
//!
//! ## Design Decisions
//! - One record, one file — the durable copy mirrors the in-memory value
//!   after every mutation, and a missing or malformed file degrades to
//!   the logged-out default instead of erroring.
//! - Persistence is best-effort: a failed write is logged and the
//!   in-memory mutation plus notifications still go through.

pub mod store;

pub use store::{SessionRecord, SessionStore, SubscriptionId, UserProfile};
