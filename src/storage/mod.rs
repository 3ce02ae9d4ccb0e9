//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - voters, families, family_members (household linkage)
//! - panchayats, booths, villages, castes (master data)
//! - election_results (one row per booth station)
//! - events, visitors, party_leadership, users, message_log
//!
//! Request handlers reach the store through a bounded [`StorePool`].

pub mod pool;
pub mod records;
pub mod schema;
pub mod sqlite;

pub use pool::{PoolOptions, PooledStore, StorePool};
pub use sqlite::{DbStats, SqliteStore};
