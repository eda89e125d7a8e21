//! civicpoll - Governance decision engine
//!
//! Poll/voting core for a multi-tenant civic-organisation platform:
//! role-hierarchy eligibility, a privacy-preserving vote ledger with
//! storage-enforced at-most-one-vote semantics, and quorum-gated close.
//!
//! Key principles:
//! - One role ordinal table, consulted everywhere
//! - Identity keys are either raw member ids or per-poll keyed hashes
//! - Duplicate and close races are settled by the database, not app logic
//! - Results snapshots are written once and never rewritten

pub mod db;
pub mod directory;
pub mod eligibility;
pub mod error;
pub mod identity;
pub mod ops;
pub mod roles;
pub mod tally;

pub use error::{EngineError, EngineResult};
