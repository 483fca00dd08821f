//! Draw generation and adjudicator allocation for two-team debating
//! tournaments.
//!
//! The engine is purely in-memory: callers hand it a snapshot of the teams,
//! adjudicators, conflicts and history of a tournament, and receive pairings
//! or adjudicator allocations back. Persisting them is the caller's job.

pub mod config;
pub mod tournaments;
pub mod workloads;
