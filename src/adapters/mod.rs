//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, file I/O, metrics endpoints).
//!
//! Adapter categories:
//! - `feed`: live match snapshots from the scores feed REST API
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: JSON ledger and JSONL transaction log

pub mod feed;
pub mod metrics;
pub mod persistence;
