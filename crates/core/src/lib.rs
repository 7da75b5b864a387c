#![forbid(unsafe_code, clippy::unwrap_used)]
#![allow(clippy::needless_return)]
#![warn(clippy::await_holding_lock, clippy::inefficient_to_string)]

//! Gridbase access control and safe query engine.
//!
//! Per-organization SQLite datastores, a hierarchical permission model
//! (global → datastore → table → column) evaluated in O(1), a
//! PostgREST-style CRUD query builder with schema whitelisting, a SQL
//! authorizer for the raw-SQL protocol surface, and schema
//! reflection/filtering for discovery. The engine is stateless across
//! requests: build a [`perms::PermissionIndex`] per caller, evaluate,
//! discard.

pub mod authorize;
pub mod connection;
pub mod content_range;
pub mod error;
pub mod perms;
pub mod records;
pub mod schema_filter;

pub use authorize::{StatementDecision, authorize_sql};
pub use error::EngineError;
pub use perms::{CallerContext, PermissionIndex};
pub use schema_filter::filter_schema;
