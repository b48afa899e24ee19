//! Property and method access for an embeddable expression language.
//!
//! A path such as `order.items[2].price.toString()` is resolved segment by
//! segment against whatever shape each value has: field, accessor method, map
//! entry, list or array element, static member or a host extension. Each
//! resolution is recorded as an [`AccessorChain`] and cached in the
//! [`ResolutionContext`], so later accesses with the same path and root type
//! replay the recorded steps instead of resolving again.

pub mod chain;
pub mod coerce;
pub mod collections;
pub mod config;
pub mod context;
pub mod error;
pub mod eval;
pub mod handler;
pub mod path;
pub mod resolve;
pub mod scope;
pub mod types;
pub mod value;

// Re-export commonly used items for convenience
pub use tracing;

pub use chain::{AccessorChain, ChainMode, Compiled};
pub use config::AccessConfig;
pub use context::ResolutionContext;
pub use error::{AccessError, Result};
pub use types::{builtins, TypeBuilder, TypeInfo, TypeRef};
pub use value::{Object, ObjectRef, Value};
