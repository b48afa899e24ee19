//! Segment resolution: overload scoring, the resolution caches and the
//! resolver that turns a path into an accessor chain.

mod access;
mod cache;
mod overload;

pub use access::AccessResolver;
pub(crate) use access::Request;
pub use cache::*;
pub use overload::*;
