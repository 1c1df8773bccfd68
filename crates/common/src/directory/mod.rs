//! Identity and role lookups
//!
//! A [`DirectoryProvider`] is asked once per run for every principal and
//! role definition it knows; the answers are indexed in a [`LookupCache`]
//! that the caller owns and passes by reference to the resolver and the
//! importer.

mod cache;
mod memory;
mod provider;

pub use cache::{CacheError, LookupCache};
pub use memory::{DirectoryEntry, MemoryDirectory};
pub use provider::{DirectoryProvider, PrincipalRecord, RoleDefinition};
