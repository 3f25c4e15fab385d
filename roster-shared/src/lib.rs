//! # Roster Shared
//!
//! Domain records and wire-level document types shared by the roster
//! repository, pipeline and binary crates.
//!
//! Nothing in this crate performs I/O. The graph store and the search index
//! each map these typed records at their own boundary.

pub mod document;
pub mod entities;
pub mod page;
pub mod search;

pub use document::{Alias, IndexDocument};
pub use entities::{Organization, Person, ValidationError, DEFAULT_NATIONALITY};
pub use page::{Page, PageError, PageRequest, PageWindow};
pub use search::{SearchHit, SearchQuery, SearchResponse};
