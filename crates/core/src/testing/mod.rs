//! Mock collaborators and fixtures for testing.
//!
//! These implement the engine's collaborator traits with controllable
//! in-memory state, recorded calls for assertions and one-shot error
//! injection.

pub mod fixtures;
mod mock_catalog;
mod mock_details;
mod mock_source;

pub use mock_catalog::{MockCatalog, PlaylistCall, SortTitleCall};
pub use mock_details::MockDetails;
pub use mock_source::{MockSource, TableSourceResolver};
