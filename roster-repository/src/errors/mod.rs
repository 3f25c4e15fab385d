//! Error types for the roster repository.

mod backend_error;

pub use backend_error::BackendError;
