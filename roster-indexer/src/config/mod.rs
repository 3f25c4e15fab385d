//! Configuration module for the roster indexer.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::IndexerSettings;
