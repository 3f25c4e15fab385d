//! Record construction.

mod entity_factory;

pub use entity_factory::EntityFactory;
