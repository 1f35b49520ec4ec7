//! Domain model: the order record, the split-bill aggregate and its events
pub mod aggregates;
pub mod events;
pub mod value_objects;
