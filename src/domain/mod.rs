//! Domain layer: slot pool, aggregation ring, decoder, encoder and
//! settings. Everything here is pure state with no I/O or capability calls.

pub mod descriptor;
pub mod models;
pub mod record;
pub mod senml;
pub mod settings;
pub mod slot;
