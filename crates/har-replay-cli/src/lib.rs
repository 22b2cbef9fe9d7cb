//! HarReplay CLI library — Python script emission for analyzed sessions.

pub mod emit;

pub use emit::{emit_python, EmitOptions};
