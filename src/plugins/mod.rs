//! Subsystems built on the core store.

pub mod todo;
