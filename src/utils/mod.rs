//! Utility modules for the generation engine.

pub mod hash;
