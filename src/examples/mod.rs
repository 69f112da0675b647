//! Reusable pieces for the demo programs.

pub mod env;
