//! Infrastructure layer: state construction.

pub mod state;
