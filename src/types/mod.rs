//! Core types for Abacus.

pub mod generation;
pub mod message;
pub mod tool;

pub use generation::*;
pub use message::*;
pub use tool::*;
