// Core gaps module - file references, gap entries and row extraction.

pub mod gap_extractor;
pub mod gap_models;

pub use gap_extractor::*;
pub use gap_models::*;
