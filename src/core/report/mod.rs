// Core report module - builds document and slide content from gap entries.

pub mod report_builder;
pub mod report_models;

pub use report_builder::*;
pub use report_models::*;
