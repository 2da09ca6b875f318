// The core module contains all business logic.
// Each stage of the pipeline gets its own submodule; none of them import
// reqwest, axum, calamine or zip.

#[path = "gaps/mod.rs"]
pub mod gaps;

#[path = "report/mod.rs"]
pub mod report;

#[path = "pipeline/mod.rs"]
pub mod pipeline;

#[path = "session/mod.rs"]
pub mod session;
