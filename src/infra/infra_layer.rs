// The infra module contains implementations of core traits.
// Each external system gets its own submodule.

#[path = "fetch/mod.rs"]
pub mod fetch;

#[path = "spreadsheet/mod.rs"]
pub mod spreadsheet;

#[path = "render/mod.rs"]
pub mod render;

#[path = "google_drive/mod.rs"]
pub mod google_drive;

#[path = "notify/mod.rs"]
pub mod notify;
