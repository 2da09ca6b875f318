// =============================================================================
// GOOGLE DRIVE MODULE
// =============================================================================
//
// Remote storage for session artifacts. This lives in the infra layer because
// it handles external I/O; the pipeline only sees `ArtifactPublisher`.

pub mod google_drive_client;

pub use google_drive_client::DrivePublisher;
