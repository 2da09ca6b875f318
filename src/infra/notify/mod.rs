// Notify infra layer.
// - `compliance_notifier.rs` sends the completion callback downstream.

#[path = "compliance_notifier.rs"]
pub mod compliance_notifier;

pub use compliance_notifier::ComplianceNotifier;
