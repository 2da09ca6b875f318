// Fetch infra layer.
// - `http_fetcher.rs` downloads session inputs over HTTP.

#[path = "http_fetcher.rs"]
pub mod http_fetcher;

pub use http_fetcher::HttpFileFetcher;
