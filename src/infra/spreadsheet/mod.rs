// Spreadsheet infra layer.
// - `calamine_reader.rs` opens workbooks for the gap extractor.

#[path = "calamine_reader.rs"]
pub mod calamine_reader;

pub use calamine_reader::CalamineReader;
