//! Storage helpers
//!
//! JSON file reads and atomic writes shared by the settings file and the
//! credential store.

pub mod file_io;

pub use file_io::{read_json_optional, read_json_required, write_json_atomic};
