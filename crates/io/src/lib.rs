//! `collate-io` — file I/O for the merge pipeline: encoding-tolerant
//! reading, delimiter sniffing, lossless CSV export.

pub mod csv;

pub use csv::{read_file_as_utf8, read_table, sniff_delimiter, write_csv, write_string};
