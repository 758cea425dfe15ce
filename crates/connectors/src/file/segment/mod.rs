//! Segment part files.
//!
//! A part starts with the 4-byte magic `SLCP` and a format version byte, followed by
//! entries of the form `u32be key_len | key (utf-8) | u32be payload_len | payload`.
//! A clean end of file on an entry boundary ends the part.

pub mod layout;
pub mod reader;
pub mod writer;

pub const MAGIC: &[u8; 4] = b"SLCP";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: u64 = 5;

/// Upper bound for a single key or payload.
pub const MAX_FIELD_LEN: u32 = 256 * 1024 * 1024;

/// File name of the data parts inside a segment directory.
pub const PART_FILE_NAME: &str = "data";
