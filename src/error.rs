//! Error types for MaxMind DB operations.

use std::io;

use thiserror::Error;

/// Error returned by MaxMind DB operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MmdbError {
    /// The metadata start marker was not found near the end of the file.
    #[error("could not find the MaxMind DB metadata marker in the file")]
    MetadataMarkerMissing,

    /// A required metadata field is absent from the metadata map.
    #[error("metadata field `{0}` is missing")]
    MetadataFieldMissing(&'static str),

    /// A metadata field decoded to an unexpected type or value.
    #[error("metadata field `{field}`: expected {expected}, got {actual}")]
    MetadataFieldType {
        /// Name of the offending field.
        field: &'static str,
        /// What the field must be.
        expected: &'static str,
        /// What was actually found.
        actual: String,
    },

    /// A data type tag that this reader does not decode.
    #[error("unsupported data type tag {0}")]
    UnsupportedTag(u8),

    /// A map key decoded to something other than a string.
    #[error("map key is not a string")]
    MalformedMapKey,

    /// A payload size that is invalid for the decoded type.
    #[error("invalid payload size {size} for {kind}")]
    InvalidPayloadSize {
        /// The type being decoded.
        kind: &'static str,
        /// The offending payload size.
        size: usize,
    },

    /// Value nesting (including pointer chains) exceeded the decoder's
    /// depth limit.
    #[error("value nesting exceeds the decoder depth limit")]
    DepthExceeded,

    /// A read past the end of the backing bytes.
    #[error("read of {count} bytes at offset {offset} is out of bounds (length {len})")]
    OutOfBounds {
        /// Offset the read started at.
        offset: usize,
        /// Number of bytes requested.
        count: usize,
        /// Length of the backing bytes.
        len: usize,
    },

    /// A record size other than 24, 28, or 32 bits.
    #[error("invalid record size: {0} bits")]
    InvalidNodeSize(u16),

    /// A data pointer that resolves outside the data section.
    #[error("pointer target {target} is outside the data section (length {limit})")]
    PointerOutOfRange {
        /// Resolved target offset.
        target: usize,
        /// Length of the data section.
        limit: usize,
    },

    /// A string payload that is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// An IP address string that does not parse.
    #[error("invalid IP address syntax: `{0}`")]
    AddressSyntax(String),

    /// Three or more consecutive colons in an IPv6 address.
    #[error("too many consecutive colons in IPv6 address")]
    TooManyColons,

    /// An IPv6 lookup against an IPv4-only database.
    #[error("cannot look up an IPv6 address in an IPv4-only database")]
    UnsupportedAddressFamily,

    /// The database failed a structural check.
    #[error("{}", format_invalid_database(.message, .offset))]
    InvalidDatabase {
        /// Description of what is invalid.
        message: String,
        /// Byte offset in the database where the error was detected.
        offset: Option<usize>,
    },

    /// An I/O error occurred while reading the database.
    #[error("i/o error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),

    /// Memory mapping failed.
    #[error("memory map error: {0}")]
    Mmap(#[source] io::Error),
}

fn format_invalid_database(message: &str, offset: &Option<usize>) -> String {
    match offset {
        Some(off) => format!("invalid database at offset {off}: {message}"),
        None => format!("invalid database: {message}"),
    }
}

impl MmdbError {
    /// Creates an InvalidDatabase error with just a message.
    pub fn invalid_database(message: impl Into<String>) -> Self {
        MmdbError::InvalidDatabase {
            message: message.into(),
            offset: None,
        }
    }

    /// Creates an InvalidDatabase error with message and offset.
    pub fn invalid_database_at(message: impl Into<String>, offset: usize) -> Self {
        MmdbError::InvalidDatabase {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", MmdbError::MetadataMarkerMissing),
            "could not find the MaxMind DB metadata marker in the file",
        );
        assert_eq!(
            format!("{}", MmdbError::MetadataFieldMissing("node_count")),
            "metadata field `node_count` is missing",
        );
        assert_eq!(
            format!(
                "{}",
                MmdbError::MetadataFieldType {
                    field: "record_size",
                    expected: "unsigned integer",
                    actual: "string".to_owned(),
                }
            ),
            "metadata field `record_size`: expected unsigned integer, got string",
        );
        assert_eq!(
            format!("{}", MmdbError::UnsupportedTag(13)),
            "unsupported data type tag 13",
        );
        assert_eq!(
            format!(
                "{}",
                MmdbError::OutOfBounds {
                    offset: 10,
                    count: 4,
                    len: 12,
                }
            ),
            "read of 4 bytes at offset 10 is out of bounds (length 12)",
        );
        assert_eq!(
            format!("{}", MmdbError::invalid_database("something went wrong")),
            "invalid database: something went wrong",
        );
        assert_eq!(
            format!(
                "{}",
                MmdbError::invalid_database_at("something went wrong", 42)
            ),
            "invalid database at offset 42: something went wrong",
        );
        assert_eq!(
            format!("{}", MmdbError::AddressSyntax("1.2.3".to_owned())),
            "invalid IP address syntax: `1.2.3`",
        );

        let io_err = Error::new(ErrorKind::NotFound, "file not found");
        assert_eq!(
            format!("{}", MmdbError::from(io_err)),
            "i/o error: file not found",
        );
        let mmap_io_err = Error::new(ErrorKind::PermissionDenied, "mmap failed");
        assert_eq!(
            format!("{}", MmdbError::Mmap(mmap_io_err)),
            "memory map error: mmap failed",
        );
    }
}
