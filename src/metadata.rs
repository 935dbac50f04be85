//! Metadata location and the typed metadata record.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::MmdbError;
use crate::value::Value;

/// Marker preceding the metadata map: `\xAB\xCD\xEF` followed by
/// `MaxMind.com`.
const METADATA_START_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";

/// The marker sits within this many bytes of the end of the file.
const METADATA_SCAN_LIMIT: usize = 128 * 1024;

/// Size of the data section separator between the search tree and the
/// data section.
pub(crate) const DATA_SECTION_SEPARATOR_SIZE: usize = 16;

/// Finds the offset of the first metadata byte: the byte after the
/// rightmost marker occurrence within the trailing scan window.
pub(crate) fn find_metadata_start(buf: &[u8]) -> Result<usize, MmdbError> {
    let window_start = buf.len().saturating_sub(METADATA_SCAN_LIMIT);
    memchr::memmem::rfind(&buf[window_start..], METADATA_START_MARKER)
        .map(|x| window_start + x + METADATA_START_MARKER.len())
        .ok_or(MmdbError::MetadataMarkerMissing)
}

/// Metadata about the MaxMind DB file.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    /// Major version of the binary format (always 2).
    pub binary_format_major_version: u16,
    /// Minor version of the binary format (always 0).
    pub binary_format_minor_version: u16,
    /// Unix timestamp when the database was built (0 when absent).
    pub build_epoch: u64,
    /// Database type (e.g., "GeoIP2-City", "GeoLite2-Country").
    pub database_type: String,
    /// Map of language codes to database descriptions.
    pub description: BTreeMap<String, String>,
    /// IP version supported (4 or 6).
    pub ip_version: u16,
    /// Languages available in the database.
    pub languages: Vec<String>,
    /// Number of nodes in the search tree.
    pub node_count: u32,
    /// Size of each record in bits (24, 28, or 32).
    pub record_size: u16,
}

impl Metadata {
    /// Projects the decoded metadata map onto the typed record,
    /// validating the record size and IP version.
    pub(crate) fn from_value(root: &Value) -> Result<Metadata, MmdbError> {
        if root.as_map().is_none() {
            return Err(MmdbError::invalid_database(format!(
                "metadata is not a map, got {}",
                root.kind()
            )));
        }

        let metadata = Metadata {
            binary_format_major_version: checked_u16_field(root, "binary_format_major_version")?,
            binary_format_minor_version: checked_u16_field(root, "binary_format_minor_version")?,
            build_epoch: opt_uint_field(root, "build_epoch")?.unwrap_or(0),
            database_type: string_field(root, "database_type")?,
            description: string_map_field(root, "description")?,
            ip_version: checked_u16_field(root, "ip_version")?,
            languages: string_array_field(root, "languages")?,
            node_count: checked_u32_field(root, "node_count")?,
            record_size: checked_u16_field(root, "record_size")?,
        };

        if !matches!(metadata.record_size, 24 | 28 | 32) {
            return Err(MmdbError::InvalidNodeSize(metadata.record_size));
        }
        if !matches!(metadata.ip_version, 4 | 6) {
            return Err(MmdbError::MetadataFieldType {
                field: "ip_version",
                expected: "4 or 6",
                actual: metadata.ip_version.to_string(),
            });
        }

        Ok(metadata)
    }

    /// Bytes per search tree node (both records).
    pub fn node_size_bytes(&self) -> usize {
        usize::from(self.record_size) / 4
    }

    /// Size of the search tree in bytes.
    pub fn search_tree_size(&self) -> usize {
        self.node_count as usize * self.node_size_bytes()
    }

    /// Offset of the data section: the search tree plus the 16-byte
    /// separator.
    pub fn data_section_start(&self) -> usize {
        self.search_tree_size() + DATA_SECTION_SEPARATOR_SIZE
    }

    /// Returns the database build time as a `SystemTime`.
    #[must_use]
    pub fn build_time(&self) -> std::time::SystemTime {
        std::time::UNIX_EPOCH + std::time::Duration::from_secs(self.build_epoch)
    }
}

fn field<'v>(root: &'v Value, name: &'static str) -> Result<&'v Value, MmdbError> {
    root.get(name).ok_or(MmdbError::MetadataFieldMissing(name))
}

fn as_uint(value: &Value, name: &'static str) -> Result<u64, MmdbError> {
    match value {
        Value::Uint16(n) => Ok(u64::from(*n)),
        Value::Uint32(n) => Ok(u64::from(*n)),
        Value::Uint64(n) => Ok(*n),
        v => Err(MmdbError::MetadataFieldType {
            field: name,
            expected: "unsigned integer",
            actual: v.kind().to_owned(),
        }),
    }
}

fn uint_field(root: &Value, name: &'static str) -> Result<u64, MmdbError> {
    as_uint(field(root, name)?, name)
}

fn opt_uint_field(root: &Value, name: &'static str) -> Result<Option<u64>, MmdbError> {
    match root.get(name) {
        None => Ok(None),
        Some(v) => as_uint(v, name).map(Some),
    }
}

fn checked_u16_field(root: &Value, name: &'static str) -> Result<u16, MmdbError> {
    let n = uint_field(root, name)?;
    u16::try_from(n).map_err(|_| MmdbError::MetadataFieldType {
        field: name,
        expected: "16-bit unsigned integer",
        actual: n.to_string(),
    })
}

fn checked_u32_field(root: &Value, name: &'static str) -> Result<u32, MmdbError> {
    let n = uint_field(root, name)?;
    u32::try_from(n).map_err(|_| MmdbError::MetadataFieldType {
        field: name,
        expected: "32-bit unsigned integer",
        actual: n.to_string(),
    })
}

fn string_field(root: &Value, name: &'static str) -> Result<String, MmdbError> {
    match field(root, name)? {
        Value::String(s) => Ok(s.clone()),
        v => Err(MmdbError::MetadataFieldType {
            field: name,
            expected: "string",
            actual: v.kind().to_owned(),
        }),
    }
}

fn string_array_field(root: &Value, name: &'static str) -> Result<Vec<String>, MmdbError> {
    let items = match field(root, name)? {
        Value::Array(items) => items,
        v => {
            return Err(MmdbError::MetadataFieldType {
                field: name,
                expected: "array of strings",
                actual: v.kind().to_owned(),
            })
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            v => Err(MmdbError::MetadataFieldType {
                field: name,
                expected: "array of strings",
                actual: v.kind().to_owned(),
            }),
        })
        .collect()
}

fn string_map_field(
    root: &Value,
    name: &'static str,
) -> Result<BTreeMap<String, String>, MmdbError> {
    let entries = match root.get(name) {
        None => return Ok(BTreeMap::new()),
        Some(Value::Map(entries)) => entries,
        Some(v) => {
            return Err(MmdbError::MetadataFieldType {
                field: name,
                expected: "map of strings",
                actual: v.kind().to_owned(),
            })
        }
    };
    entries
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k.clone(), s.clone())),
            v => Err(MmdbError::MetadataFieldType {
                field: name,
                expected: "map of strings",
                actual: v.kind().to_owned(),
            }),
        })
        .collect()
}
