//! The database handle.

use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::path::Path;

use log::debug;
use memmap2::{Mmap, MmapOptions};

use crate::decoder::Decoder;
use crate::error::MmdbError;
use crate::ip::{self, IpBytes};
use crate::metadata::{self, Metadata, DATA_SECTION_SEPARATOR_SIZE};
use crate::tree::{self, Terminal};
use crate::value::Value;

/// An open MaxMind DB file.
///
/// The database is immutable after construction; lookups are pure reads
/// against the backing bytes and may run concurrently without
/// synchronization. Decoded [`Value`] trees are detached copies and do
/// not borrow from the backing bytes.
#[derive(Debug)]
pub struct Database<S: AsRef<[u8]>> {
    buf: S,
    metadata: Metadata,
    data_start: usize,
    /// Node reached by descending 96 zero bits; where IPv4 walks start
    /// in a v6 tree.
    ipv4_start: u32,
    /// Bits consumed reaching `ipv4_start` (0-96). Fewer than 96 means
    /// the descent hit a terminal above the IPv4 subtree; the depth is
    /// needed to report correct prefix lengths either way.
    ipv4_start_depth: u8,
}

impl Database<Mmap> {
    /// Opens a database file by memory-mapping it read-only.
    ///
    /// # Example
    ///
    /// ```no_run
    /// let db = mmdbq::Database::open("GeoLite2-Country.mmdb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Database<Mmap>, MmdbError> {
        let file = File::open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(MmdbError::Mmap)?;
        Database::from_source(mmap)
    }
}

impl Database<Vec<u8>> {
    /// Opens a database file by reading it into memory.
    pub fn open_readfile<P: AsRef<Path>>(path: P) -> Result<Database<Vec<u8>>, MmdbError> {
        let buf = fs::read(path)?;
        Database::from_source(buf)
    }
}

impl<S: AsRef<[u8]>> Database<S> {
    /// Opens a database from anything that dereferences to its bytes.
    pub fn from_source(buf: S) -> Result<Database<S>, MmdbError> {
        let bytes = buf.as_ref();
        let metadata_start = metadata::find_metadata_start(bytes)?;
        let metadata_value = Decoder::new(&bytes[metadata_start..]).decode_at(0)?;
        let metadata = Metadata::from_value(&metadata_value)?;

        let data_start = metadata.data_section_start();
        if data_start > bytes.len() {
            return Err(MmdbError::invalid_database(format!(
                "search tree and separator ({data_start} bytes) extend past the end of the file ({} bytes)",
                bytes.len()
            )));
        }

        let mut db = Database {
            buf,
            metadata,
            data_start,
            ipv4_start: 0,
            ipv4_start_depth: 0,
        };
        let (ipv4_start, ipv4_start_depth) = db.find_ipv4_start()?;
        db.ipv4_start = ipv4_start;
        db.ipv4_start_depth = ipv4_start_depth;

        debug!(
            "opened {} database: {} nodes, {}-bit records, ip_version {}",
            db.metadata.database_type,
            db.metadata.node_count,
            db.metadata.record_size,
            db.metadata.ip_version,
        );
        Ok(db)
    }

    /// The database metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Looks up an address string, returning the record attached to the
    /// longest matching prefix.
    ///
    /// Returns `Ok(None)` when no prefix in the database covers the
    /// address; errors indicate unparseable input or a corrupt database.
    pub fn lookup(&self, address: &str) -> Result<Option<Value>, MmdbError> {
        self.lookup_prefix(address).map(|(value, _)| value)
    }

    /// Like [`lookup`](Self::lookup), but also reports the length of the
    /// matched prefix in bits. For IPv4 lookups the prefix is relative
    /// to the 32-bit address, in v6 databases too; a record attached
    /// above the IPv4 subtree of a v6 tree reports prefix 0.
    pub fn lookup_prefix(&self, address: &str) -> Result<(Option<Value>, u8), MmdbError> {
        let parsed = ip::parse_address(address)?;
        let (bits, start_node): (&[u8], u32) = match &parsed {
            IpBytes::V6(_) if self.metadata.ip_version == 4 => {
                return Err(MmdbError::UnsupportedAddressFamily)
            }
            IpBytes::V4(octets) if self.metadata.ip_version == 6 => (&octets[..], self.ipv4_start),
            IpBytes::V4(octets) => (&octets[..], 0),
            IpBytes::V6(bytes) => (&bytes[..], 0),
        };

        let (terminal, walked) = tree::walk(self.tree_bytes(), &self.metadata, bits, start_node)?;

        // For IPv4 in a v6 tree, the cached start node already consumed
        // ipv4_start_depth bits; those count toward the tree depth but
        // not toward the 32-bit prefix.
        let prefix_len = if matches!(parsed, IpBytes::V4(_)) && self.metadata.ip_version == 6 {
            (self.ipv4_start_depth + walked).saturating_sub(96)
        } else {
            walked
        };

        match terminal {
            Terminal::NoRecord => Ok((None, prefix_len)),
            Terminal::Data(offset) => self
                .decode_data(offset)
                .map(|value| (Some(value), prefix_len)),
        }
    }

    /// Checks the structural invariants of the whole file: metadata
    /// values, the zeroed data section separator, and every search tree
    /// record, decoding each referenced data record once.
    ///
    /// This walks the entire tree and may be slow on large files. It is
    /// stricter than lookups require; some readable databases fail it.
    pub fn verify(&self) -> Result<(), MmdbError> {
        self.verify_metadata()?;
        self.verify_data_section_separator()?;
        self.verify_search_tree()
    }

    fn verify_metadata(&self) -> Result<(), MmdbError> {
        let m = &self.metadata;
        if m.binary_format_major_version != 2 {
            return Err(MmdbError::invalid_database(format!(
                "binary_format_major_version - Expected: 2 Actual: {}",
                m.binary_format_major_version
            )));
        }
        if m.binary_format_minor_version != 0 {
            return Err(MmdbError::invalid_database(format!(
                "binary_format_minor_version - Expected: 0 Actual: {}",
                m.binary_format_minor_version
            )));
        }
        if m.database_type.is_empty() {
            return Err(MmdbError::invalid_database(
                "database_type - Expected: non-empty string Actual: \"\"",
            ));
        }
        if m.node_count == 0 {
            return Err(MmdbError::invalid_database(
                "node_count - Expected: positive integer Actual: 0",
            ));
        }
        Ok(())
    }

    fn verify_data_section_separator(&self) -> Result<(), MmdbError> {
        let separator_start = self.metadata.search_tree_size();
        let separator =
            &self.buf.as_ref()[separator_start..separator_start + DATA_SECTION_SEPARATOR_SIZE];
        if separator.iter().any(|&b| b != 0) {
            return Err(MmdbError::invalid_database_at(
                format!("unexpected byte in data separator: {separator:?}"),
                separator_start,
            ));
        }
        Ok(())
    }

    fn verify_search_tree(&self) -> Result<(), MmdbError> {
        let tree = self.tree_bytes();
        let data = self.data_bytes();

        let mut offsets = HashSet::new();
        for node in 0..self.metadata.node_count {
            for side in 0..2 {
                let record = tree::read_record(tree, &self.metadata, node, side)?;
                if record <= self.metadata.node_count {
                    continue;
                }
                let offset = tree::data_offset(record, self.metadata.node_count)?;
                if offset >= data.len() {
                    return Err(MmdbError::PointerOutOfRange {
                        target: offset,
                        limit: data.len(),
                    });
                }
                offsets.insert(offset);
            }
        }

        for &offset in &offsets {
            self.decode_data(offset).map_err(|e| {
                MmdbError::invalid_database_at(format!("decoding error: {e}"), offset)
            })?;
        }

        debug!(
            "verified {} nodes referencing {} distinct data records",
            self.metadata.node_count,
            offsets.len(),
        );
        Ok(())
    }

    fn decode_data(&self, offset: usize) -> Result<Value, MmdbError> {
        let data = self.data_bytes();
        if offset >= data.len() {
            return Err(MmdbError::PointerOutOfRange {
                target: offset,
                limit: data.len(),
            });
        }
        Decoder::new(data).decode_at(offset)
    }

    /// Descends 96 zero bits to the root of the IPv4 subtree of a v6
    /// database. Returns the node and the bit depth at which it was
    /// found.
    fn find_ipv4_start(&self) -> Result<(u32, u8), MmdbError> {
        if self.metadata.ip_version != 6 {
            return Ok((0, 0));
        }
        let tree = self.tree_bytes();
        let mut node = 0_u32;
        let mut depth = 0_u8;
        for i in 0_u8..96 {
            if node >= self.metadata.node_count {
                depth = i;
                break;
            }
            node = tree::read_record(tree, &self.metadata, node, 0)?;
            depth = i + 1;
        }
        Ok((node, depth))
    }

    fn tree_bytes(&self) -> &[u8] {
        &self.buf.as_ref()[..self.metadata.search_tree_size()]
    }

    fn data_bytes(&self) -> &[u8] {
        &self.buf.as_ref()[self.data_start..]
    }
}
