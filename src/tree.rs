//! Search tree traversal.
//!
//! The tree is a binary trie over address bits, most significant bit
//! first. Each node packs two records; a record is a node index, the
//! `node_count` sentinel for "no data", or a data pointer past the
//! sentinel.

use crate::cursor::Cursor;
use crate::error::MmdbError;
use crate::metadata::{Metadata, DATA_SECTION_SEPARATOR_SIZE};

/// Where a tree walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminal {
    /// The sentinel node was reached, or the bits ran out: no record
    /// covers the address.
    NoRecord,
    /// A data record at this offset in the data section.
    Data(usize),
}

/// Walks the tree over `address` starting from `start_node`, returning
/// the terminal and the number of bits consumed (the matched prefix
/// length).
pub(crate) fn walk(
    tree: &[u8],
    metadata: &Metadata,
    address: &[u8],
    start_node: u32,
) -> Result<(Terminal, u8), MmdbError> {
    let node_count = metadata.node_count;
    let bit_count = address.len() * 8;

    let mut node = start_node;
    let mut prefix_len = bit_count;
    for i in 0..bit_count {
        if node >= node_count {
            prefix_len = i;
            break;
        }
        let bit = (address[i >> 3] >> (7 - (i & 7))) & 1;
        node = read_record(tree, metadata, node, bit)?;
    }

    let terminal = if node == node_count {
        Terminal::NoRecord
    } else if node > node_count {
        Terminal::Data(data_offset(node, node_count)?)
    } else {
        // Bits exhausted inside the tree; a well-formed database does
        // not produce this.
        Terminal::NoRecord
    };
    Ok((terminal, prefix_len as u8))
}

/// Reads one record of node `node`; `side` 0 is the left record, 1 the
/// right.
pub(crate) fn read_record(
    tree: &[u8],
    metadata: &Metadata,
    node: u32,
    side: u8,
) -> Result<u32, MmdbError> {
    let base = node as usize * metadata.node_size_bytes();
    let mut cur = Cursor::new(tree).fork_at(base);

    let record = match metadata.record_size {
        24 => {
            cur.seek_to(base + usize::from(side) * 3);
            cur.read_uint(3)? as u32
        }
        28 => {
            let bytes = cur.read_bytes(7)?;
            // The middle byte's high nibble tops up the left record and
            // its low nibble the right record.
            let (top, low) = if side == 0 {
                (u32::from(bytes[3] >> 4), &bytes[0..3])
            } else {
                (u32::from(bytes[3] & 0x0F), &bytes[4..7])
            };
            (top << 24)
                | (u32::from(low[0]) << 16)
                | (u32::from(low[1]) << 8)
                | u32::from(low[2])
        }
        32 => {
            cur.seek_to(base + usize::from(side) * 4);
            cur.read_uint(4)? as u32
        }
        s => return Err(MmdbError::InvalidNodeSize(s)),
    };
    Ok(record)
}

/// Maps a data-pointer record to its offset in the data section.
pub(crate) fn data_offset(record: u32, node_count: u32) -> Result<usize, MmdbError> {
    (record as usize - node_count as usize)
        .checked_sub(DATA_SECTION_SEPARATOR_SIZE)
        .ok_or(MmdbError::PointerOutOfRange {
            target: record as usize,
            limit: 0,
        })
}
