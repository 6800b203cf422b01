//! Rank-ordered display of the distributed array.
//!
//! Blocks are gathered to the root in rank order and rendered there, so the
//! output never interleaves no matter how the rank threads are scheduled.

use std::fmt::Write as _;

use crate::comm::Communicator;
use crate::datatype::Element;
use crate::distribute::LocalBlock;
use crate::error::{Error, Result};
use crate::topology::RingTopology;

/// Tag used for blocks travelling to the root.
pub const GATHER_TAG: i32 = 300;

/// Collect every rank's block on `root`.
///
/// Collective. Returns `Some(blocks)` in rank order on the root and `None` on
/// every other rank.
pub fn gather_blocks<T: Element>(
    comm: &Communicator,
    topology: &RingTopology,
    root: i32,
    block: &[T],
) -> Result<Option<Vec<LocalBlock<T>>>> {
    if !(0..topology.size).contains(&root) {
        return Err(Error::InvalidRank(root));
    }
    if topology.rank != root {
        comm.send(block, root, GATHER_TAG)?;
        return Ok(None);
    }

    let mut blocks = Vec::with_capacity(topology.size as usize);
    for source in 0..topology.size {
        if source == root {
            blocks.push(block.to_vec());
        } else {
            let (received, _) = comm.recv_vec::<T>(source, GATHER_TAG)?;
            blocks.push(received);
        }
    }
    Ok(Some(blocks))
}

/// One line per block, each element as `|` followed by a width-3 field.
pub fn render_rows<T: std::fmt::Display>(blocks: &[LocalBlock<T>]) -> String {
    let mut out = String::new();
    for block in blocks {
        for value in block {
            let _ = write!(out, "|{value:>3}");
        }
        out.push('\n');
    }
    out
}

/// A titled section: the title on its own line followed by the rows.
pub fn render_section<T: std::fmt::Display>(title: &str, blocks: &[LocalBlock<T>]) -> String {
    format!("{title}\n{}", render_rows(blocks))
}

/// Title of the section showing the shifted array.
pub fn shifted_title(shift: i64) -> String {
    format!("Array after shift of {shift:>3}:")
}
