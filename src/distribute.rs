//! Placing the blocks of a global array on the ranks of a ring.
//!
//! The global array is never held by more than the root, and only while it is
//! being handed out: the root asks a [`BlockSource`] for one block at a time
//! and ships it to its owner before asking for the next.

use tracing::debug;

use crate::comm::Communicator;
use crate::datatype::Element;
use crate::error::{Error, Result};
use crate::topology::RingTopology;

/// Tag used for block transfers from the root.
pub const DISTRIBUTE_TAG: i32 = 100;

/// The contiguous slice of the global array owned by one rank.
pub type LocalBlock<T> = Vec<T>;

/// Producer of the blocks handed out by the root.
///
/// Only the root calls it, once per destination rank, in rank order.
pub trait BlockSource<T: Element> {
    /// Produce the `block_len` elements destined for `rank`.
    fn next_block(&mut self, rank: i32, block_len: usize) -> Result<LocalBlock<T>>;
}

/// Blocks cut from an already materialized global array.
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a, T> {
    global: &'a [T],
}

impl<'a, T> SliceSource<'a, T> {
    /// Hand out consecutive chunks of `global`.
    pub fn new(global: &'a [T]) -> Self {
        SliceSource { global }
    }
}

impl<T: Element> BlockSource<T> for SliceSource<'_, T> {
    fn next_block(&mut self, rank: i32, block_len: usize) -> Result<LocalBlock<T>> {
        let start = rank as usize * block_len;
        self.global
            .get(start..start + block_len)
            .map(<[T]>::to_vec)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "global array of {} elements has no block for rank {rank}",
                    self.global.len()
                ))
            })
    }
}

/// The sequence `1, 2, 3, ...` laid out across the ranks.
#[derive(Debug, Clone, Copy)]
pub struct SequenceSource {
    next: i64,
}

impl SequenceSource {
    /// Start counting at 1.
    pub fn new() -> Self {
        SequenceSource { next: 1 }
    }
}

impl Default for SequenceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSource<i64> for SequenceSource {
    fn next_block(&mut self, _rank: i32, block_len: usize) -> Result<LocalBlock<i64>> {
        let start = self.next;
        self.next += block_len as i64;
        Ok((start..self.next).collect())
    }
}

/// Split a global array into `size` equal blocks, in rank order.
pub fn split_blocks<T: Clone>(global: &[T], size: i32) -> Result<Vec<LocalBlock<T>>> {
    if size < 1 {
        return Err(Error::InvalidGroupSize(size));
    }
    if global.is_empty() {
        return Err(Error::InvalidBlockLength(0));
    }
    if global.len() % size as usize != 0 {
        return Err(Error::UnevenPartition {
            len: global.len(),
            size,
        });
    }
    let block_len = global.len() / size as usize;
    Ok(global.chunks(block_len).map(<[T]>::to_vec).collect())
}

/// Concatenate blocks back into the global array they form.
pub fn concat_blocks<T: Clone>(blocks: &[LocalBlock<T>]) -> Vec<T> {
    blocks.concat()
}

/// Hand every rank its block of the global array.
///
/// Collective: every rank must call it with the same `root` and `block_len`.
/// For each destination rank in turn, the group meets at a barrier, the root
/// asks `source` for the block, the group meets again, and the block moves to
/// its owner. The root keeps its own block without a transfer.
///
/// If the source fails at the root, the root aborts the group: the root gets
/// the source's error back and every other rank gets [`Error::Aborted`].
pub fn distribute<T, S>(
    comm: &Communicator,
    topology: &RingTopology,
    root: i32,
    block_len: usize,
    source: &mut S,
) -> Result<LocalBlock<T>>
where
    T: Element,
    S: BlockSource<T>,
{
    if block_len == 0 {
        return Err(Error::InvalidBlockLength(block_len));
    }
    if !(0..topology.size).contains(&root) {
        return Err(Error::InvalidRank(root));
    }

    let mut local = None;
    for dest in 0..topology.size {
        comm.barrier()?;

        let produced = if topology.rank == root {
            match produce(source, dest, block_len) {
                Ok(block) => Some(block),
                Err(err) => {
                    debug!(rank = topology.rank, dest, %err, "cannot produce block");
                    comm.abort(err.code());
                    return Err(err);
                }
            }
        } else {
            None
        };

        comm.barrier()?;

        if dest == root {
            if topology.rank == root {
                local = produced;
            }
        } else if topology.rank == root {
            if let Some(block) = produced {
                comm.send(&block, dest, DISTRIBUTE_TAG)?;
                debug!(rank = topology.rank, dest, "block delivered");
            }
        } else if topology.rank == dest {
            let (block, _) = comm.recv_vec::<T>(root, DISTRIBUTE_TAG)?;
            if block.len() != block_len {
                return Err(Error::CountMismatch {
                    expected: block_len,
                    found: block.len(),
                });
            }
            local = Some(block);
        }
    }
    comm.barrier()?;

    local.ok_or_else(|| Error::Internal(format!("rank {} received no block", topology.rank)))
}

fn produce<T: Element, S: BlockSource<T>>(
    source: &mut S,
    dest: i32,
    block_len: usize,
) -> Result<LocalBlock<T>> {
    let block = source.next_block(dest, block_len)?;
    if block.len() != block_len {
        return Err(Error::InvalidInput(format!(
            "block for rank {dest} has {} elements, expected {block_len}",
            block.len()
        )));
    }
    Ok(block)
}
