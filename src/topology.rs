//! Ring topology over the ranks of a process group.

use crate::comm::Communicator;
use crate::error::{Error, Result};

/// Predecessor and successor of `rank` in a ring of `size` ranks.
///
/// With `size == 1` both neighbors are the rank itself.
pub fn neighbors(rank: i32, size: i32) -> (i32, i32) {
    ((rank - 1 + size) % size, (rank + 1) % size)
}

/// A rank's position in the ring, fixed for the lifetime of the group.
///
/// # Example
///
/// ```
/// use ringshift::RingTopology;
///
/// let topo = RingTopology::new(0, 4).unwrap();
/// assert_eq!((topo.predecessor, topo.successor), (3, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingTopology {
    /// This rank.
    pub rank: i32,
    /// Number of ranks in the ring.
    pub size: i32,
    /// Rank that sends to us when shifting up.
    pub predecessor: i32,
    /// Rank we send to when shifting up.
    pub successor: i32,
}

impl RingTopology {
    /// Topology of `rank` in a ring of `size` ranks.
    pub fn new(rank: i32, size: i32) -> Result<Self> {
        if size < 1 {
            return Err(Error::InvalidGroupSize(size));
        }
        if !(0..size).contains(&rank) {
            return Err(Error::InvalidRank(rank));
        }
        let (predecessor, successor) = neighbors(rank, size);
        Ok(RingTopology {
            rank,
            size,
            predecessor,
            successor,
        })
    }

    /// Topology of the calling rank within `comm`.
    pub fn of(comm: &Communicator) -> Result<Self> {
        Self::new(comm.rank(), comm.size())
    }

    /// A ring of one rank, which is its own neighbor on both sides.
    pub fn is_degenerate(&self) -> bool {
        self.size == 1
    }

    /// Lowest rank, where the ring wraps around.
    pub fn is_first(&self) -> bool {
        self.rank == 0
    }

    /// Highest rank, the other side of the wrap.
    pub fn is_last(&self) -> bool {
        self.rank == self.size - 1
    }
}
