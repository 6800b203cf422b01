//! # ringshift
//!
//! Circular shift of a block-distributed array over a ring of ranks.
//!
//! A global array of `p × L` elements is split into `p` equal blocks, one per
//! rank. Ranks are arranged in a ring and only ever talk to their two
//! neighbors. Shifting by `sh` runs `|sh|` rounds; in each round every rank
//! passes one boundary element along the ring and slides its block by one.
//!
//! This crate provides:
//! - An in-process process group ([`Universe`]) whose ranks run on their own
//!   threads and talk through a [`Communicator`]: synchronous and nonblocking
//!   point-to-point messages, barriers and group-wide abort
//! - The ring topology of each rank ([`RingTopology`])
//! - Distribution of the global array from a root ([`distribute`])
//! - The shift itself ([`shift`])
//! - Rank-ordered gathering and rendering of the result ([`gather_blocks`])
//!
//! ## Quick Start
//!
//! ```
//! use ringshift::{distribute, gather_blocks, shift, RingTopology, SequenceSource, ShiftOptions, Universe};
//!
//! let results = Universe::new(4).unwrap().run(|world| {
//!     let topo = RingTopology::of(world)?;
//!     let block = distribute(world, &topo, 0, 2, &mut SequenceSource::new())?;
//!     let shifted = shift(world, &topo, &block, 1, ShiftOptions::default())?;
//!     gather_blocks(world, &topo, 0, &shifted)
//! });
//!
//! let blocks = results[0].as_ref().unwrap().as_ref().unwrap();
//! assert_eq!(blocks, &vec![vec![8, 1], vec![2, 3], vec![4, 5], vec![6, 7]]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod collect;
mod comm;
mod config;
mod datatype;
mod distribute;
mod error;
pub mod launch;
mod pipeline;
mod request;
mod shift;
mod status;
mod topology;

pub use collect::{gather_blocks, render_rows, render_section, shifted_title, GATHER_TAG};
pub use comm::{Communicator, ANY_SOURCE, ANY_TAG};
pub use config::ShiftConfig;
pub use datatype::{DatatypeTag, Element};
pub use distribute::{
    concat_blocks, distribute, split_blocks, BlockSource, LocalBlock, SequenceSource,
    SliceSource, DISTRIBUTE_TAG,
};
pub use error::{Error, Result};
pub use pipeline::{run_rank, Outcome};
pub use request::{RecvRequest, Request};
pub use shift::{
    effective_shift, rotate_global, shift, shift_with_report, Exchange, ShiftOptions,
    ShiftReport, SHIFT_TAG,
};
pub use status::Status;
pub use topology::{neighbors, RingTopology};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, Dispatch};

use comm::Group;

/// A fixed-size process group.
///
/// Each call to [`run`](Self::run) launches one thread per rank, runs the
/// same closure on all of them and joins them.
///
/// # Example
///
/// ```
/// use ringshift::Universe;
///
/// let universe = Universe::new(3).expect("three ranks");
/// let ranks = universe.run(|world| Ok(world.rank()));
/// assert_eq!(ranks.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Universe {
    size: i32,
}

impl Universe {
    /// A group of `size` ranks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupSize`] when `size < 1`.
    pub fn new(size: i32) -> Result<Self> {
        if size < 1 {
            return Err(Error::InvalidGroupSize(size));
        }
        Ok(Universe { size })
    }

    /// A group sized by the launch environment (see [`launch`]), or of
    /// [`launch::DEFAULT_GROUP_SIZE`] ranks when nothing is set.
    pub fn from_env() -> Result<Self> {
        Self::new(launch::group_size_or_default())
    }

    /// Number of ranks.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Run `f` on every rank and collect the results in rank order.
    ///
    /// A rank that returns an error (other than [`Error::Aborted`]) or panics
    /// aborts the group, so ranks waiting on it fail with
    /// [`Error::Aborted`] instead of stalling.
    ///
    /// Rank threads log to the caller's current `tracing` subscriber.
    pub fn run<R, F>(&self, f: F) -> Vec<Result<R>>
    where
        F: Fn(&Communicator) -> Result<R> + Sync,
        R: Send,
    {
        let (group, mailboxes) = Group::new(self.size);
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        let f = &f;

        std::thread::scope(|scope| {
            let handles: Vec<_> = mailboxes
                .into_iter()
                .enumerate()
                .map(|(rank, mailbox)| {
                    let rank = rank as i32;
                    let shared = Arc::clone(&group);
                    let dispatch = dispatch.clone();
                    std::thread::Builder::new()
                        .name(format!("rank-{rank}"))
                        .spawn_scoped(scope, move || {
                            tracing::dispatcher::with_default(&dispatch, || {
                                let comm = Communicator::new(rank, Arc::clone(&shared), mailbox);
                                let result = panic::catch_unwind(AssertUnwindSafe(|| f(&comm)))
                                    .unwrap_or(Err(Error::RankPanicked(rank)));
                                if let Err(err) = &result {
                                    if !err.is_abort() {
                                        debug!(rank, %err, "rank failed");
                                        shared.abort(err.code());
                                    }
                                }
                                result
                            })
                        })
                        .map_err(|err| {
                            group.abort(1);
                            Error::Internal(format!("cannot spawn rank {rank}: {err}"))
                        })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.and_then(|handle| {
                        handle
                            .join()
                            .unwrap_or(Err(Error::RankPanicked(rank as i32)))
                    })
                })
                .collect()
        })
    }
}
