//! One rank's full run: distribute, shift, gather.

use tracing::info;

use crate::collect::gather_blocks;
use crate::comm::Communicator;
use crate::config::ShiftConfig;
use crate::datatype::Element;
use crate::distribute::{distribute, BlockSource, LocalBlock};
use crate::error::Result;
use crate::shift::{shift_with_report, ShiftReport};
use crate::topology::RingTopology;

/// What the root ends up holding after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Every rank's input block, in rank order.
    pub input: Vec<LocalBlock<T>>,
    /// Every rank's block after the shift, in rank order.
    pub shifted: Vec<LocalBlock<T>>,
    /// The root's own shift cost.
    pub report: ShiftReport,
}

/// Distribute from `root`, shift by `config.shift`, and gather both the input
/// and the shifted blocks back to `root`.
///
/// Collective. Returns `Some` on the root and `None` everywhere else.
pub fn run_rank<T, S>(
    comm: &Communicator,
    config: &ShiftConfig,
    root: i32,
    source: &mut S,
) -> Result<Option<Outcome<T>>>
where
    T: Element,
    S: BlockSource<T>,
{
    config.validate()?;
    let topology = RingTopology::of(comm)?;

    let input = distribute(comm, &topology, root, config.block_len, source)?;
    let (shifted, report) = shift_with_report(
        comm,
        &topology,
        &input,
        config.shift,
        config.shift_options(),
    )?;

    let gathered_input = gather_blocks(comm, &topology, root, &input)?;
    let gathered_shifted = gather_blocks(comm, &topology, root, &shifted)?;

    Ok(match (gathered_input, gathered_shifted) {
        (Some(input), Some(shifted)) => {
            info!(
                rank = topology.rank,
                rounds = report.rounds,
                messages = report.messages_sent,
                "shift complete"
            );
            Some(Outcome {
                input,
                shifted,
                report,
            })
        }
        _ => None,
    })
}
