//! Circular shift of a block-distributed array around the ring.
//!
//! A shift by `sh` runs `|sh|` rounds. In each round every rank hands one
//! boundary element to a neighbor, receives one from the other neighbor, and
//! slides its block by one position. Positive shifts move elements toward
//! higher global indices, negative shifts toward lower ones; both wrap
//! around the ends of the global array.

use tracing::debug;

use crate::comm::Communicator;
use crate::datatype::Element;
use crate::distribute::LocalBlock;
use crate::error::{Error, Result};
use crate::topology::RingTopology;

/// Tag used for boundary elements during a shift.
pub const SHIFT_TAG: i32 = 200;

/// How a rank pairs its send and its receive within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exchange {
    /// Post the send without blocking, then receive, then complete the send.
    #[default]
    Paired,
    /// Blocking send and receive. One rank at the seam of the ring sends
    /// first while every other rank receives first, which breaks the cycle
    /// of synchronous sends.
    SeamOrdered,
}

/// Tuning knobs for [`shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftOptions {
    /// Round-pairing strategy.
    pub exchange: Exchange,
    /// Reduce the shift magnitude modulo the global length before running
    /// rounds. The resulting placement is the same; only the round count drops.
    pub reduce_rounds: bool,
}

/// What a shift cost the calling rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftReport {
    /// Rounds executed.
    pub rounds: u64,
    /// Point-to-point messages this rank sent during the shift.
    pub messages_sent: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Toward higher global indices.
    Up,
    /// Toward lower global indices.
    Down,
}

/// Shift factor actually executed for a global array of `global_len` elements.
///
/// Without reduction this is `shift` itself. With reduction the magnitude is
/// taken modulo `global_len` and the sign is kept.
pub fn effective_shift(shift: i64, global_len: usize, reduce_rounds: bool) -> i64 {
    if !reduce_rounds || global_len == 0 {
        return shift;
    }
    let magnitude = shift.unsigned_abs() % global_len as u64;
    shift.signum() * magnitude as i64
}

/// Rotate a materialized global array the way [`shift`] rotates a
/// distributed one: element `i` ends up at `(i + shift) mod len`.
pub fn rotate_global<T: Clone>(global: &[T], shift: i64) -> Vec<T> {
    let mut rotated = global.to_vec();
    if !rotated.is_empty() {
        let len = rotated.len() as i64;
        rotated.rotate_right(shift.rem_euclid(len) as usize);
    }
    rotated
}

/// Shift the distributed array by `shift_factor` positions.
///
/// Collective: every rank must call it with blocks of the same length, the
/// same shift factor and the same options. Returns this rank's block of the
/// shifted array; `input` is left untouched.
pub fn shift<T: Element>(
    comm: &Communicator,
    topology: &RingTopology,
    input: &[T],
    shift_factor: i64,
    options: ShiftOptions,
) -> Result<LocalBlock<T>> {
    shift_with_report(comm, topology, input, shift_factor, options).map(|(block, _)| block)
}

/// [`shift`], also reporting the rounds run and messages sent.
pub fn shift_with_report<T: Element>(
    comm: &Communicator,
    topology: &RingTopology,
    input: &[T],
    shift_factor: i64,
    options: ShiftOptions,
) -> Result<(LocalBlock<T>, ShiftReport)> {
    if input.is_empty() {
        return Err(Error::InvalidBlockLength(0));
    }

    let mut working = input.to_vec();
    let global_len = input.len() * topology.size as usize;
    let executed = effective_shift(shift_factor, global_len, options.reduce_rounds);
    if executed == 0 {
        return Ok((working, ShiftReport::default()));
    }

    let direction = if executed > 0 {
        Direction::Up
    } else {
        Direction::Down
    };
    let rounds = executed.unsigned_abs();
    let sent_before = comm.messages_sent();
    debug!(
        rank = topology.rank,
        shift = shift_factor,
        rounds,
        ?direction,
        "starting shift"
    );

    for round in 0..rounds {
        let outgoing = match direction {
            Direction::Up => working[working.len() - 1],
            Direction::Down => working[0],
        };
        let incoming = if topology.is_degenerate() {
            // Own neighbor on both sides: the element comes straight back.
            outgoing
        } else {
            exchange(comm, topology, direction, outgoing, options.exchange)?
        };
        match direction {
            Direction::Up => {
                working.rotate_right(1);
                working[0] = incoming;
            }
            Direction::Down => {
                working.rotate_left(1);
                let last = working.len() - 1;
                working[last] = incoming;
            }
        }
        debug!(rank = topology.rank, round, "round complete");
        comm.barrier()?;
    }

    let report = ShiftReport {
        rounds,
        messages_sent: comm.messages_sent() - sent_before,
    };
    Ok((working, report))
}

/// Swap one boundary element with the neighbors for `direction`.
fn exchange<T: Element>(
    comm: &Communicator,
    topology: &RingTopology,
    direction: Direction,
    outgoing: T,
    strategy: Exchange,
) -> Result<T> {
    let (dest, source, sends_first) = match direction {
        Direction::Up => (topology.successor, topology.predecessor, topology.is_first()),
        Direction::Down => (topology.predecessor, topology.successor, topology.is_last()),
    };
    let mut incoming = [outgoing];
    match strategy {
        Exchange::Paired => {
            comm.sendrecv(&[outgoing], dest, SHIFT_TAG, &mut incoming, source, SHIFT_TAG)?;
        }
        Exchange::SeamOrdered if sends_first => {
            comm.send(&[outgoing], dest, SHIFT_TAG)?;
            comm.recv(&mut incoming, source, SHIFT_TAG)?;
        }
        Exchange::SeamOrdered => {
            comm.recv(&mut incoming, source, SHIFT_TAG)?;
            comm.send(&[outgoing], dest, SHIFT_TAG)?;
        }
    }
    Ok(incoming[0])
}
