//! Communicators over an in-process process group.
//!
//! Every rank owns one mailbox. Point-to-point messages are posted into the
//! destination's mailbox and matched there by `(source, tag)`: first against
//! the nonblocking receives the rank has posted, in posting order, then
//! against the receive being served. Messages that match neither are parked
//! until one does. Sends are synchronous: the receiver acknowledges a message
//! when it is matched, and a send completes only once that acknowledgement
//! has arrived.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::datatype::{Element, Payload};
use crate::error::{Error, Result};
use crate::request::{RecvRequest, Request};
use crate::status::Status;

/// Wildcard source for receives.
pub const ANY_SOURCE: i32 = -1;

/// Wildcard tag for receives.
pub const ANY_TAG: i32 = -1;

pub(crate) enum Envelope {
    Data {
        source: i32,
        tag: i32,
        seq: u64,
        payload: Payload,
    },
    Ack {
        seq: u64,
    },
    Abort {
        code: i32,
    },
}

/// A nonblocking receive waiting for, or holding, its message.
struct PostedRecv {
    id: u64,
    source: i32,
    tag: i32,
    matched: Option<(Status, Payload)>,
}

fn matches(want_source: i32, want_tag: i32, source: i32, tag: i32) -> bool {
    (want_source == ANY_SOURCE || want_source == source) && (want_tag == ANY_TAG || want_tag == tag)
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: i32,
    generation: u64,
    aborted: Option<i32>,
}

/// Generation-counting barrier that also carries the group's abort state.
#[derive(Debug)]
struct GroupBarrier {
    size: i32,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl GroupBarrier {
    fn new(size: i32) -> Self {
        GroupBarrier {
            size,
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(code) = state.aborted {
            return Err(Error::Aborted(code));
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return Ok(());
        }
        while state.generation == generation && state.aborted.is_none() {
            self.cvar.wait(&mut state);
        }
        match state.aborted {
            Some(code) if state.generation == generation => Err(Error::Aborted(code)),
            _ => Ok(()),
        }
    }

    /// Returns `false` if the group was already aborted.
    fn abort(&self, code: i32) -> bool {
        let mut state = self.state.lock();
        if state.aborted.is_some() {
            return false;
        }
        state.aborted = Some(code);
        self.cvar.notify_all();
        true
    }

    fn aborted(&self) -> Option<i32> {
        self.state.lock().aborted
    }
}

/// State shared by every rank of one process group.
pub(crate) struct Group {
    size: i32,
    mailboxes: Vec<Sender<Envelope>>,
    barrier: GroupBarrier,
}

impl Group {
    /// Build the shared state and the per-rank mailbox receivers, in rank order.
    pub(crate) fn new(size: i32) -> (Arc<Group>, Vec<Receiver<Envelope>>) {
        let (mailboxes, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::channel()).unzip();
        let group = Group {
            size,
            mailboxes,
            barrier: GroupBarrier::new(size),
        };
        (Arc::new(group), receivers)
    }

    pub(crate) fn abort(&self, code: i32) {
        if self.barrier.abort(code) {
            for mailbox in &self.mailboxes {
                // A rank that already finished has dropped its mailbox.
                let _ = mailbox.send(Envelope::Abort { code });
            }
        }
    }

    fn post(&self, dest: i32, envelope: Envelope) -> Result<()> {
        self.mailboxes[dest as usize]
            .send(envelope)
            .map_err(|_| Error::Disconnected(dest))
    }
}

/// A communicator over all ranks of a [`Universe`](crate::Universe).
///
/// Each rank receives its own communicator from
/// [`Universe::run`](crate::Universe::run). The handle is neither `Send` nor
/// `Sync`: it must only be used from the rank thread it was handed to.
///
/// # Example
///
/// ```
/// use ringshift::Universe;
///
/// let ranks = Universe::new(3).unwrap().run(|world| {
///     world.barrier()?;
///     Ok((world.rank(), world.size()))
/// });
/// assert_eq!(ranks[2].as_ref().unwrap(), &(2, 3));
/// ```
pub struct Communicator {
    rank: i32,
    group: Arc<Group>,
    mailbox: Receiver<Envelope>,
    unexpected: RefCell<VecDeque<Envelope>>,
    posted: RefCell<Vec<PostedRecv>>,
    acks: RefCell<HashSet<u64>>,
    next_seq: Cell<u64>,
    next_recv_id: Cell<u64>,
    sent: Cell<u64>,
    /// Marker to prevent Send/Sync
    _marker: PhantomData<*mut ()>,
}

impl Communicator {
    pub(crate) fn new(rank: i32, group: Arc<Group>, mailbox: Receiver<Envelope>) -> Self {
        Communicator {
            rank,
            group,
            mailbox,
            unexpected: RefCell::new(VecDeque::new()),
            posted: RefCell::new(Vec::new()),
            acks: RefCell::new(HashSet::new()),
            next_seq: Cell::new(0),
            next_recv_id: Cell::new(0),
            sent: Cell::new(0),
            _marker: PhantomData,
        }
    }

    /// Get the rank of the calling process in this communicator.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of processes in this communicator.
    pub fn size(&self) -> i32 {
        self.group.size
    }

    /// Number of point-to-point messages this rank has sent so far.
    pub fn messages_sent(&self) -> u64 {
        self.sent.get()
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All processes in the communicator must call this function. No process
    /// will return until all processes have entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        self.group.barrier.wait()
    }

    /// Abort the whole process group.
    ///
    /// Every rank blocked in a send, receive or barrier wakes up with
    /// [`Error::Aborted`]; every later operation fails the same way. Only the
    /// first abort's code is kept.
    pub fn abort(&self, code: i32) {
        debug!(rank = self.rank, code, "aborting process group");
        self.group.abort(code);
    }

    /// The abort code, if the group has been aborted.
    pub fn aborted(&self) -> Option<i32> {
        self.group.barrier.aborted()
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice to another process.
    ///
    /// Returns once the destination has received the message.
    pub fn send<T: Element>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        self.isend(data, dest, tag)?.wait()
    }

    /// Receive into a slice from another process.
    ///
    /// Use [`ANY_SOURCE`] and [`ANY_TAG`] as wildcards. The buffer length must
    /// equal the number of elements in the matched message.
    pub fn recv<T: Element>(&self, data: &mut [T], source: i32, tag: i32) -> Result<Status> {
        let (values, status) = self.recv_vec::<T>(source, tag)?;
        if values.len() != data.len() {
            return Err(Error::CountMismatch {
                expected: data.len(),
                found: values.len(),
            });
        }
        data.copy_from_slice(&values);
        Ok(status)
    }

    /// Receive a message of any length from another process.
    pub fn recv_vec<T: Element>(&self, source: i32, tag: i32) -> Result<(Vec<T>, Status)> {
        self.check_source(source)?;
        self.check_recv_tag(tag)?;
        let (status, seq, payload) = self.match_message(source, tag)?;
        // Acknowledge even on a type mismatch so the sender is not left hanging.
        self.group.post(status.source, Envelope::Ack { seq })?;
        trace!(
            rank = self.rank,
            source = status.source,
            tag = status.tag,
            count = status.count,
            datatype = ?payload.datatype(),
            "received"
        );
        let values = payload.unpack::<T>()?;
        Ok((values, status))
    }

    /// Start a nonblocking send.
    ///
    /// The message is posted immediately; the returned request completes once
    /// the destination has received it.
    pub fn isend<T: Element>(&self, data: &[T], dest: i32, tag: i32) -> Result<Request<'_>> {
        self.check_live()?;
        self.check_dest(dest)?;
        self.check_send_tag(tag)?;
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.group.post(
            dest,
            Envelope::Data {
                source: self.rank,
                tag,
                seq,
                payload: Payload::pack(data),
            },
        )?;
        self.sent.set(self.sent.get() + 1);
        trace!(rank = self.rank, dest, tag, count = data.len(), "posted");
        Ok(Request::new(self, seq))
    }

    /// Start a nonblocking receive.
    ///
    /// A message already parked in the mailbox is matched right away;
    /// otherwise the receive is posted and matched by whatever operation
    /// this rank blocks in next (a send, a receive or a wait). The sender is
    /// acknowledged at match time, so posting a receive and then calling a
    /// blocking [`send`](Self::send) around a ring does not deadlock.
    pub fn irecv<T: Element>(&self, source: i32, tag: i32) -> Result<RecvRequest<'_, T>> {
        self.check_live()?;
        self.check_source(source)?;
        self.check_recv_tag(tag)?;
        let id = self.next_recv_id.get();
        self.next_recv_id.set(id + 1);
        let matched = match self.take_unexpected(source, tag) {
            Some((status, seq, payload)) => {
                self.group.post(status.source, Envelope::Ack { seq })?;
                Some((status, payload))
            }
            None => None,
        };
        self.posted.borrow_mut().push(PostedRecv {
            id,
            source,
            tag,
            matched,
        });
        Ok(RecvRequest::new(self, id))
    }

    /// Send to one process and receive from another in a single call.
    ///
    /// The send is posted before the receive is served, so a ring of ranks
    /// all calling `sendrecv` cannot deadlock.
    #[allow(clippy::too_many_arguments)]
    pub fn sendrecv<T: Element>(
        &self,
        send: &[T],
        dest: i32,
        sendtag: i32,
        recv: &mut [T],
        source: i32,
        recvtag: i32,
    ) -> Result<Status> {
        let request = self.isend(send, dest, sendtag)?;
        let status = self.recv(recv, source, recvtag)?;
        request.wait()?;
        Ok(status)
    }

    // ========================================================================
    // Mailbox plumbing
    // ========================================================================

    fn check_live(&self) -> Result<()> {
        match self.aborted() {
            Some(code) => Err(Error::Aborted(code)),
            None => Ok(()),
        }
    }

    fn check_dest(&self, dest: i32) -> Result<()> {
        if (0..self.size()).contains(&dest) {
            Ok(())
        } else {
            Err(Error::InvalidRank(dest))
        }
    }

    fn check_source(&self, source: i32) -> Result<()> {
        if source == ANY_SOURCE {
            Ok(())
        } else {
            self.check_dest(source)
        }
    }

    fn check_send_tag(&self, tag: i32) -> Result<()> {
        if tag < 0 {
            Err(Error::InvalidTag(tag))
        } else {
            Ok(())
        }
    }

    fn check_recv_tag(&self, tag: i32) -> Result<()> {
        if tag == ANY_TAG {
            Ok(())
        } else {
            self.check_send_tag(tag)
        }
    }

    /// Block on the mailbox and file whatever arrives.
    ///
    /// Returns `Ok(true)` when an envelope was handled, `Ok(false)` when the
    /// mailbox was empty and `block` is false.
    fn pump(&self, block: bool) -> Result<bool> {
        let envelope = if block {
            self.mailbox
                .recv()
                .map_err(|_| Error::Disconnected(self.rank))?
        } else {
            match self.mailbox.try_recv() {
                Ok(envelope) => envelope,
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => return Err(Error::Disconnected(self.rank)),
            }
        };
        match envelope {
            Envelope::Abort { code } => return Err(Error::Aborted(code)),
            Envelope::Ack { seq } => {
                self.acks.borrow_mut().insert(seq);
            }
            Envelope::Data {
                source,
                tag,
                seq,
                payload,
            } => {
                let slot = self
                    .posted
                    .borrow()
                    .iter()
                    .position(|p| p.matched.is_none() && matches(p.source, p.tag, source, tag));
                match slot {
                    Some(index) => {
                        self.group.post(source, Envelope::Ack { seq })?;
                        trace!(rank = self.rank, source, tag, "matched posted receive");
                        let status = Status {
                            source,
                            tag,
                            count: payload.count(),
                        };
                        self.posted.borrow_mut()[index].matched = Some((status, payload));
                    }
                    None => self.unexpected.borrow_mut().push_back(Envelope::Data {
                        source,
                        tag,
                        seq,
                        payload,
                    }),
                }
            }
        }
        Ok(true)
    }

    fn take_unexpected(&self, source: i32, tag: i32) -> Option<(Status, u64, Payload)> {
        let mut unexpected = self.unexpected.borrow_mut();
        let index = unexpected.iter().position(|envelope| match envelope {
            Envelope::Data {
                source: s, tag: t, ..
            } => matches(source, tag, *s, *t),
            _ => false,
        })?;
        match unexpected.remove(index) {
            Some(Envelope::Data {
                source,
                tag,
                seq,
                payload,
            }) => Some((
                Status {
                    source,
                    tag,
                    count: payload.count(),
                },
                seq,
                payload,
            )),
            _ => None,
        }
    }

    fn match_message(&self, source: i32, tag: i32) -> Result<(Status, u64, Payload)> {
        self.check_live()?;
        loop {
            if let Some(found) = self.take_unexpected(source, tag) {
                return Ok(found);
            }
            self.pump(true)?;
        }
    }

    pub(crate) fn wait_ack(&self, seq: u64) -> Result<()> {
        self.check_live()?;
        while !self.acks.borrow_mut().remove(&seq) {
            self.pump(true)?;
        }
        Ok(())
    }

    pub(crate) fn test_ack(&self, seq: u64) -> Result<bool> {
        self.check_live()?;
        while self.pump(false)? {}
        Ok(self.acks.borrow_mut().remove(&seq))
    }

    fn take_posted(&self, id: u64) -> Option<(Status, Payload)> {
        let mut posted = self.posted.borrow_mut();
        let index = posted
            .iter()
            .position(|p| p.id == id && p.matched.is_some())?;
        posted.remove(index).matched
    }

    pub(crate) fn wait_recv(&self, id: u64) -> Result<(Status, Payload)> {
        self.check_live()?;
        loop {
            if let Some(found) = self.take_posted(id) {
                return Ok(found);
            }
            self.pump(true)?;
        }
    }

    pub(crate) fn test_recv(&self, id: u64) -> Result<bool> {
        self.check_live()?;
        while self.pump(false)? {}
        Ok(self
            .posted
            .borrow()
            .iter()
            .any(|p| p.id == id && p.matched.is_some()))
    }

    /// Forget a posted receive. A message it already matched is discarded.
    pub(crate) fn cancel_recv(&self, id: u64) {
        self.posted.borrow_mut().retain(|p| p.id != id);
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.group.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Universe;

    #[test]
    fn barrier_releases_every_rank() {
        let results = Universe::new(5).unwrap().run(|world| {
            for _ in 0..10 {
                world.barrier()?;
            }
            Ok(world.rank())
        });
        let ranks: Vec<i32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn messages_with_same_source_and_tag_keep_order() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                let first = world.isend(&[1i32], 1, 0)?;
                let second = world.isend(&[2i32], 1, 0)?;
                Request::wait_all(vec![first, second])?;
                Ok(vec![])
            } else {
                let (a, _) = world.recv_vec::<i32>(0, 0)?;
                let (b, _) = world.recv_vec::<i32>(0, 0)?;
                Ok(vec![a[0], b[0]])
            }
        });
        assert_eq!(results[1].as_ref().unwrap(), &vec![1, 2]);
    }

    #[test]
    fn receive_matches_by_tag_out_of_order() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                let low = world.isend(&[10i64], 1, 1)?;
                let high = world.isend(&[20i64], 1, 2)?;
                high.wait()?;
                low.wait()?;
                Ok(0)
            } else {
                let mut buf = [0i64];
                world.recv(&mut buf, 0, 2)?;
                let later = buf[0];
                world.recv(&mut buf, 0, 1)?;
                Ok(later * 100 + buf[0])
            }
        });
        assert_eq!(results[1].as_ref().unwrap(), &2010);
    }

    #[test]
    fn any_source_reports_actual_sender() {
        let results = Universe::new(3).unwrap().run(|world| {
            if world.rank() == 2 {
                let mut sources = Vec::new();
                for _ in 0..2 {
                    let (_, status) = world.recv_vec::<u8>(ANY_SOURCE, ANY_TAG)?;
                    sources.push(status.source);
                }
                sources.sort_unstable();
                Ok(sources)
            } else {
                world.send(&[world.rank() as u8], 2, 5)?;
                Ok(vec![])
            }
        });
        assert_eq!(results[2].as_ref().unwrap(), &vec![0, 1]);
    }

    #[test]
    fn invalid_peers_and_tags_are_rejected() {
        let results = Universe::new(2).unwrap().run(|world| {
            assert_eq!(
                world.send(&[1i32], 2, 0).unwrap_err(),
                Error::InvalidRank(2)
            );
            assert_eq!(
                world.isend(&[1i32], 0, -3).unwrap_err(),
                Error::InvalidTag(-3)
            );
            assert!(world.irecv::<i32>(-7, 0).is_err());
            Ok(world.messages_sent())
        });
        for result in results {
            assert_eq!(result.unwrap(), 0);
        }
    }

    #[test]
    fn count_mismatch_is_reported() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                world.send(&[1i32, 2, 3], 1, 0)?;
                Ok(())
            } else {
                let mut buf = [0i32; 2];
                match world.recv(&mut buf, 0, 0) {
                    Err(Error::CountMismatch {
                        expected: 2,
                        found: 3,
                    }) => Ok(()),
                    other => panic!("unexpected result {other:?}"),
                }
            }
        });
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn blocking_sends_around_a_ring_need_an_odd_one_out() {
        // Rank 0 sends first, everyone else receives first.
        let results = Universe::new(4).unwrap().run(|world| {
            let next = (world.rank() + 1) % world.size();
            let prev = (world.rank() + world.size() - 1) % world.size();
            let mut buf = [0i32];
            if world.rank() == 0 {
                world.send(&[world.rank()], next, 0)?;
                world.recv(&mut buf, prev, 0)?;
            } else {
                world.recv(&mut buf, prev, 0)?;
                world.send(&[world.rank()], next, 0)?;
            }
            Ok(buf[0])
        });
        let got: Vec<i32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(got, vec![3, 0, 1, 2]);
    }

    #[test]
    fn abort_unblocks_waiting_ranks() {
        let results = Universe::new(3).unwrap().run(|world| {
            if world.rank() == 0 {
                world.abort(42);
                Err(Error::Aborted(42))
            } else {
                // Nobody ever sends this.
                world.recv_vec::<i32>(0, 0).map(|_| ())
            }
        });
        for result in results {
            assert_eq!(result.unwrap_err(), Error::Aborted(42));
        }
    }

    #[test]
    fn barrier_is_released_by_abort() {
        let results = Universe::new(3).unwrap().run(|world| {
            if world.rank() == 1 {
                Err(Error::InvalidInput("bad".into()))
            } else {
                world.barrier()
            }
        });
        assert_eq!(
            results[1].as_ref().unwrap_err(),
            &Error::InvalidInput("bad".into())
        );
        assert_eq!(results[0].as_ref().unwrap_err(), &Error::Aborted(2));
        assert_eq!(results[2].as_ref().unwrap_err(), &Error::Aborted(2));
    }

    #[test]
    fn posted_receive_lets_blocking_sends_go_around_a_ring() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let mut rings = Vec::new();
            for size in [2, 3, 5] {
                let results = Universe::new(size).unwrap().run(|world| {
                    let next = (world.rank() + 1) % world.size();
                    let prev = (world.rank() + world.size() - 1) % world.size();
                    let incoming = world.irecv::<i32>(prev, 0)?;
                    world.send(&[world.rank()], next, 0)?;
                    let (values, status) = incoming.wait()?;
                    assert_eq!(status.source, prev);
                    Ok(values[0])
                });
                rings.push(results.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>());
            }
            let _ = done_tx.send(rings);
        });
        let rings = done_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("irecv followed by a blocking send stalled");
        assert_eq!(rings[0], vec![1, 0]);
        assert_eq!(rings[1], vec![2, 0, 1]);
        assert_eq!(rings[2], vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn posted_receive_takes_precedence_over_later_blocking_receive() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                world.send(&[1u32], 1, 3)?;
                world.send(&[2u32], 1, 3)?;
                Ok((0, 0))
            } else {
                let first = world.irecv::<u32>(0, 3)?;
                let (second, _) = world.recv_vec::<u32>(0, 3)?;
                let (first, _) = first.wait()?;
                Ok((first[0], second[0]))
            }
        });
        assert_eq!(results[1].as_ref().unwrap(), &(1, 2));
    }

    #[test]
    fn send_test_flips_once_the_peer_receives() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                let mut request = world.isend(&[5i64], 1, 0)?;
                // Rank 1 cannot receive before this barrier.
                let before = request.test()?;
                assert!(!request.is_completed());
                world.barrier()?;
                while !request.test()? {
                    std::thread::yield_now();
                }
                assert!(request.is_completed());
                request.wait()?;
                Ok(before)
            } else {
                world.barrier()?;
                world.recv_vec::<i64>(0, 0)?;
                Ok(false)
            }
        });
        assert!(!results[0].as_ref().unwrap());
        assert!(results[1].is_ok());
    }

    #[test]
    fn receive_test_reports_arrival_and_acknowledges_sender() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                world.barrier()?;
                world.send(&[9u8, 8], 1, 4)?;
                Ok(vec![])
            } else {
                let mut incoming = world.irecv::<u8>(0, 4)?;
                assert!(!incoming.test()?);
                world.barrier()?;
                // Polling alone must complete rank 0's synchronous send.
                while !incoming.test()? {
                    std::thread::yield_now();
                }
                let (values, status) = incoming.wait()?;
                assert_eq!(status.count, 2);
                Ok(values)
            }
        });
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap(), &vec![9, 8]);
    }

    #[test]
    fn wait_into_copies_or_reports_count_mismatch() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                world.send(&[7i32, 8, 9], 1, 0)?;
                world.send(&[1i32, 2], 1, 1)?;
                Ok([0; 3])
            } else {
                let mut buf = [0i32; 3];
                let status = world.irecv::<i32>(0, 0)?.wait_into(&mut buf)?;
                assert_eq!(status.count, 3);
                let mut small = [0i32; 1];
                assert_eq!(
                    world.irecv::<i32>(0, 1)?.wait_into(&mut small),
                    Err(Error::CountMismatch {
                        expected: 1,
                        found: 2,
                    })
                );
                Ok(buf)
            }
        });
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap(), &[7, 8, 9]);
    }

    #[test]
    fn dropped_receive_no_longer_matches() {
        let results = Universe::new(2).unwrap().run(|world| {
            if world.rank() == 0 {
                world.barrier()?;
                world.send(&[3i32], 1, 0)?;
                Ok(0)
            } else {
                drop(world.irecv::<i32>(0, 0)?);
                world.barrier()?;
                let (values, _) = world.recv_vec::<i32>(0, 0)?;
                Ok(values[0])
            }
        });
        assert_eq!(results[1].as_ref().unwrap(), &3);
    }
}
