//! Request handles for nonblocking point-to-point operations.

use std::marker::PhantomData;

use crate::comm::Communicator;
use crate::datatype::Element;
use crate::error::{Error, Result};
use crate::status::Status;

/// A handle to a nonblocking send.
///
/// The message has already been posted to the destination. You must call
/// `wait()` or `test()` to learn that the destination has received it.
///
/// # Example
///
/// ```
/// use ringshift::Universe;
///
/// let got = Universe::new(2).unwrap().run(|world| {
///     let peer = 1 - world.rank();
///     // Both ranks post before receiving, so neither blocks the other.
///     let request = world.isend(&[world.rank() as i64 * 10], peer, 0)?;
///     let mut buf = [0i64];
///     world.recv(&mut buf, peer, 0)?;
///     request.wait()?;
///     Ok(buf[0])
/// });
/// assert_eq!(*got[0].as_ref().unwrap(), 10);
/// ```
pub struct Request<'a> {
    comm: &'a Communicator,
    seq: u64,
    completed: bool,
}

impl<'a> Request<'a> {
    pub(crate) fn new(comm: &'a Communicator, seq: u64) -> Self {
        Request {
            comm,
            seq,
            completed: false,
        }
    }

    /// Check if this request has been completed.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Wait for the destination to receive the message.
    pub fn wait(mut self) -> Result<()> {
        if self.completed {
            return Ok(());
        }
        // Mark first: a failed wait must not be retried from `drop`.
        self.completed = true;
        self.comm.wait_ack(self.seq)
    }

    /// Test if the destination has received the message, without blocking.
    pub fn test(&mut self) -> Result<bool> {
        if self.completed {
            return Ok(true);
        }
        if self.comm.test_ack(self.seq)? {
            self.completed = true;
        }
        Ok(self.completed)
    }

    /// Wait for all requests in a collection to complete.
    ///
    /// Every request is waited on even if an earlier one fails; the first
    /// error is returned.
    pub fn wait_all(requests: Vec<Request<'a>>) -> Result<()> {
        let mut first_error = None;
        for request in requests {
            if let Err(err) = request.wait() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        if !self.completed {
            // Leaving a posted send unmatched would strand its acknowledgement.
            let _ = self.comm.wait_ack(self.seq);
        }
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("rank", &self.comm.rank())
            .field("seq", &self.seq)
            .field("completed", &self.completed)
            .finish()
    }
}

/// A handle to a nonblocking receive.
///
/// The receive is posted when the request is created. Any blocking call on
/// the same communicator may match it and acknowledge the sender; `wait`
/// hands over the matched message. Dropping the request without waiting
/// cancels the receive.
///
/// # Example
///
/// ```
/// use ringshift::Universe;
///
/// let got = Universe::new(3).unwrap().run(|world| {
///     let next = (world.rank() + 1) % world.size();
///     let prev = (world.rank() + world.size() - 1) % world.size();
///     let incoming = world.irecv::<i32>(prev, 0)?;
///     world.send(&[world.rank()], next, 0)?;
///     let (values, _) = incoming.wait()?;
///     Ok(values[0])
/// });
/// assert_eq!(*got[0].as_ref().unwrap(), 2);
/// ```
pub struct RecvRequest<'a, T: Element> {
    comm: &'a Communicator,
    id: u64,
    _marker: PhantomData<T>,
}

impl<'a, T: Element> RecvRequest<'a, T> {
    pub(crate) fn new(comm: &'a Communicator, id: u64) -> Self {
        RecvRequest {
            comm,
            id,
            _marker: PhantomData,
        }
    }

    /// Wait for a matching message and return its elements.
    pub fn wait(self) -> Result<(Vec<T>, Status)> {
        let (status, payload) = self.comm.wait_recv(self.id)?;
        let values = payload.unpack::<T>()?;
        Ok((values, status))
    }

    /// Wait for a matching message and copy it into `data`.
    ///
    /// The buffer length must equal the number of elements in the message.
    pub fn wait_into(self, data: &mut [T]) -> Result<Status> {
        let (values, status) = self.wait()?;
        if values.len() != data.len() {
            return Err(Error::CountMismatch {
                expected: data.len(),
                found: values.len(),
            });
        }
        data.copy_from_slice(&values);
        Ok(status)
    }

    /// Test if a matching message has arrived, without blocking.
    pub fn test(&mut self) -> Result<bool> {
        self.comm.test_recv(self.id)
    }
}

impl<T: Element> Drop for RecvRequest<'_, T> {
    fn drop(&mut self) {
        self.comm.cancel_recv(self.id);
    }
}

impl<T: Element> std::fmt::Debug for RecvRequest<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecvRequest")
            .field("rank", &self.comm.rank())
            .field("id", &self.id)
            .field("datatype", &T::TAG)
            .finish()
    }
}
