//! Message status information.
//!
//! This module provides the [`Status`] struct returned by completed receives,
//! describing which message was matched.

/// Information about a received message.
///
/// # Example
///
/// ```
/// use ringshift::Universe;
///
/// let statuses = Universe::new(2).unwrap().run(|world| {
///     let peer = 1 - world.rank();
///     let mut buf = [0i32; 1];
///     let request = world.isend(&[world.rank()], peer, 9)?;
///     let status = world.recv(&mut buf, peer, 9)?;
///     request.wait()?;
///     Ok(status)
/// });
/// let status = statuses[0].as_ref().unwrap();
/// assert_eq!((status.source, status.tag, status.count), (1, 9, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements in the message.
    pub count: usize,
}
