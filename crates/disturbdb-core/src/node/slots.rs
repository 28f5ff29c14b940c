//! Inbound and outbound connection slots.
//!
//! Each direction has its own limit. A slot is held by a [`SlotGuard`] for
//! the lifetime of the connection (handshake included) and returned when the
//! guard drops.

use crate::node::error::{NodeError, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Direction of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionDirection {
    /// We initiated this connection
    Outbound,
    /// Peer initiated this connection
    Inbound,
}

impl fmt::Display for ConnectionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionDirection::Outbound => f.write_str("outbound"),
            ConnectionDirection::Inbound => f.write_str("inbound"),
        }
    }
}

/// Connection slot counters
#[derive(Debug)]
pub struct ConnectionSlots {
    inbound: AtomicUsize,
    outbound: AtomicUsize,
    max_inbound: usize,
    max_outbound: usize,
}

impl ConnectionSlots {
    /// Create slot counters with the given limits
    pub fn new(max_inbound: usize, max_outbound: usize) -> Self {
        Self {
            inbound: AtomicUsize::new(0),
            outbound: AtomicUsize::new(0),
            max_inbound,
            max_outbound,
        }
    }

    fn counter(&self, direction: ConnectionDirection) -> &AtomicUsize {
        match direction {
            ConnectionDirection::Inbound => &self.inbound,
            ConnectionDirection::Outbound => &self.outbound,
        }
    }

    /// Configured limit for `direction`
    pub fn limit(&self, direction: ConnectionDirection) -> usize {
        match direction {
            ConnectionDirection::Inbound => self.max_inbound,
            ConnectionDirection::Outbound => self.max_outbound,
        }
    }

    /// Slots in use for `direction`
    pub fn count(&self, direction: ConnectionDirection) -> usize {
        self.counter(direction).load(Ordering::Acquire)
    }

    /// Current inbound count
    pub fn inbound_count(&self) -> usize {
        self.count(ConnectionDirection::Inbound)
    }

    /// Current outbound count
    pub fn outbound_count(&self) -> usize {
        self.count(ConnectionDirection::Outbound)
    }

    /// Reserve a slot.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::CapacityExceeded`] if every slot in `direction`
    /// is taken.
    pub fn try_acquire(self: &Arc<Self>, direction: ConnectionDirection) -> Result<SlotGuard> {
        let limit = self.limit(direction);
        self.counter(direction)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| NodeError::CapacityExceeded { direction, limit })?;

        Ok(SlotGuard {
            slots: Arc::clone(self),
            direction,
        })
    }
}

/// A reserved connection slot, released on drop
#[derive(Debug)]
pub struct SlotGuard {
    slots: Arc<ConnectionSlots>,
    direction: ConnectionDirection,
}

impl SlotGuard {
    /// Direction of the reserved slot
    pub fn direction(&self) -> ConnectionDirection {
        self.direction
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots
            .counter(self.direction)
            .fetch_sub(1, Ordering::AcqRel);
    }
}
