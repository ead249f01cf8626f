//! Bounded queue of finding & binding candidates.

use crate::{Endpoint, NetworkAddress, FIND_BIND_QUEUE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// A remote endpoint that answered an identify query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindBindDestination {
    pub address: NetworkAddress,
    pub endpoint: Endpoint,
}

impl fmt::Display for FindBindDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.endpoint)
    }
}

/// Returned when pushing onto a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("discovery queue full, dropped {0}")]
pub struct DiscoveryQueueFull(pub FindBindDestination);

/// FIFO of identify-query responders awaiting a simple-descriptor request.
///
/// Holds at most [`FIND_BIND_QUEUE_SIZE`] entries. A push onto a full queue
/// is rejected and the queued entries are kept.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryQueue {
    entries: VecDeque<FindBindDestination>,
}

impl DiscoveryQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(FIND_BIND_QUEUE_SIZE),
        }
    }

    /// Append a destination. Duplicates are accepted once.
    pub fn push(&mut self, dst: FindBindDestination) -> Result<(), DiscoveryQueueFull> {
        if self.entries.contains(&dst) {
            return Ok(());
        }
        if self.is_full() {
            return Err(DiscoveryQueueFull(dst));
        }
        self.entries.push_back(dst);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<FindBindDestination> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= FIND_BIND_QUEUE_SIZE
    }
}
