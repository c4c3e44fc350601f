//! Per-flow state: the channel table and the virtual-time tagging recurrence.

use std::collections::{HashMap, VecDeque};

use crate::arrival::ConnectionKey;

/// Default weight assigned to a channel until an explicit weight is seen.
const DEFAULT_WEIGHT: f64 = 1.0;

/// A channel's position in the arena, assigned strictly in order of first appearance
/// and never reused (§3, Invariant 4). Also the heap tie-break key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelIndex(pub usize);

/// A packet that has been tagged and is sitting in its channel's FIFO, waiting either
/// to be the channel's heap entry or to reach the head once its predecessors depart.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedPacket {
    pub arrival_time: u64,
    pub length: u64,
    /// The weight literal as it appeared on this specific arrival, if any — purely for
    /// echoing it back on the output line (§6), distinct from the channel's current
    /// weight which may have since changed again.
    pub weight_literal: Option<f64>,
    /// Virtual-time finish tag, fixed at enqueue time and never recomputed (§9, open
    /// question 2: this implementation tags eagerly on arrival rather than at head).
    pub finish_tag: f64,
}

/// Per-connection scheduling state (§3).
#[derive(Debug)]
pub struct Channel {
    pub index: ChannelIndex,
    pub key: ConnectionKey,
    weight: f64,
    pending: VecDeque<QueuedPacket>,
    /// Finish tag of the most recently *tagged* packet on this channel, or 0 if none
    /// has ever been tagged. Survives INACTIVE periods unchanged.
    f_last: f64,
}

impl Channel {
    fn new(index: ChannelIndex, key: ConnectionKey) -> Self {
        Self {
            index,
            key,
            weight: DEFAULT_WEIGHT,
            pending: VecDeque::new(),
            f_last: 0.0,
        }
    }

    /// Current weight. Defaults to 1.0 until an explicit weight arrives.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Install a new weight; takes effect for every subsequent tag computed on this
    /// channel, including the packet carrying it (§4.C).
    #[inline]
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn front(&self) -> Option<&QueuedPacket> {
        self.pending.front()
    }

    /// Tag and enqueue one packet, under the current system virtual time `v`.
    ///
    /// Implements the Parekh-Gallager recurrence of §4.C: start tag `S = max(v,
    /// F_last)`, finish tag `F = S + length / weight`, and `F_last` is updated to `F`.
    /// Returns the freshly computed finish tag together with whether the channel's
    /// FIFO was empty before this push (the caller uses that to decide whether a new
    /// ready-heap entry is needed, per §4.E step 4).
    #[tracing::instrument(level = "trace", skip(self), fields(channel = self.index.0))]
    pub fn enqueue(&mut self, v: f64, arrival_time: u64, length: u64, weight_literal: Option<f64>) -> (f64, bool) {
        let was_empty = self.pending.is_empty();
        let start = v.max(self.f_last);
        let finish = start + (length as f64) / self.weight;
        self.f_last = finish;
        tracing::trace!(start, finish, "tagged packet");
        self.pending.push_back(QueuedPacket {
            arrival_time,
            length,
            weight_literal,
            finish_tag: finish,
        });
        (finish, was_empty)
    }

    /// Remove and return the head packet, for emission.
    pub fn pop_front(&mut self) -> Option<QueuedPacket> {
        self.pending.pop_front()
    }
}

/// Owns every channel in a growable arena, indexed by [`ChannelIndex`], plus a map
/// from connection-key to index so lookups are O(1) while references stay stable
/// across further insertions (§4.B, §9 "raw pointers" re-architecture).
#[derive(Debug, Default)]
pub struct ChannelTable {
    arena: Vec<Channel>,
    index_of: HashMap<ConnectionKey, ChannelIndex>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    /// Look up the channel for `key`, creating it (with index = arena length, default
    /// weight, empty FIFO, `F_last = 0`) if this is the first time `key` is seen.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn lookup_or_create(&mut self, key: &ConnectionKey) -> ChannelIndex {
        if let Some(&index) = self.index_of.get(key) {
            return index;
        }
        let index = ChannelIndex(self.arena.len());
        tracing::debug!(index = index.0, "new channel");
        self.arena.push(Channel::new(index, key.clone()));
        self.index_of.insert(key.clone(), index);
        index
    }

    #[inline]
    pub fn get(&self, index: ChannelIndex) -> &Channel {
        &self.arena[index.0]
    }

    #[inline]
    pub fn get_mut(&mut self, index: ChannelIndex) -> &mut Channel {
        &mut self.arena[index.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }
}
