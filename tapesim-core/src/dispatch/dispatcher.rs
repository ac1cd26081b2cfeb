//! Historical dispatcher — merges independent feeds into one timeline.
//!
//! Each source advances on its own; the dispatcher keys a min-heap on every
//! source's next pending timestamp and always drains the earliest source up
//! to the runner-up's timestamp. Entries are re-keyed on every reinsertion
//! rather than mutated while queued, so the heap order is always honest.
//!
//! Termination: every loop iteration either permanently retires a source or
//! strictly advances the global minimum timestamp, and the source set is
//! finite.

use crate::dispatch::source::{EventSink, EventSource};
use crate::error::KernelError;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

/// Min-heap entry: inverted ordering over (timestamp, source slot), slot as
/// a deterministic tie-break.
struct HeapEntry {
    ts: DateTime<Utc>,
    slot: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.slot == other.slot
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.ts.cmp(&self.ts).then(other.slot.cmp(&self.slot))
    }
}

#[derive(Default)]
pub struct HistoricalDispatcher {
    sources: Vec<Box<dyn EventSource>>,
    /// Slots permanently removed from consideration (passive sources).
    retired: Vec<usize>,
    seeked: bool,
}

impl HistoricalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: Box<dyn EventSource>) {
        self.sources.push(source);
    }

    /// One-time pre-roll: discard events at or before `t` in every source.
    /// Sources left with nothing are retired before the run starts. Calls
    /// after the first are no-ops.
    pub fn seek_all_to(&mut self, t: DateTime<Utc>) {
        if self.seeked {
            return;
        }
        self.seeked = true;
        for (slot, source) in self.sources.iter_mut().enumerate() {
            if !source.seek_past(t) {
                debug!(slot, "source empty after seek, retiring");
                self.retired.push(slot);
            }
        }
    }

    /// The single control loop of the simulation. Delivers the union of all
    /// sources' events to `sink` in non-decreasing timestamp order and
    /// returns when every source is passive.
    pub fn run(&mut self, sink: &mut dyn EventSink) -> Result<(), KernelError> {
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        for (slot, source) in self.sources.iter().enumerate() {
            if self.retired.contains(&slot) {
                continue;
            }
            if let Some(ts) = source.next_pending() {
                heap.push(HeapEntry { ts, slot });
            }
        }

        while let Some(entry) = heap.pop() {
            let slot = entry.slot;
            let Some(runner_up) = heap.peek().map(|e| e.ts) else {
                // Single surviving source: drain it in one shot.
                self.sources[slot].drain_all(sink)?;
                return Ok(());
            };

            self.sources[slot].drain_until(runner_up, sink)?;

            match self.sources[slot].next_pending() {
                // Re-keyed reinsertion; the old entry is already gone.
                Some(ts) => heap.push(HeapEntry { ts, slot }),
                None => {
                    debug!(slot, "source exhausted, retiring");
                    self.retired.push(slot);
                }
            }

            if heap.len() == 1 {
                let last = heap.pop().expect("len checked");
                self.sources[last.slot].drain_all(sink)?;
                return Ok(());
            }
        }
        Ok(())
    }
}
