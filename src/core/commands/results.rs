use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use super::InstanceId;

/// A value a plugin offers to others, bounded by age and read count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedResult {
    pub value: String,
    pub ttl: Duration,
    pub max_reads: u32,
}

impl SharedResult {
    pub fn new(value: impl Into<String>, ttl: Duration, max_reads: u32) -> Self {
        Self {
            value: value.into(),
            ttl,
            max_reads,
        }
    }
}

struct Slot {
    value: String,
    expires: Instant,
    reads_left: u32,
}

/// Cross-plugin blackboard keyed by the publishing instance.
#[derive(Default)]
pub struct ResultPool {
    slots: Mutex<HashMap<InstanceId, Slot>>,
}

impl ResultPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, id: InstanceId, result: SharedResult) {
        self.publish_at(id, result, Instant::now());
    }

    pub fn publish_at(&self, id: InstanceId, result: SharedResult, now: Instant) {
        if result.max_reads == 0 {
            return;
        }
        debug!(instance = %id, ttl = ?result.ttl, reads = result.max_reads, "result published");
        self.lock().insert(
            id,
            Slot {
                value: result.value,
                expires: now + result.ttl,
                reads_left: result.max_reads,
            },
        );
    }

    /// Reads a live result, consuming one of its reads.
    pub fn read(&self, id: InstanceId) -> Option<String> {
        self.read_at(id, Instant::now())
    }

    pub fn read_at(&self, id: InstanceId, now: Instant) -> Option<String> {
        let mut slots = self.lock();
        let slot = slots.get_mut(&id)?;
        if now >= slot.expires {
            slots.remove(&id);
            return None;
        }

        slot.reads_left -= 1;
        let value = slot.value.clone();
        if slot.reads_left == 0 {
            slots.remove(&id);
        }
        Some(value)
    }

    /// Drops expired results; returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|_, slot| now < slot.expires);
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<InstanceId, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
