use std::collections::BTreeMap;

use foundation::time::Time;

use crate::ease::Ease;

/// Delay, duration and easing of one timed transition.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Timing {
    pub delay_ms: f64,
    pub duration_ms: f64,
    pub ease: Ease,
}

impl Timing {
    pub const DEFAULT_DURATION_MS: f64 = 250.0;

    pub fn new(duration_ms: f64) -> Self {
        Self {
            delay_ms: 0.0,
            duration_ms,
            ease: Ease::default(),
        }
    }

    /// Completes on the first tick at or after scheduling.
    pub fn immediate() -> Self {
        Self::new(0.0)
    }

    pub fn with_delay(mut self, delay_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    /// Offset from scheduling time to completion.
    pub fn end_ms(&self) -> f64 {
        self.delay_ms.max(0.0) + self.duration_ms.max(0.0)
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION_MS)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId(pub u64);

/// Progress reported for one transition during [`Scheduler::advance`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Progress {
    /// Eased progress in `[0, 1]`.
    pub t: f64,
    /// `true` on the first tick after the delay elapsed.
    pub started: bool,
    /// `true` on the final tick; the entry is dropped afterwards.
    pub finished: bool,
}

#[derive(Debug)]
struct Entry<P> {
    id: TransitionId,
    start: Time,
    timing: Timing,
    running: bool,
    payload: P,
}

/// Cooperative scheduler of timed, cancellable transitions.
///
/// Each channel key holds at most one transition: scheduling on an occupied
/// key supersedes the running one. Due transitions are reported in
/// scheduling order, so ties at the same tick stay deterministic.
#[derive(Debug)]
pub struct Scheduler<K, P> {
    next_id: u64,
    entries: BTreeMap<K, Entry<P>>,
}

impl<K, P> Default for Scheduler<K, P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, P> Scheduler<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedules `payload` on `key`, returning the superseded payload if any.
    pub fn schedule(
        &mut self,
        now: Time,
        key: K,
        timing: Timing,
        payload: P,
    ) -> (TransitionId, Option<P>) {
        let id = TransitionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let entry = Entry {
            id,
            start: now.after(timing.delay_ms.max(0.0)),
            timing,
            running: false,
            payload,
        };
        let superseded = self.entries.insert(key, entry).map(|e| e.payload);
        (id, superseded)
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn payload(&self, key: &K) -> Option<&P> {
        self.entries.get(key).map(|e| &e.payload)
    }

    pub fn cancel(&mut self, key: &K) -> Option<P> {
        self.entries.remove(key).map(|e| e.payload)
    }

    /// Cancels every transition whose key matches `pred`; returns how many were dropped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !pred(k));
        before - self.entries.len()
    }

    /// Earliest start time among pending transitions.
    pub fn next_due(&self) -> Option<Time> {
        self.entries
            .values()
            .map(|e| e.start)
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Reports progress for every transition whose delay has elapsed at `now`.
    ///
    /// Finished transitions are removed after their callback. Returns the
    /// number of transitions that were reported.
    pub fn advance(&mut self, now: Time, mut on_progress: impl FnMut(&K, &mut P, Progress)) -> usize {
        let mut due: Vec<(TransitionId, K)> = self
            .entries
            .iter()
            .filter(|(_, e)| now.0 >= e.start.0)
            .map(|(k, e)| (e.id, k.clone()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, key) in &due {
            let Some(entry) = self.entries.get_mut(key) else {
                continue;
            };
            let duration = entry.timing.duration_ms.max(0.0);
            let raw = if duration <= 0.0 {
                1.0
            } else {
                (now.since(entry.start) / duration).clamp(0.0, 1.0)
            };
            let progress = Progress {
                t: entry.timing.ease.apply(raw),
                started: !entry.running,
                finished: raw >= 1.0,
            };
            entry.running = true;
            on_progress(key, &mut entry.payload, progress);
            if progress.finished {
                self.entries.remove(key);
            }
        }

        due.len()
    }
}
