use crate::ids::{ConnId, JobId, Priority};
use std::collections::{HashMap, HashSet, VecDeque};

/// Per-function bookkeeping: the workers able to perform it, the workers
/// currently asleep waiting for it, its three priority queues, and an
/// optional queue-depth ceiling set via the `maxqueue` admin command.
#[derive(Debug, Default)]
pub struct FunctionEntry {
    /// Connections that have sent `CAN_DO` for this function and not since
    /// `CANT_DO`'d or disconnected.
    pub capable_workers: HashSet<ConnId>,
    /// Workers that sent `PRE_SLEEP` and have nothing to do, in the order
    /// they fell asleep. Woken (and removed) in that order.
    pub sleeping: VecDeque<ConnId>,
    /// Unassigned job ids, one queue per priority tier.
    pub high: VecDeque<JobId>,
    /// See `high`.
    pub normal: VecDeque<JobId>,
    /// See `high`.
    pub low: VecDeque<JobId>,
    /// Ceiling on total queued (not yet assigned) jobs, set by `maxqueue`.
    /// `None` means unbounded.
    pub max_queue: Option<usize>,
}

impl FunctionEntry {
    /// Total jobs currently queued (not yet handed to a worker) across all
    /// three priority tiers.
    pub fn queued_count(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    fn queue_mut(&mut self, priority: Priority) -> &mut VecDeque<JobId> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    /// Push a job to the back of its priority tier's queue, honoring
    /// `max_queue`. Returns `false` (and does not enqueue) if the ceiling
    /// would be exceeded.
    pub fn enqueue(&mut self, priority: Priority, job: JobId) -> bool {
        if let Some(limit) = self.max_queue {
            if self.queued_count() >= limit {
                return false;
            }
        }
        self.queue_mut(priority).push_back(job);
        true
    }

    /// Push a job to the *front* of its priority tier's queue. Used when a
    /// worker holding a job disconnects or crashes: the job is re-queued
    /// ahead of jobs that arrived after it, so already-waiting clients are
    /// not starved by newer submissions.
    pub fn requeue_at_head(&mut self, priority: Priority, job: JobId) {
        self.queue_mut(priority).push_front(job);
    }

    /// Remove a specific still-queued job from its priority tier's queue,
    /// e.g. when the client that owns it disconnects before it is ever
    /// assigned. Returns whether the job was found.
    pub fn remove_queued(&mut self, priority: Priority, job: JobId) -> bool {
        let queue = self.queue_mut(priority);
        let before = queue.len();
        queue.retain(|&j| j != job);
        queue.len() != before
    }

    /// Pop the next job in strict-priority, FIFO-within-tier order.
    pub fn dequeue_next(&mut self) -> Option<JobId> {
        for priority in Priority::ALL {
            if let Some(job) = self.queue_mut(priority).pop_front() {
                return Some(job);
            }
        }
        None
    }

    /// True if this entry has no capable workers, no sleepers and no
    /// queued jobs, and so can be dropped from the registry entirely.
    pub fn is_empty(&self) -> bool {
        self.capable_workers.is_empty()
            && self.sleeping.is_empty()
            && self.high.is_empty()
            && self.normal.is_empty()
            && self.low.is_empty()
    }
}

/// All registered functions, keyed by name.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    /// Get or create the entry for `name`.
    pub fn entry(&mut self, name: &str) -> &mut FunctionEntry {
        self.functions.entry(name.to_string()).or_default()
    }

    /// Look up an existing entry without creating one.
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    /// Look up an existing entry mutably without creating one.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FunctionEntry> {
        self.functions.get_mut(name)
    }

    /// Remove `name`'s entry if it has become empty, so the registry does
    /// not accumulate entries for functions nobody cares about anymore.
    pub fn prune_if_empty(&mut self, name: &str) {
        if self.functions.get(name).map_or(false, FunctionEntry::is_empty) {
            self.functions.remove(name);
        }
    }

    /// Iterate all registered function names and their entries, for the
    /// `status` and `workers` admin commands.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionEntry)> {
        self.functions.iter()
    }

    /// Remove `conn` from every function's capability and sleeping sets,
    /// returning the names of any functions whose entries should be
    /// examined for pruning afterward.
    pub fn forget_connection(&mut self, conn: ConnId) -> Vec<String> {
        let mut touched = Vec::new();
        for (name, entry) in self.functions.iter_mut() {
            let was_capable = entry.capable_workers.remove(&conn);
            entry.sleeping.retain(|&c| c != conn);
            if was_capable {
                touched.push(name.clone());
            }
        }
        touched
    }
}
