use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::dispatch::job::{Job, Priority};

/// Lane a queued job currently resides in. Distinct from [`Priority`]: a
/// low-priority job promoted with `bring_forward` sits in the high lane while
/// keeping its own priority field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    High,
    Low,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::High => "high",
            Lane::Low => "low",
        }
    }
}

/// Result of a non-destructive head-of-line lookup.
#[derive(Debug, Clone)]
pub struct PeekInfo {
    pub job: Job,
    pub lane: Lane,
    /// Zero-based index of the job within its lane.
    pub position: usize,
}

/// Copy of the queue state at a single instant. Lane order is preserved;
/// inflight order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub high: Vec<Job>,
    pub low: Vec<Job>,
    pub inflight: Vec<Job>,
}

/// Two-lane priority queue with per-agent selection and inflight tracking.
///
/// The structure itself carries no locking. Callers share it behind a single
/// lock so each operation is atomic with respect to all others; no operation
/// here blocks or performs I/O.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    high: VecDeque<Job>,
    low: VecDeque<Job>,
    inflight: HashMap<String, Job>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the lane selected by its priority class and return
    /// the stored job.
    pub fn enqueue(&mut self, job: Job) -> Job {
        match job.priority {
            Priority::High => self.high.push_back(job.clone()),
            Priority::Low => self.low.push_back(job.clone()),
        }
        job
    }

    /// Claim the next job addressed to `agent`: the first match in the high
    /// lane, else the first match in low. The claimed job moves to the
    /// inflight table and keeps its original priority field.
    ///
    /// Pause state is not consulted here; gating a paused agent is the HTTP
    /// surface's duty.
    pub fn dequeue_for_agent(&mut self, agent: &str) -> Option<Job> {
        let job = Self::take_first(&mut self.high, agent)
            .or_else(|| Self::take_first(&mut self.low, agent))?;
        self.inflight.insert(job.id.clone(), job.clone());
        Some(job)
    }

    fn take_first(lane: &mut VecDeque<Job>, agent: &str) -> Option<Job> {
        let pos = lane.iter().position(|j| j.agent == agent)?;
        lane.remove(pos)
    }

    /// Retire an inflight job. Unknown ids are ignored so completion retries
    /// are safe. `ok` and `detail` are accepted for future metrics and not
    /// persisted.
    pub fn complete(&mut self, id: &str, _ok: bool, _detail: &str) {
        self.inflight.remove(id);
    }

    /// Copy both lanes and the inflight table.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            high: self.high.iter().cloned().collect(),
            low: self.low.iter().cloned().collect(),
            inflight: self.inflight.values().cloned().collect(),
        }
    }

    /// Drop every queued job addressed to `agent` from both lanes. Inflight
    /// jobs are untouched. Returns the number of jobs removed.
    pub fn cancel_queued_for_agent(&mut self, agent: &str) -> usize {
        let before = self.queued_len();
        self.high.retain(|j| j.agent != agent);
        self.low.retain(|j| j.agent != agent);
        before - self.queued_len()
    }

    /// Locate the head-for-agent job without removing it: the lowest-index
    /// match in high, else the lowest-index match in low.
    pub fn peek_for_agent(&self, agent: &str) -> Option<PeekInfo> {
        if let Some(pos) = self.high.iter().position(|j| j.agent == agent) {
            return Some(PeekInfo {
                job: self.high[pos].clone(),
                lane: Lane::High,
                position: pos,
            });
        }
        if let Some(pos) = self.low.iter().position(|j| j.agent == agent) {
            return Some(PeekInfo {
                job: self.low[pos].clone(),
                lane: Lane::Low,
                position: pos,
            });
        }
        None
    }

    /// Defer the head-for-agent job to the tail of its current lane.
    ///
    /// Returns whether a job moved. A sole matching job lands back where it
    /// was and still reports `true`.
    pub fn skip_next_for_agent(&mut self, agent: &str) -> bool {
        for lane in [&mut self.high, &mut self.low] {
            if let Some(pos) = lane.iter().position(|j| j.agent == agent) {
                if let Some(job) = lane.remove(pos) {
                    lane.push_back(job);
                }
                return true;
            }
        }
        false
    }

    /// Promote the head-for-agent job to the front of the high lane. A match
    /// found in low crosses lanes; its own priority field is not rewritten,
    /// location alone decides dispatch order.
    pub fn bring_forward_for_agent(&mut self, agent: &str) -> bool {
        if let Some(pos) = self.high.iter().position(|j| j.agent == agent) {
            if let Some(job) = self.high.remove(pos) {
                self.high.push_front(job);
            }
            return true;
        }
        if let Some(pos) = self.low.iter().position(|j| j.agent == agent) {
            if let Some(job) = self.low.remove(pos) {
                self.high.push_front(job);
            }
            return true;
        }
        false
    }

    /// Number of jobs waiting in either lane.
    pub fn queued_len(&self) -> usize {
        self.high.len() + self.low.len()
    }

    /// Number of jobs handed out but not yet completed.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty() && self.inflight.is_empty()
    }
}
