use parley_core::IceCandidate;
use std::collections::VecDeque;

/// Holds remote candidates that arrive before the remote description.
///
/// Once the remote description is applied the queue is flushed exactly once,
/// in arrival order, and later candidates pass straight through.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
    remote_applied: bool,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back if it can be applied now, otherwise keeps it.
    pub fn admit(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.remote_applied {
            return Some(candidate);
        }
        self.pending.push_back(candidate);
        None
    }

    /// Records that a remote description was applied and hands back whatever
    /// was queued. Only the first call returns anything.
    pub fn remote_applied(&mut self) -> Vec<IceCandidate> {
        self.remote_applied = true;
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
