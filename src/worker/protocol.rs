//! Messages exchanged with the proof worker and the per-job state machine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ProofError;
use crate::merkle::{Hash32, LeafMode, MerkleTree, NodeHasher, ProofOutcome};

/// Correlation id attached to every job and echoed in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing job ids shared by all submitters of a worker.
#[derive(Debug)]
pub(crate) struct JobIdSource {
    next: AtomicU64,
}

impl JobIdSource {
    pub(crate) const fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    #[inline]
    pub(crate) fn fetch(&self) -> JobId {
        JobId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Inbound message: the full leaf set and the leaf to prove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub leaves: Vec<Hash32>,
    pub leaf: Hash32,
}

impl ProofRequest {
    pub fn new(leaves: Vec<Hash32>, leaf: Hash32) -> Self {
        Self { leaves, leaf }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, ProofError> {
        serde_json::from_str(raw).map_err(|e| ProofError::MalformedRequest(e.to_string()))
    }
}

/// Outbound message for job `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub id: JobId,
    pub result: Result<ProofOutcome, ProofError>,
}

impl ProofResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Lifecycle of one job inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Received,
    TreeBuilt,
    ProofExtracted,
    Responded,
    Failed,
}

impl JobState {
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Idle, Received)
                | (Received, TreeBuilt)
                | (Received, Failed)
                | (TreeBuilt, ProofExtracted)
                | (ProofExtracted, Responded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Responded | JobState::Failed)
    }
}

/// One job's walk through [`JobState`].
#[derive(Debug)]
pub(crate) struct JobRun {
    id: JobId,
    state: JobState,
}

impl JobRun {
    pub(crate) fn new(id: JobId) -> Self {
        Self {
            id,
            state: JobState::Idle,
        }
    }

    pub(crate) fn state(&self) -> JobState {
        self.state
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(job = %self.id, from = ?self.state, to = ?next, "job state");
        self.state = next;
    }

    /// Build the tree and extract the proof. Leaves the run in `ProofExtracted`
    /// or `Failed`.
    pub(crate) fn execute(
        &mut self,
        request: ProofRequest,
        hasher: &Arc<dyn NodeHasher>,
        mode: LeafMode,
    ) -> Result<ProofOutcome, ProofError> {
        self.advance(JobState::Received);
        let tree = match MerkleTree::build(&request.leaves, hasher.clone(), mode) {
            Ok(tree) => tree,
            Err(err) => {
                self.advance(JobState::Failed);
                return Err(err);
            }
        };
        self.advance(JobState::TreeBuilt);
        let outcome = tree.proof(&request.leaf);
        self.advance(JobState::ProofExtracted);
        Ok(outcome)
    }

    /// Record delivery of a successful response.
    pub(crate) fn responded(&mut self) {
        if self.state == JobState::ProofExtracted {
            self.advance(JobState::Responded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::Keccak256Hasher;

    fn keccak() -> Arc<dyn NodeHasher> {
        Arc::new(Keccak256Hasher)
    }

    #[test]
    fn job_ids_increase() {
        let ids = JobIdSource::new(5);
        assert_eq!(ids.fetch(), JobId(5));
        assert_eq!(ids.fetch(), JobId(6));
    }

    #[test]
    fn successful_job_walks_every_state() {
        let leaves: Vec<Hash32> = (1u8..=4).map(|n| Hash32([n; 32])).collect();
        let mut run = JobRun::new(JobId(1));
        assert_eq!(run.state(), JobState::Idle);

        let outcome = run
            .execute(ProofRequest::new(leaves.clone(), leaves[0]), &keccak(), LeafMode::Prehashed)
            .expect("proof");
        assert!(outcome.found());
        assert_eq!(run.state(), JobState::ProofExtracted);

        run.responded();
        assert_eq!(run.state(), JobState::Responded);
        assert!(run.state().is_terminal());
    }

    #[test]
    fn empty_leaf_set_fails_the_job() {
        let mut run = JobRun::new(JobId(2));
        let err = run
            .execute(ProofRequest::new(Vec::new(), Hash32([1; 32])), &keccak(), LeafMode::Prehashed)
            .expect_err("empty set");
        assert_eq!(err, ProofError::EmptyLeafSet);
        assert_eq!(run.state(), JobState::Failed);

        run.responded();
        assert_eq!(run.state(), JobState::Failed);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(!JobState::Idle.can_advance_to(JobState::TreeBuilt));
        assert!(!JobState::Responded.can_advance_to(JobState::Received));
        assert!(!JobState::TreeBuilt.can_advance_to(JobState::Failed));
    }

    #[test]
    fn request_wire_shape_uses_hex_strings() {
        let request = ProofRequest::new(vec![Hash32([0x11; 32])], Hash32([0x11; 32]));
        let json = request.to_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("value");
        assert_eq!(value["leaf"], format!("0x{}", "11".repeat(32)));
        assert_eq!(value["leaves"].as_array().map(Vec::len), Some(1));
        assert_eq!(ProofRequest::from_json(&json).expect("parse"), request);
    }

    #[test]
    fn malformed_request_is_reported() {
        let err = ProofRequest::from_json(r#"{"leaves":["0x12"],"leaf":"0x12"}"#)
            .expect_err("short hashes");
        assert!(matches!(err, ProofError::MalformedRequest(_)));
    }

    #[test]
    fn response_carries_job_id_and_result() {
        let response = ProofResponse {
            id: JobId(9),
            result: Err(ProofError::EmptyLeafSet),
        };
        let value: serde_json::Value =
            serde_json::from_str(&response.to_json().expect("json")).expect("value");
        assert_eq!(value["id"], 9);
        assert_eq!(value["result"]["Err"]["kind"], "empty_leaf_set");
    }
}
