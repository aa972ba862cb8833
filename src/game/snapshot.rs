//! Snapshot encoding and fan-out to live sessions

use std::sync::Arc;

use tracing::{error, warn};

use super::registry::{Frame, Registry, SendFailure, SessionId};
use super::world::GameState;
use crate::ws::protocol::ServerMsg;

/// Encodes the world once per broadcast and pushes it to sessions
#[derive(Debug, Default)]
pub struct SnapshotBroadcaster {
    stats: SnapshotStats,
}

impl SnapshotBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the full state into a shareable frame
    pub fn encode(state: &GameState) -> Option<Frame> {
        match serde_json::to_string(state) {
            Ok(json) => Some(Arc::from(json)),
            Err(e) => {
                error!(error = %e, "Failed to serialize game state");
                None
            }
        }
    }

    /// Serialize a targeted server message
    pub fn encode_msg(msg: &ServerMsg) -> Option<Frame> {
        match serde_json::to_string(msg) {
            Ok(json) => Some(Arc::from(json)),
            Err(e) => {
                error!(error = %e, "Failed to serialize server message");
                None
            }
        }
    }

    /// Push the current state to every registered session.
    ///
    /// Returns the sessions whose writer has gone away; the caller tears them down.
    pub fn broadcast(&mut self, state: &GameState, registry: &Registry) -> Vec<SessionId> {
        if registry.is_empty() {
            return Vec::new();
        }
        let Some(frame) = Self::encode(state) else {
            return Vec::new();
        };
        self.stats.record(registry.len(), frame.len());

        let mut closed = Vec::new();
        for session in registry.session_ids() {
            match registry.send_to(session, frame.clone()) {
                Ok(()) => {}
                Err(SendFailure::Lagging) => {
                    warn!(session_id = %session, "Client lagging, skipping snapshot");
                }
                Err(SendFailure::Closed) => closed.push(*session),
            }
        }
        closed
    }

    /// Push the current state to a single session
    pub fn send_state(
        state: &GameState,
        registry: &Registry,
        session: &SessionId,
    ) -> Result<(), SendFailure> {
        match Self::encode(state) {
            Some(frame) => registry.send_to(session, frame),
            None => Ok(()),
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

/// Broadcast volume counters for debugging
#[derive(Debug, Default, Clone)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_sessions_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, session_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_sessions_per_snapshot =
            self.avg_sessions_per_snapshot * ((n - 1.0) / n) + (session_count as f32 / n);
    }
}
