//! Live sessions, their bound players and the used-name set

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};
use uuid::Uuid;

use super::rules::GAME_EVENT_TARGET;
use super::world::{GameState, Player, PlayerId, Team};

/// Server-assigned connection identifier
pub type SessionId = Uuid;

/// A pre-serialized outbound text frame, shared between sessions
pub type Frame = Arc<str>;

/// Why a join was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Player name '{0}' is already taken")]
    NameTaken(String),

    #[error("Player name must not be empty")]
    EmptyName,

    #[error("Player id '{0}' is already in use")]
    PlayerIdTaken(PlayerId),

    #[error("Session has already joined")]
    AlreadyJoined,

    #[error("Unknown session")]
    UnknownSession,
}

/// Why a frame could not be queued for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The writer is behind; this frame is skipped
    Lagging,
    /// The writer is gone; the session must be torn down
    Closed,
}

/// One live connection
#[derive(Debug)]
pub struct Session {
    outbound: mpsc::Sender<Frame>,
    player_id: Option<PlayerId>,
}

/// Outcome of tearing a session down
#[derive(Debug)]
pub struct Departure {
    /// The player removed from the world, if the session had joined
    pub player: Option<Player>,
}

/// Registry of live sessions. Mutated only from the hub's turn.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    player_sessions: HashMap<PlayerId, SessionId>,
    used_names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly connected, not yet joined session
    pub fn register(&mut self, session: SessionId, outbound: mpsc::Sender<Frame>) {
        self.sessions.insert(
            session,
            Session {
                outbound,
                player_id: None,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// The player bound to `session`, if it has joined
    pub fn player_for(&self, session: &SessionId) -> Option<&PlayerId> {
        self.sessions.get(session)?.player_id.as_ref()
    }

    /// Bind a new player to `session` and spawn it into the world
    pub fn join(
        &mut self,
        world: &mut GameState,
        session: SessionId,
        player_id: PlayerId,
        team: Team,
        name: String,
        now: u64,
    ) -> Result<(), JoinError> {
        let entry = self
            .sessions
            .get(&session)
            .ok_or(JoinError::UnknownSession)?;
        if entry.player_id.is_some() {
            return Err(JoinError::AlreadyJoined);
        }
        if name.trim().is_empty() {
            return Err(JoinError::EmptyName);
        }
        if self.used_names.contains(&name) {
            return Err(JoinError::NameTaken(name));
        }
        if self.player_sessions.contains_key(&player_id) || world.players.contains_key(&player_id)
        {
            return Err(JoinError::PlayerIdTaken(player_id));
        }

        self.used_names.insert(name.clone());
        self.player_sessions.insert(player_id.clone(), session);
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.player_id = Some(player_id.clone());
        }

        info!(
            target: GAME_EVENT_TARGET,
            event = "player_joined",
            player_id = %player_id,
            team = %team,
            name = %name,
        );
        world
            .players
            .insert(player_id.clone(), Player::spawn(player_id, name, team, now));
        Ok(())
    }

    /// Remove `session`, freeing its name and dropping any flag its player held.
    ///
    /// Returns `None` if the session was already gone.
    pub fn unregister(
        &mut self,
        world: &mut GameState,
        session: SessionId,
        now: u64,
    ) -> Option<Departure> {
        let entry = self.sessions.remove(&session)?;
        let Some(player_id) = entry.player_id else {
            debug!(session_id = %session, "unjoined session closed");
            return Some(Departure { player: None });
        };

        self.player_sessions.remove(&player_id);
        let player = world.players.remove(&player_id);
        if let Some(player) = &player {
            self.used_names.remove(&player.name);
            if let Some(flag_team) = world.flags.drop_carried_by(&player.id, now) {
                info!(
                    target: GAME_EVENT_TARGET,
                    event = "flag_dropped",
                    player_id = %player.id,
                    flag_team = %flag_team,
                );
            }
            info!(
                target: GAME_EVENT_TARGET,
                event = "player_left",
                player_id = %player.id,
                team = %player.team,
                name = %player.name,
            );
        }

        Some(Departure { player })
    }

    /// Queue a frame for one session without waiting
    pub fn send_to(&self, session: &SessionId, frame: Frame) -> Result<(), SendFailure> {
        let entry = self.sessions.get(session).ok_or(SendFailure::Closed)?;
        entry.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Lagging,
            TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

#[cfg(test)]
impl Registry {
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.used_names.contains(name)
    }
}
