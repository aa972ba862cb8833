//! Client intents and their validation against the world

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::chat;
use super::combat::{resolve_attack, HitResult};
use super::physics::PhysicsSystem;
use super::rules::{CHAT_MAX_CHARS, GAME_EVENT_TARGET};
use super::world::{GameState, TeamMessage};

/// A player action, decoded at the transport boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Start travelling toward (x, y)
    Move { x: f32, y: f32 },
    /// Melee the closest enemy in range
    Attack,
    /// Post to the team chat
    Chat { message: String },
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Move { .. } => "move",
            Intent::Attack => "attack",
            Intent::Chat { .. } => "chat",
        }
    }
}

/// Why an intent was ignored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentRejection {
    #[error("unknown player")]
    UnknownPlayer,

    #[error("player is dead")]
    PlayerDead,

    #[error("game has ended")]
    GameEnded,

    #[error("Cannot move to target: position out of bounds")]
    OutOfBounds,

    #[error("Cannot move to target: position blocked by wall")]
    BlockedByWall,

    #[error("chat message must be between 1 and 200 characters")]
    InvalidChat,
}

impl IntentRejection {
    /// Only move rejections are reported back to the client
    pub fn notifies_client(&self) -> bool {
        matches!(self, Self::OutOfBounds | Self::BlockedByWall)
    }
}

/// What an accepted intent did
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    MoveStarted,
    Attacked(Option<HitResult>),
    ChatPosted,
}

/// Validate and apply one intent for `player_id`.
///
/// Rejections leave the world untouched.
pub fn apply(
    state: &mut GameState,
    player_id: &str,
    intent: Intent,
    now: u64,
) -> Result<Applied, IntentRejection> {
    let player = state
        .players
        .get(player_id)
        .ok_or(IntentRejection::UnknownPlayer)?;
    if !player.is_alive {
        return Err(IntentRejection::PlayerDead);
    }

    match intent {
        Intent::Move { x, y } => {
            if state.game_ended {
                return Err(IntentRejection::GameEnded);
            }
            if !PhysicsSystem::in_bounds(x, y) {
                return Err(IntentRejection::OutOfBounds);
            }
            if PhysicsSystem::hits_wall(x, y) {
                return Err(IntentRejection::BlockedByWall);
            }

            let player = state
                .players
                .get_mut(player_id)
                .ok_or(IntentRejection::UnknownPlayer)?;
            info!(
                target: GAME_EVENT_TARGET,
                event = "player_moved",
                player_id = %player.id,
                from_x = player.x,
                from_y = player.y,
                to_x = x,
                to_y = y,
            );
            player.target_x = x;
            player.target_y = y;
            player.is_moving = true;
            Ok(Applied::MoveStarted)
        }
        Intent::Attack => {
            if state.game_ended {
                return Err(IntentRejection::GameEnded);
            }
            let hit = resolve_attack(&mut state.players, &mut state.flags, player_id, now);
            if hit.is_none() {
                debug!(player_id, "attack found no target");
            }
            Ok(Applied::Attacked(hit))
        }
        Intent::Chat { message } => {
            let len = message.chars().count();
            if len == 0 || len > CHAT_MAX_CHARS {
                return Err(IntentRejection::InvalidChat);
            }
            info!(
                target: GAME_EVENT_TARGET,
                event = "team_chat",
                player_id = %player.id,
                team = %player.team,
                name = %player.name,
                message = %message,
            );
            let entry = TeamMessage {
                sender: player.name.clone(),
                message,
                timestamp: now,
                team: player.team,
            };
            chat::push(&mut state.chat, entry);
            Ok(Applied::ChatPosted)
        }
    }
}
