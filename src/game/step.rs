//! Per-tick simulation step

use tracing::info;

use super::chat;
use super::flags;
use super::physics::PhysicsSystem;
use super::rules::{GAME_EVENT_TARGET, SCORE_CAP, SPAWN_PROTECTION_MS};
use super::world::{GameState, Player, Team, Winner};
use crate::util::time::elapsed_since;

/// Advance the world by one tick at timestamp `now`.
///
/// Once the game has ended, respawns, movement and flag logic are frozen;
/// the clock and chat pruning keep running.
pub fn run_tick(state: &mut GameState, now: u64) {
    if !state.game_ended {
        let GameState {
            players,
            flags,
            scores,
            ..
        } = state;

        for player in players.values_mut() {
            respawn_if_due(player, now);

            if player.is_alive && player.is_moving {
                PhysicsSystem::advance(player);
                flags::interact(player, flags, scores);
            }
        }
    }

    state.game_time = now;

    chat::prune(&mut state.chat, now);

    if !state.game_ended {
        flags::return_expired(&mut state.flags, now);
        check_game_end(state, now);
    }
}

fn respawn_if_due(player: &mut Player, now: u64) {
    let Some(respawn_at) = player.respawn_at else {
        return;
    };
    if player.is_alive || now < respawn_at {
        return;
    }

    let (x, y) = player.team.spawn_point();
    player.x = x;
    player.y = y;
    player.target_x = x;
    player.target_y = y;
    player.is_moving = false;
    player.is_alive = true;
    player.has_flag = false;
    player.respawn_at = None;
    player.spawn_protection = now + SPAWN_PROTECTION_MS;
}

/// Timer expiry decides by score; reaching the score cap overrides it
fn check_game_end(state: &mut GameState, now: u64) {
    if state.game_ended {
        return;
    }

    let mut winner = None;
    if elapsed_since(state.game_start_time, now) >= state.game_duration {
        winner = Some(match state.scores.red.cmp(&state.scores.blue) {
            std::cmp::Ordering::Greater => Winner::Red,
            std::cmp::Ordering::Less => Winner::Blue,
            std::cmp::Ordering::Equal => Winner::Tie,
        });
    }
    if let Some(team) = [Team::Red, Team::Blue]
        .into_iter()
        .find(|team| state.scores.get(*team) >= SCORE_CAP)
    {
        winner = Some(Winner::from(team));
    }

    if let Some(winner) = winner {
        state.end(winner);
        info!(
            target: GAME_EVENT_TARGET,
            event = "game_ended",
            winner = ?winner,
            red_score = state.scores.red,
            blue_score = state.scores.blue,
        );
    }
}
