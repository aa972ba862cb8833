//! Flag pickup, recovery, capture and auto-return

use tracing::info;

use super::physics::PhysicsSystem;
use super::rules::{
    BLUE_SCORE_ZONE_MIN_X, FLAG_RADIUS, FLAG_RETURN_MS, GAME_EVENT_TARGET, RED_SCORE_ZONE_MAX_X,
    SCORE_ZONE_BOTTOM, SCORE_ZONE_TOP,
};
use super::world::{Flags, Player, Scores, Team};
use crate::util::time::elapsed_since;

/// Whether (x, y) is inside `team`'s capture zone next to its home base
pub fn in_score_zone(team: Team, x: f32, y: f32) -> bool {
    let in_band = y > SCORE_ZONE_TOP && y < SCORE_ZONE_BOTTOM;
    match team {
        Team::Red => in_band && x < RED_SCORE_ZONE_MAX_X,
        Team::Blue => in_band && x > BLUE_SCORE_ZONE_MIN_X,
    }
}

/// Run the flag checks for a player that just moved, in fixed order:
/// pickup, recovery, capture, carried-flag position sync.
pub fn interact(player: &mut Player, flags: &mut Flags, scores: &mut Scores) {
    try_pickup(player, flags);
    try_recover(player, flags);
    try_capture(player, flags, scores);
    sync_carried(player, flags);
}

fn try_pickup(player: &mut Player, flags: &mut Flags) {
    if player.has_flag {
        return;
    }
    let enemy = flags.get_mut(player.team.opponent());
    if enemy.carrier.is_some() {
        return;
    }
    if PhysicsSystem::within(player.x, player.y, enemy.x, enemy.y, FLAG_RADIUS) {
        enemy.carrier = Some(player.id.clone());
        enemy.is_at_base = false;
        enemy.drop_time = None;
        player.has_flag = true;
        info!(
            target: GAME_EVENT_TARGET,
            event = "flag_picked_up",
            player_id = %player.id,
            team = %player.team,
            flag_team = %enemy.team,
        );
    }
}

fn try_recover(player: &Player, flags: &mut Flags) {
    let own = flags.get_mut(player.team);
    if !own.is_dropped() {
        return;
    }
    if PhysicsSystem::within(player.x, player.y, own.x, own.y, FLAG_RADIUS) {
        own.reset();
        info!(
            target: GAME_EVENT_TARGET,
            event = "flag_returned",
            player_id = %player.id,
            flag_team = %player.team,
        );
    }
}

fn try_capture(player: &mut Player, flags: &mut Flags, scores: &mut Scores) {
    if !player.has_flag || !in_score_zone(player.team, player.x, player.y) {
        return;
    }
    let captured = flags.get_mut(player.team.opponent());
    captured.reset();
    player.has_flag = false;
    scores.increment(player.team);
    info!(
        target: GAME_EVENT_TARGET,
        event = "flag_captured",
        player_id = %player.id,
        team = %player.team,
        flag_team = %player.team.opponent(),
        red_score = scores.red,
        blue_score = scores.blue,
    );
}

fn sync_carried(player: &Player, flags: &mut Flags) {
    for flag in flags.iter_mut() {
        if flag.is_carried_by(&player.id) {
            flag.x = player.x;
            flag.y = player.y;
        }
    }
}

/// Send flags that have been lying on the ground too long back home
pub fn return_expired(flags: &mut Flags, now: u64) {
    for flag in flags.iter_mut() {
        let Some(dropped_at) = flag.drop_time else {
            continue;
        };
        if flag.is_dropped() && elapsed_since(dropped_at, now) > FLAG_RETURN_MS {
            flag.reset();
            info!(target: GAME_EVENT_TARGET, event = "flag_auto_returned", flag_team = %flag.team);
        }
    }
}
