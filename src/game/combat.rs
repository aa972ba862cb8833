//! Melee combat - target selection and elimination

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::info;

use super::physics::PhysicsSystem;
use super::rules::{ATTACK_RANGE, GAME_EVENT_TARGET, RESPAWN_DELAY_MS};
use super::world::{Flags, Player, PlayerId, Team};

/// Result of a resolved attack
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub attacker_id: PlayerId,
    pub target_id: PlayerId,
    pub distance_sq: f32,
    /// Team of the flag the target dropped, if any
    pub dropped_flag: Option<Team>,
}

/// Combat system for resolving attacks
pub struct CombatSystem;

impl CombatSystem {
    /// Whether `target` can currently be hit by `attacker`
    pub fn is_valid_target(attacker: &Player, target: &Player, now: u64) -> bool {
        target.id != attacker.id
            && target.team != attacker.team
            && target.is_alive
            && !target.is_protected(now)
            && PhysicsSystem::within(attacker.x, attacker.y, target.x, target.y, ATTACK_RANGE)
    }

    /// Pick the single target for an attack: closest first, lowest id on ties
    pub fn select_target<'a, I>(attacker: &Player, candidates: I, now: u64) -> Option<&'a Player>
    where
        I: IntoIterator<Item = &'a Player>,
    {
        candidates
            .into_iter()
            .filter(|target| Self::is_valid_target(attacker, target, now))
            .min_by(|a, b| {
                let da = PhysicsSystem::distance_sq(attacker.x, attacker.y, a.x, a.y);
                let db = PhysicsSystem::distance_sq(attacker.x, attacker.y, b.x, b.y);
                da.partial_cmp(&db)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// Mark `target` dead, start its respawn timer and drop any flag it holds
    pub fn eliminate(target: &mut Player, flags: &mut Flags, now: u64) -> Option<Team> {
        target.is_alive = false;
        target.is_moving = false;
        target.respawn_at = Some(now + RESPAWN_DELAY_MS);
        target.spawn_protection = 0;

        if target.has_flag {
            target.has_flag = false;
            return flags.drop_carried_by(&target.id, now);
        }
        None
    }
}

/// Resolve an attack by `attacker_id` against the current players.
///
/// At most one opponent is eliminated.
pub fn resolve_attack(
    players: &mut HashMap<PlayerId, Player>,
    flags: &mut Flags,
    attacker_id: &str,
    now: u64,
) -> Option<HitResult> {
    let attacker = players.get(attacker_id)?;
    let target = CombatSystem::select_target(attacker, players.values(), now)?;
    let distance_sq = PhysicsSystem::distance_sq(attacker.x, attacker.y, target.x, target.y);
    let target_id = target.id.clone();
    let attacker_id = attacker.id.clone();

    let target = players.get_mut(&target_id)?;
    let dropped_flag = CombatSystem::eliminate(target, flags, now);

    info!(
        target: GAME_EVENT_TARGET,
        event = "player_eliminated",
        player_id = %target.id,
        team = %target.team,
        eliminated_by = %attacker_id,
    );
    if let Some(flag_team) = dropped_flag {
        info!(
            target: GAME_EVENT_TARGET,
            event = "flag_dropped",
            player_id = %target.id,
            flag_team = %flag_team,
            x = target.x,
            y = target.y,
        );
    }

    Some(HitResult {
        attacker_id,
        target_id,
        distance_sq,
        dropped_flag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, team: Team, x: f32, y: f32) -> Player {
        let mut p = Player::spawn(id.into(), id.into(), team, 0);
        p.x = x;
        p.y = y;
        p.spawn_protection = 0;
        p
    }

    fn roster(players: Vec<Player>) -> HashMap<PlayerId, Player> {
        players.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn attack_eliminates_enemy_in_range() {
        let mut players = roster(vec![
            player("red", Team::Red, 200.0, 200.0),
            player("blue", Team::Blue, 230.0, 200.0),
        ]);
        let mut flags = Flags::new();

        let hit = resolve_attack(&mut players, &mut flags, "red", 10_000).unwrap();

        assert_eq!(hit.target_id, "blue");
        let blue = &players["blue"];
        assert!(!blue.is_alive);
        assert_eq!(blue.respawn_at, Some(10_000 + RESPAWN_DELAY_MS));
        assert_eq!(blue.spawn_protection, 0);
        assert!(players["red"].is_alive);
    }

    #[test]
    fn range_is_strict_and_teammates_are_ignored() {
        let mut players = roster(vec![
            player("red", Team::Red, 200.0, 200.0),
            player("mate", Team::Red, 210.0, 200.0),
            player("blue", Team::Blue, 250.0, 200.0),
        ]);
        let mut flags = Flags::new();

        assert!(resolve_attack(&mut players, &mut flags, "red", 10_000).is_none());
        assert!(players.values().all(|p| p.is_alive));
    }

    #[test]
    fn spawn_protection_blocks_elimination() {
        let mut players = roster(vec![
            player("red", Team::Red, 200.0, 200.0),
            player("blue", Team::Blue, 220.0, 200.0),
        ]);
        players.get_mut("blue").unwrap().spawn_protection = 10_001;
        let mut flags = Flags::new();

        assert!(resolve_attack(&mut players, &mut flags, "red", 10_000).is_none());
        assert!(resolve_attack(&mut players, &mut flags, "red", 10_001).is_some());
    }

    #[test]
    fn closest_target_wins_then_lowest_id() {
        let mut players = roster(vec![
            player("red", Team::Red, 200.0, 200.0),
            player("b-far", Team::Blue, 240.0, 200.0),
            player("b-near", Team::Blue, 220.0, 200.0),
        ]);
        let mut flags = Flags::new();
        let hit = resolve_attack(&mut players, &mut flags, "red", 10_000).unwrap();
        assert_eq!(hit.target_id, "b-near");
        assert!(players["b-far"].is_alive);

        let mut players = roster(vec![
            player("red", Team::Red, 200.0, 200.0),
            player("zed", Team::Blue, 200.0, 220.0),
            player("amy", Team::Blue, 200.0, 180.0),
        ]);
        let hit = resolve_attack(&mut players, &mut flags, "red", 10_000).unwrap();
        assert_eq!(hit.target_id, "amy");
        assert!(players["zed"].is_alive);
    }

    #[test]
    fn eliminated_carrier_drops_flag_in_place() {
        let mut players = roster(vec![
            player("red", Team::Red, 600.0, 300.0),
            player("blue", Team::Blue, 620.0, 300.0),
        ]);
        let mut flags = Flags::new();
        players.get_mut("blue").unwrap().has_flag = true;
        flags.red.carrier = Some("blue".into());
        flags.red.is_at_base = false;
        flags.red.x = 620.0;

        let hit = resolve_attack(&mut players, &mut flags, "red", 5_000).unwrap();

        assert_eq!(hit.dropped_flag, Some(Team::Red));
        assert!(!players["blue"].has_flag);
        assert!(flags.red.carrier.is_none());
        assert!(!flags.red.is_at_base);
        assert_eq!(flags.red.drop_time, Some(5_000));
        assert_eq!(flags.red.x, 620.0);
    }
}
