//! Authoritative world model
//!
//! Pure data plus the invariants that tie it together. All mutation happens
//! from the hub's turn (an applied intent or a tick).

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::rules::{
    BLUE_COLOR, BLUE_FLAG_BASE, BLUE_SPAWN, GAME_DURATION_MS, RED_COLOR, RED_FLAG_BASE, RED_SPAWN,
    SPAWN_PROTECTION_MS,
};

/// Opaque client-chosen player identifier
pub type PlayerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    pub fn spawn_point(self) -> (f32, f32) {
        match self {
            Team::Red => RED_SPAWN,
            Team::Blue => BLUE_SPAWN,
        }
    }

    pub fn flag_base(self) -> (f32, f32) {
        match self {
            Team::Red => RED_FLAG_BASE,
            Team::Blue => BLUE_FLAG_BASE,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Team::Red => RED_COLOR,
            Team::Blue => BLUE_COLOR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Red,
    Blue,
    Tie,
}

impl From<Team> for Winner {
    fn from(team: Team) -> Self {
        match team {
            Team::Red => Winner::Red,
            Team::Blue => Winner::Blue,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub color: &'static str,

    // Position and movement
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub is_moving: bool,

    // Life cycle
    pub is_alive: bool,
    /// Set while dead
    #[serde(rename = "respawnTime")]
    pub respawn_at: Option<u64>,
    /// Cannot be eliminated while `now < spawn_protection`
    pub spawn_protection: u64,

    pub has_flag: bool,
}

impl Player {
    /// A freshly joined player at its team spawn with initial protection
    pub fn spawn(id: PlayerId, name: String, team: Team, now: u64) -> Self {
        let (x, y) = team.spawn_point();
        Self {
            id,
            name,
            team,
            color: team.color(),
            x,
            y,
            target_x: x,
            target_y: y,
            is_moving: false,
            is_alive: true,
            respawn_at: None,
            spawn_protection: now + SPAWN_PROTECTION_MS,
            has_flag: false,
        }
    }

    pub fn is_protected(&self, now: u64) -> bool {
        now < self.spawn_protection
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub is_at_base: bool,
    pub carrier: Option<PlayerId>,
    /// Set while the flag lies on the ground away from base
    pub drop_time: Option<u64>,
}

impl Flag {
    pub fn at_base(team: Team) -> Self {
        let (x, y) = team.flag_base();
        Self {
            team,
            x,
            y,
            is_at_base: true,
            carrier: None,
            drop_time: None,
        }
    }

    /// Snap back home, clearing carrier and drop state
    pub fn reset(&mut self) {
        *self = Self::at_base(self.team);
    }

    pub fn is_carried_by(&self, player_id: &str) -> bool {
        self.carrier.as_deref() == Some(player_id)
    }

    /// Leave the flag where it is, uncarried, starting the return timer
    pub fn drop_at_current(&mut self, now: u64) {
        self.carrier = None;
        self.is_at_base = false;
        self.drop_time = Some(now);
    }

    pub fn is_dropped(&self) -> bool {
        !self.is_at_base && self.carrier.is_none()
    }
}

/// Both team flags
#[derive(Debug, Clone, Serialize)]
pub struct Flags {
    #[serde(rename = "redFlag")]
    pub red: Flag,
    #[serde(rename = "blueFlag")]
    pub blue: Flag,
}

impl Flags {
    pub fn new() -> Self {
        Self {
            red: Flag::at_base(Team::Red),
            blue: Flag::at_base(Team::Blue),
        }
    }

    pub fn get_mut(&mut self, team: Team) -> &mut Flag {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Flag> {
        [&mut self.red, &mut self.blue].into_iter()
    }

    /// Drop any flag held by `player_id` in place. Returns the dropped flag's team.
    pub fn drop_carried_by(&mut self, player_id: &str, now: u64) -> Option<Team> {
        let mut dropped = None;
        for flag in self.iter_mut() {
            if flag.is_carried_by(player_id) {
                flag.drop_at_current(now);
                dropped = Some(flag.team);
            }
        }
        dropped
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Scores {
    #[serde(rename = "redScore")]
    pub red: u32,
    #[serde(rename = "blueScore")]
    pub blue: u32,
}

impl Scores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    pub fn increment(&mut self, team: Team) -> u32 {
        let score = match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        };
        *score += 1;
        *score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMessage {
    pub sender: String,
    pub message: String,
    pub timestamp: u64,
    pub team: Team,
}

/// Per-team chat logs, oldest first
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatLogs {
    #[serde(rename = "redTeamMessages")]
    pub red: VecDeque<TeamMessage>,
    #[serde(rename = "blueTeamMessages")]
    pub blue: VecDeque<TeamMessage>,
}

impl ChatLogs {
    pub fn get_mut(&mut self, team: Team) -> &mut VecDeque<TeamMessage> {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }
}

/// The aggregate root broadcast to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: HashMap<PlayerId, Player>,
    #[serde(flatten)]
    pub flags: Flags,
    #[serde(flatten)]
    pub scores: Scores,
    /// Timestamp of the latest tick
    pub game_time: u64,
    pub game_started: bool,
    pub game_start_time: u64,
    pub game_duration: u64,
    pub game_ended: bool,
    pub winner: Option<Winner>,
    #[serde(flatten)]
    pub chat: ChatLogs,
}

impl GameState {
    pub fn new(now: u64) -> Self {
        Self {
            players: HashMap::new(),
            flags: Flags::new(),
            scores: Scores::default(),
            game_time: now,
            game_started: true,
            game_start_time: now,
            game_duration: GAME_DURATION_MS,
            game_ended: false,
            winner: None,
            chat: ChatLogs::default(),
        }
    }

    /// Finish the match with the given outcome
    pub fn end(&mut self, winner: Winner) {
        self.game_ended = true;
        self.winner = Some(winner);
    }
}
