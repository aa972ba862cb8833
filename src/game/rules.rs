//! Fixed arena and match rules

/// Arena width (x in [0, ARENA_WIDTH])
pub const ARENA_WIDTH: f32 = 800.0;
/// Arena height (y in [0, ARENA_HEIGHT])
pub const ARENA_HEIGHT: f32 = 600.0;

// Central wall obstacle
pub const WALL_LEFT: f32 = 350.0;
pub const WALL_RIGHT: f32 = 450.0;
pub const WALL_TOP: f32 = 250.0;
pub const WALL_BOTTOM: f32 = 350.0;

/// Player collision radius used against the wall
pub const PLAYER_RADIUS: f32 = 15.0;

/// Movement speed in units per tick
pub const MOVE_SPEED: f32 = 5.0;

pub const RED_SPAWN: (f32, f32) = (50.0, 300.0);
pub const BLUE_SPAWN: (f32, f32) = (750.0, 300.0);

pub const RED_FLAG_BASE: (f32, f32) = (100.0, 300.0);
pub const BLUE_FLAG_BASE: (f32, f32) = (700.0, 300.0);

/// Scoring zone vertical band, shared by both bases (exclusive bounds)
pub const SCORE_ZONE_TOP: f32 = 250.0;
pub const SCORE_ZONE_BOTTOM: f32 = 350.0;
/// Red scores with x below this
pub const RED_SCORE_ZONE_MAX_X: f32 = 100.0;
/// Blue scores with x above this
pub const BLUE_SCORE_ZONE_MIN_X: f32 = 700.0;

/// Flag pickup / recovery radius
pub const FLAG_RADIUS: f32 = 10.0;
/// Melee attack range
pub const ATTACK_RANGE: f32 = 50.0;

pub const RESPAWN_DELAY_MS: u64 = 5_000;
pub const SPAWN_PROTECTION_MS: u64 = 3_000;
/// A dropped flag returns home once it has been on the ground longer than this
pub const FLAG_RETURN_MS: u64 = 30_000;

/// Messages are kept while younger than this
pub const CHAT_RETENTION_MS: u64 = 60_000;
pub const CHAT_HISTORY_LEN: usize = 10;
/// Max chat length in characters
pub const CHAT_MAX_CHARS: usize = 200;

/// Match length (15 minutes)
pub const GAME_DURATION_MS: u64 = 900_000;
/// First team to this score wins
pub const SCORE_CAP: u32 = 10;

pub const RED_COLOR: &str = "#ff0000";
pub const BLUE_COLOR: &str = "#0000ff";

/// tracing target for gameplay events
pub const GAME_EVENT_TARGET: &str = "game_event";
