//! Arena geometry and movement integration

use super::rules::{
    ARENA_HEIGHT, ARENA_WIDTH, MOVE_SPEED, PLAYER_RADIUS, WALL_BOTTOM, WALL_LEFT, WALL_RIGHT,
    WALL_TOP,
};
use super::world::Player;

/// Result of advancing one player by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved toward the target and still travelling
    Advanced,
    /// Snapped onto the target
    Arrived,
    /// Next step would enter the wall; movement stopped in place
    Blocked,
}

/// Physics system for player movement against the fixed arena
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Whether a player centred at (x, y) overlaps the wall, inflated by the player radius
    pub fn hits_wall(x: f32, y: f32) -> bool {
        x + PLAYER_RADIUS > WALL_LEFT
            && x - PLAYER_RADIUS < WALL_RIGHT
            && y + PLAYER_RADIUS > WALL_TOP
            && y - PLAYER_RADIUS < WALL_BOTTOM
    }

    /// Whether (x, y) lies inside the arena (edges inclusive)
    pub fn in_bounds(x: f32, y: f32) -> bool {
        (0.0..=ARENA_WIDTH).contains(&x) && (0.0..=ARENA_HEIGHT).contains(&y)
    }

    pub fn clamp_to_arena(x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, ARENA_WIDTH), y.clamp(0.0, ARENA_HEIGHT))
    }

    pub fn distance_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        dx * dx + dy * dy
    }

    /// Strict `< radius` test without a square root
    pub fn within(x1: f32, y1: f32, x2: f32, y2: f32, radius: f32) -> bool {
        Self::distance_sq(x1, y1, x2, y2) < radius * radius
    }

    /// Advance a moving player one tick toward its target.
    ///
    /// Hitting the wall stops movement outright (no sliding). The final
    /// position is always clamped into the arena.
    pub fn advance(player: &mut Player) -> StepOutcome {
        let dx = player.target_x - player.x;
        let dy = player.target_y - player.y;
        let distance = (dx * dx + dy * dy).sqrt();

        let outcome = if distance <= MOVE_SPEED {
            player.x = player.target_x;
            player.y = player.target_y;
            player.is_moving = false;
            StepOutcome::Arrived
        } else {
            let new_x = player.x + dx / distance * MOVE_SPEED;
            let new_y = player.y + dy / distance * MOVE_SPEED;
            if Self::hits_wall(new_x, new_y) {
                player.is_moving = false;
                StepOutcome::Blocked
            } else {
                player.x = new_x;
                player.y = new_y;
                StepOutcome::Advanced
            }
        };

        let (x, y) = Self::clamp_to_arena(player.x, player.y);
        player.x = x;
        player.y = y;
        outcome
    }
}
