//! Match rules, arena geometry and the match phase machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Geometry and rules shared by every match.
///
/// The defaults match the browser client's hardcoded canvas, so changing
/// the arena or paddle sizes needs a matching client build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub arena_width: f64,
    pub arena_height: f64,

    pub ball_radius: f64,
    /// Horizontal serve speed in pixels per tick.
    pub serve_speed_x: f64,
    /// Vertical serve speed in pixels per tick.
    pub serve_speed_y: f64,
    /// Upper bound on the ball's speed after a paddle hit.
    pub max_ball_speed: f64,

    pub paddle_width: f64,
    pub paddle_height: f64,
    /// Paddle speed in pixels per tick while a direction key is held.
    pub paddle_speed: f64,
    /// Left edge of the left paddle.
    pub left_paddle_x: f64,
    /// Distance from the right wall to the right paddle's left edge.
    pub right_paddle_inset: f64,

    /// Vertical velocity added per pixel of offset from the paddle centre.
    pub spin_factor: f64,

    /// First side to reach this score wins.
    pub max_score: u32,

    /// Whole seconds shown before the ball goes live.
    pub countdown_secs: u32,
    /// Ticks per countdown step (one second at 60 Hz).
    pub ticks_per_countdown_step: u32,

    /// Pause between a point and the next serve.
    pub reset_delay: Duration,

    /// A full `state` frame goes out every this many ticks.
    pub broadcast_every: u64,
}

impl MatchConfig {
    pub fn right_paddle_x(&self) -> f64 {
        self.arena_width - self.right_paddle_inset
    }

    /// Lowest y the top of a paddle may reach.
    pub fn max_paddle_y(&self) -> f64 {
        (self.arena_height - self.paddle_height).max(0.0)
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            arena_width: 1000.0,
            arena_height: 700.0,
            ball_radius: 10.0,
            serve_speed_x: 5.0,
            serve_speed_y: 3.0,
            max_ball_speed: 12.0,
            paddle_width: 15.0,
            paddle_height: 75.0,
            paddle_speed: 7.0,
            left_paddle_x: 10.0,
            right_paddle_inset: 20.0,
            spin_factor: 0.05,
            max_score: 11,
            countdown_secs: 10,
            ticks_per_countdown_step: 60,
            reset_delay: Duration::from_millis(400),
            broadcast_every: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// MatchPhase
// ---------------------------------------------------------------------------

/// Where a live match is in its lifecycle.
///
/// ```text
/// Playing ⇄ Paused
///    │
///    └──→ GameOver (terminal)
/// ```
///
/// The pre-serve countdown is not a phase of its own: a `Playing` match
/// with a non-zero countdown keeps the ball frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    Playing,
    Paused,
    GameOver,
}

impl MatchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver)
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::GameOver => write!(f, "gameOver"),
        }
    }
}
