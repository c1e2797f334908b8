//! Ball and paddle physics. Pure state and arithmetic, no I/O.
//!
//! Units are pixels and ticks: velocities are pixels per tick, so one call
//! to [`advance_ball`] with `dt = 1.0` is one 60 Hz frame.

use rand::Rng;
use rally_protocol::{BallView, Side};

use crate::MatchConfig;

/// The ball. `resetting` is set between a point and the next serve so the
/// same crossing can never score twice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub radius: f64,
    pub resetting: bool,
}

impl Ball {
    /// A ball at the centre of the arena with a random diagonal serve.
    pub fn serve<R: Rng + ?Sized>(config: &MatchConfig, rng: &mut R) -> Self {
        let mut ball = Self {
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy: 0.0,
            radius: config.ball_radius,
            resetting: false,
        };
        ball.recentre(config, rng);
        ball
    }

    /// Puts the ball back in the centre with a fresh random direction and
    /// clears `resetting`.
    pub fn recentre<R: Rng + ?Sized>(&mut self, config: &MatchConfig, rng: &mut R) {
        self.x = config.arena_width / 2.0;
        self.y = config.arena_height / 2.0;
        self.dx = config.serve_speed_x * random_sign(rng);
        self.dy = config.serve_speed_y * random_sign(rng);
        self.resetting = false;
    }

    pub fn speed(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn view(&self) -> BallView {
        BallView {
            x: self.x,
            y: self.y,
            dx: self.dx,
            dy: self.dy,
        }
    }
}

fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    if rng.random_bool(0.5) { -1.0 } else { 1.0 }
}

/// One player's paddle. `y` is the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub dy: f64,
}

impl Paddle {
    /// A stationary paddle for `side`, centred vertically.
    pub fn new(side: Side, config: &MatchConfig) -> Self {
        let x = match side {
            Side::Left => config.left_paddle_x,
            Side::Right => config.right_paddle_x(),
        };
        Self {
            x,
            y: config.arena_height / 2.0 - config.paddle_height / 2.0,
            width: config.paddle_width,
            height: config.paddle_height,
            dy: 0.0,
        }
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Applies the paddle's velocity, clamped to `[0, max_y]`.
    pub fn integrate(&mut self, max_y: f64) {
        self.y = (self.y + self.dy).clamp(0.0, max_y);
    }
}

/// Moves the ball by `dt` ticks of velocity and reflects it off the top and
/// bottom walls.
///
/// A wall contact clamps the ball inside the arena and forces `dy` to point
/// away from that wall, so a ball still overlapping the wall next tick
/// cannot flip back. Returns `true` when the vertical direction changed.
pub fn advance_ball(ball: &mut Ball, arena_height: f64, dt: f64) -> bool {
    let prev_dy = ball.dy;
    ball.x += ball.dx * dt;
    ball.y += ball.dy * dt;

    if ball.y - ball.radius <= 0.0 {
        ball.y = ball.radius;
        ball.dy = ball.dy.abs();
    } else if ball.y + ball.radius >= arena_height {
        ball.y = arena_height - ball.radius;
        ball.dy = -ball.dy.abs();
    }

    prev_dy != 0.0 && prev_dy.signum() != ball.dy.signum()
}

/// Circle-vs-rectangle test: the closest point of the paddle to the ball
/// centre lies within the ball's radius.
pub fn paddle_collision(ball: &Ball, paddle: &Paddle) -> bool {
    let closest_x = ball.x.clamp(paddle.x, paddle.x + paddle.width);
    let closest_y = ball.y.clamp(paddle.y, paddle.y + paddle.height);
    let dx = ball.x - closest_x;
    let dy = ball.y - closest_y;
    dx * dx + dy * dy <= ball.radius * ball.radius
}

/// Adds spin proportional to where the ball met the paddle, then caps the
/// speed at `max_speed` without changing direction.
pub fn apply_hit_spin(ball: &mut Ball, paddle: &Paddle, spin_factor: f64, max_speed: f64) {
    let offset = ball.y - paddle.center_y();
    ball.dy += offset * spin_factor;

    let speed = ball.speed();
    if speed > max_speed {
        let scale = max_speed / speed;
        ball.dx *= scale;
        ball.dy *= scale;
    }
}

/// Resolves a confirmed hit on `side`'s paddle: pushes the ball just past
/// the paddle face, sends it back across the court and applies spin.
pub fn deflect(ball: &mut Ball, paddle: &Paddle, side: Side, config: &MatchConfig) {
    match side {
        Side::Left => {
            ball.x = paddle.x + paddle.width + ball.radius + 1.0;
            ball.dx = ball.dx.abs();
        }
        Side::Right => {
            ball.x = paddle.x - ball.radius - 1.0;
            ball.dx = -ball.dx.abs();
        }
    }
    apply_hit_spin(ball, paddle, config.spin_factor, config.max_ball_speed);
}

/// The side that wins a point if the ball has fully left the arena.
pub fn scoring_side(ball: &Ball, arena_width: f64) -> Option<Side> {
    if ball.x + ball.radius < 0.0 {
        Some(Side::Right)
    } else if ball.x - ball.radius > arena_width {
        Some(Side::Left)
    } else {
        None
    }
}
