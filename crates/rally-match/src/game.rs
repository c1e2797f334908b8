//! One live match: the per-tick state machine.
//!
//! A [`Match`] knows nothing about timers or connections. The engine calls
//! [`Match::tick`] at 60 Hz, turns the returned [`TickReport`] into
//! messages, and schedules the post-point [`Match::reset_ball`] itself.

use rand::Rng;
use rally_protocol::{
    BallView, ClientState, MatchId, PaddleView, PlayerId, ServerMessage, Side, SyncEvent,
};

use crate::physics::{self, Ball, Paddle};
use crate::{EndReason, MatchConfig, MatchError, MatchKind, MatchOutcome, MatchPhase, SideResult};

/// One player's side of the court.
#[derive(Debug, Clone)]
pub struct Slot {
    pub player: PlayerId,
    pub name: String,
    pub paddle: Paddle,
    pub score: u32,
}

impl Slot {
    fn view(&self) -> PaddleView {
        PaddleView {
            x: self.paddle.x,
            y: self.paddle.y,
            score: self.score,
        }
    }

    fn result(&self) -> SideResult {
        SideResult {
            player: self.player,
            name: self.name.clone(),
            score: self.score,
        }
    }
}

/// Ball truth captured at the moment of a physical event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallSync {
    pub event: SyncEvent,
    pub ball: BallView,
    pub left_score: u32,
    pub right_score: u32,
}

impl BallSync {
    pub fn to_message(&self, timestamp: u64) -> ServerMessage {
        ServerMessage::BallSync {
            event: self.event,
            ball: self.ball,
            left_score: self.left_score,
            right_score: self.right_score,
            timestamp,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Sync events in the order they occurred.
    pub syncs: Vec<BallSync>,
    /// Side that won a point this tick.
    pub scored: Option<Side>,
    /// The point ended the match.
    pub finished: bool,
    /// A full `state` frame is due.
    pub broadcast_state: bool,
}

/// A running match between two players.
#[derive(Debug, Clone)]
pub struct Match {
    id: MatchId,
    kind: MatchKind,
    config: MatchConfig,
    left: Slot,
    right: Slot,
    ball: Ball,
    phase: MatchPhase,
    countdown: u32,
    countdown_ticks: u32,
    frame: u64,
    /// A player asked for the pause.
    pause_requested: bool,
    /// Held for this absent player until they return.
    held_for: Option<PlayerId>,
}

impl Match {
    /// A fresh match. `left` and `right` are taken as given; side ordering
    /// is the registry's job.
    pub fn new<R: Rng + ?Sized>(
        id: MatchId,
        kind: MatchKind,
        config: MatchConfig,
        left: (PlayerId, String),
        right: (PlayerId, String),
        rng: &mut R,
    ) -> Self {
        let slot = |(player, name): (PlayerId, String), side| Slot {
            player,
            name,
            paddle: Paddle::new(side, &config),
            score: 0,
        };
        let left = slot(left, Side::Left);
        let right = slot(right, Side::Right);
        Self {
            id,
            kind,
            ball: Ball::serve(&config, rng),
            countdown: config.countdown_secs,
            config,
            left,
            right,
            phase: MatchPhase::Playing,
            countdown_ticks: 0,
            frame: 0,
            pause_requested: false,
            held_for: None,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The absent player the match is held for, if any.
    pub fn held_for(&self) -> Option<PlayerId> {
        self.held_for
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn ball_mut(&mut self) -> &mut Ball {
        &mut self.ball
    }

    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// `(left, right)` player ids.
    pub fn players(&self) -> (PlayerId, PlayerId) {
        (self.left.player, self.right.player)
    }

    /// `(left, right)` scores.
    pub fn score(&self) -> (u32, u32) {
        (self.left.score, self.right.score)
    }

    pub fn side_of(&self, player: PlayerId) -> Option<Side> {
        if self.left.player == player {
            Some(Side::Left)
        } else if self.right.player == player {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        self.side_of(player)
            .map(|side| self.slot(side.opposite()).player)
    }

    /// Sets the player's paddle velocity from the held direction keys.
    /// Up wins when both are held; neither stops the paddle.
    pub fn set_input(&mut self, player: PlayerId, up: bool, down: bool) -> Result<(), MatchError> {
        let side = self.side_of(player).ok_or(MatchError::NotParticipant {
            player,
            match_id: self.id,
        })?;
        let speed = self.config.paddle_speed;
        self.slot_mut(side).paddle.dy = if up {
            -speed
        } else if down {
            speed
        } else {
            0.0
        };
        Ok(())
    }

    /// A player's own pause or resume. Zeroes both paddle velocities.
    /// Returns `false` once the match is over.
    ///
    /// The match stays paused while it is held for an absent player,
    /// whatever the request.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.pause_requested = paused;
        self.settle_pause();
        true
    }

    /// Holds the match for `player`, who dropped out. Replaces any earlier
    /// holder.
    pub fn hold_for(&mut self, player: PlayerId) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.held_for = Some(player);
        self.settle_pause();
        true
    }

    /// Ends the disconnect hold. A requested pause stays in place. Returns
    /// whether play resumed.
    pub fn release_hold(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.held_for = None;
        self.settle_pause();
        self.phase == MatchPhase::Playing
    }

    fn settle_pause(&mut self) {
        self.phase = if self.pause_requested || self.held_for.is_some() {
            MatchPhase::Paused
        } else {
            MatchPhase::Playing
        };
        self.left.paddle.dy = 0.0;
        self.right.paddle.dy = 0.0;
    }

    fn sync(&self, event: SyncEvent) -> BallSync {
        BallSync {
            event,
            ball: self.ball.view(),
            left_score: self.left.score,
            right_score: self.right.score,
        }
    }

    /// Advances the match by one frame.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        self.step(&mut report);
        if !report.finished {
            self.frame += 1;
            report.broadcast_state = self.frame % self.config.broadcast_every.max(1) == 0;
        }
        report
    }

    fn step(&mut self, report: &mut TickReport) {
        let max_y = self.config.max_paddle_y();
        self.left.paddle.integrate(max_y);
        self.right.paddle.integrate(max_y);

        if self.phase != MatchPhase::Playing {
            return;
        }

        if self.countdown > 0 {
            self.countdown_ticks += 1;
            if self.countdown_ticks >= self.config.ticks_per_countdown_step {
                self.countdown -= 1;
                self.countdown_ticks = 0;
            }
            if self.countdown > 0 {
                return;
            }
        }

        if physics::advance_ball(&mut self.ball, self.config.arena_height, 1.0) {
            report.syncs.push(self.sync(SyncEvent::WallBounce));
        }

        if !self.ball.resetting {
            if let Some(side) = physics::scoring_side(&self.ball, self.config.arena_width) {
                self.ball.resetting = true;
                self.slot_mut(side).score += 1;
                report.scored = Some(side);
                report.syncs.push(self.sync(SyncEvent::Score));
                tracing::debug!(
                    match_id = %self.id,
                    left = self.left.score,
                    right = self.right.score,
                    "point scored"
                );
                if self.slot(side).score >= self.config.max_score {
                    self.phase = MatchPhase::GameOver;
                    report.finished = true;
                    return;
                }
            }
        }

        for side in [Side::Left, Side::Right] {
            let paddle = self.slot(side).paddle;
            if physics::paddle_collision(&self.ball, &paddle) {
                physics::deflect(&mut self.ball, &paddle, side, &self.config);
                report.syncs.push(self.sync(SyncEvent::PaddleHit));
                break;
            }
        }
    }

    /// Serves again after a point. No-op unless a reset is pending and the
    /// match is still live.
    pub fn reset_ball<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<BallSync> {
        if self.phase.is_terminal() || !self.ball.resetting {
            return None;
        }
        self.ball.recentre(&self.config, rng);
        Some(self.sync(SyncEvent::Reset))
    }

    /// Full state framed for the player on `side`.
    pub fn state_for(&self, side: Side) -> ClientState {
        let me = self.slot(side);
        let them = self.slot(side.opposite());
        ClientState {
            ball: self.ball.view(),
            player: me.view(),
            opponent: them.view(),
            player_user_id: me.player,
            player_username: me.name.clone(),
            opponent_user_id: them.player,
            opponent_username: them.name.clone(),
            game_over: self.phase.is_terminal(),
            countdown: (self.countdown > 0).then_some(self.countdown),
        }
    }

    /// Final result. A score-limit end goes to the higher score; a forfeit
    /// goes to the side that did not forfeit.
    pub fn outcome(&self, reason: EndReason) -> MatchOutcome {
        let winner = match &reason {
            EndReason::ScoreLimit => {
                if self.left.score > self.right.score {
                    self.left.player
                } else {
                    self.right.player
                }
            }
            EndReason::Forfeit { loser, .. } => {
                if *loser == self.left.player {
                    self.right.player
                } else {
                    self.left.player
                }
            }
        };
        MatchOutcome {
            match_id: self.id,
            kind: self.kind,
            left: self.left.result(),
            right: self.right.result(),
            winner,
            reason,
        }
    }
}
