//! Live match plumbing: start, per-frame tick, serve and teardown.

use std::time::Instant;

use rally_match::{Contender, EndReason, MatchKind, MatchOutcome};
use rally_protocol::{MatchId, PlayerId, ServerMessage, Side, unix_millis};

use crate::engine::{Core, Timer};

impl Core {
    /// Creates a match, marks both players busy, schedules its first frame
    /// and announces it. Refused while either player is in a match.
    pub(crate) fn start_match(
        &mut self,
        a: Contender,
        b: Contender,
        kind: MatchKind,
        now: Instant,
    ) -> Option<MatchId> {
        if self.sessions.is_in_match(a.id) || self.sessions.is_in_match(b.id) {
            tracing::debug!(a = %a.id, b = %b.id, "match not started, a player is busy");
            return None;
        }
        let match_id = match self.matches.create(a, b, kind, &mut self.rng) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "match not created");
                return None;
            }
        };
        let players = self.matches.get(match_id)?.players();
        for player in [players.0, players.1] {
            if let Err(e) = self.sessions.enter_match(player, match_id) {
                tracing::warn!(player_id = %player, %match_id, error = %e, "could not mark player busy");
            }
        }
        self.timers.schedule(
            Timer::MatchTick(match_id),
            now + self.config.tick.tick_duration(),
        );
        tracing::info!(%match_id, left = %players.0, right = %players.1, ?kind, "match started");
        self.send_both(players, ServerMessage::GameStart);
        Some(match_id)
    }

    /// Runs one frame of `match_id` and fans its events out.
    pub(crate) fn tick_match(&mut self, match_id: MatchId, scheduled: Instant, now: Instant) {
        let started = Instant::now();
        let Some(game) = self.matches.get_mut(match_id) else {
            return;
        };
        let report = game.tick();
        let players = game.players();
        let frames = (report.broadcast_state || report.finished)
            .then(|| (game.state_for(Side::Left), game.state_for(Side::Right)));

        if !report.syncs.is_empty() {
            let timestamp = unix_millis();
            for sync in &report.syncs {
                self.send_both(players, sync.to_message(timestamp));
            }
        }
        if let Some((left, right)) = frames {
            self.send(players.0, ServerMessage::State { state: left });
            self.send(players.1, ServerMessage::State { state: right });
        }

        if report.finished {
            self.finish_match(match_id, EndReason::ScoreLimit, true);
        } else {
            if report.scored.is_some() {
                let delay = self.matches.config().reset_delay;
                self.timers.schedule(Timer::BallReset(match_id), now + delay);
            }
            let (next, _) = self.config.tick.next_deadline(scheduled, now);
            self.timers.schedule(Timer::MatchTick(match_id), next);
        }
        self.budget.record(started.elapsed());
    }

    pub(crate) fn reset_ball(&mut self, match_id: MatchId) {
        let Some(game) = self.matches.get_mut(match_id) else {
            return;
        };
        let Some(sync) = game.reset_ball(&mut self.rng) else {
            return;
        };
        let players = game.players();
        self.send_both(players, sync.to_message(unix_millis()));
    }

    /// Tears a match down and reports it. With `notify`, a bracket match's
    /// result is queued for its tournament.
    pub(crate) fn finish_match(
        &mut self,
        match_id: MatchId,
        reason: EndReason,
        notify: bool,
    ) -> Option<MatchOutcome> {
        let game = self.matches.remove(match_id)?;
        self.timers.cancel_where(|timer| {
            matches!(timer, Timer::MatchTick(id) | Timer::BallReset(id) if *id == match_id)
        });

        let outcome = game.outcome(reason);
        let (left, right) = game.players();
        self.sessions.leave_match(left, match_id);
        self.sessions.leave_match(right, match_id);
        if outcome.kind == MatchKind::Casual {
            self.last_opponent.insert(left, right);
            self.last_opponent.insert(right, left);
        }
        self.sink.match_concluded(outcome.to_record());

        if let Some(tournament) = self.subscriptions.remove(&match_id) {
            if notify {
                self.results
                    .push_back((tournament, match_id, outcome.winner));
            }
        }

        let away: Vec<PlayerId> = self
            .graces
            .iter()
            .filter(|(_, m)| **m == match_id)
            .map(|(p, _)| *p)
            .collect();
        for player in away {
            self.graces.remove(&player);
            self.timers.cancel(&Timer::Grace(player));
            if !self.sessions.is_connected(player) {
                self.forget(player);
            }
        }
        self.rematch_due = true;

        tracing::info!(
            %match_id,
            winner = %outcome.winner,
            score = ?(outcome.left.score, outcome.right.score),
            reason = ?outcome.reason,
            "match ended"
        );
        Some(outcome)
    }

    pub(crate) fn apply_input(&mut self, player: PlayerId, up: bool, down: bool) {
        let Some(match_id) = self.sessions.current_match_of(player) else {
            tracing::trace!(player_id = %player, "input outside a match");
            return;
        };
        match self.matches.get_mut(match_id) {
            Some(game) => {
                if let Err(e) = game.set_input(player, up, down) {
                    tracing::debug!(player_id = %player, error = %e, "input rejected");
                }
            }
            None => tracing::debug!(player_id = %player, %match_id, "input for a stale match"),
        }
    }

    /// Explicit pause or resume from a player. Ignored while the match is
    /// held for a disconnected player.
    pub(crate) fn request_pause(&mut self, player: PlayerId, paused: bool) {
        let Some(match_id) = self.sessions.current_match_of(player) else {
            return;
        };
        let Some(game) = self.matches.get_mut(match_id) else {
            tracing::debug!(player_id = %player, %match_id, "pause for a stale match");
            return;
        };
        if let Some(away) = game.held_for() {
            tracing::debug!(player_id = %player, away = %away, "pause change refused while a player is away");
            return;
        }
        if !game.set_paused(paused) {
            return;
        }
        let players = game.players();
        tracing::info!(player_id = %player, %match_id, paused, "pause toggled");
        self.send_both(
            players,
            ServerMessage::PauseUpdate {
                paused,
                message: None,
            },
        );
    }
}
