//! Disconnect supervision.
//!
//! A player whose connection drops mid-match gets a reconnect window: the
//! match pauses, the opponent is told how long to wait, and the window's
//! expiry forfeits the absent player. Reconnecting inside the window
//! resumes play. Tournament matches forfeit at once unless configured
//! otherwise.

use std::time::Instant;

use rally_match::EndReason;
use rally_protocol::{PlayerId, ServerMessage};
use rally_session::Player;

use crate::config::TournamentDisconnectPolicy;
use crate::engine::{Core, Engine, Timer};
use crate::tournaments::HostCtx;

impl Engine {
    /// `player`'s current connection is gone.
    pub(crate) fn connection_lost(&mut self, player: PlayerId, now: Instant) {
        let Self {
            core, tournaments, ..
        } = self;
        if core.graces.contains_key(&player) || !core.sessions.contains(player) {
            return;
        }
        if let Some(conn) = core.sessions.get(player).and_then(Player::connection_id) {
            core.sessions.release(conn);
        }
        tracing::info!(player_id = %player, "player disconnected");

        if core.config.tournament_disconnect == TournamentDisconnectPolicy::ForfeitImmediately
            && tournaments.is_in_active_match(player)
        {
            tracing::info!(player_id = %player, "tournament match forfeited on disconnect");
            let mut host = HostCtx::new(core, now);
            tournaments.forfeit_active(&mut host, player, "disconnect");
        }

        if !core.hold_for_reconnect(player, now) {
            core.forget(player);
        }
    }
}

impl Core {
    /// Pauses `player`'s live match and starts their reconnect window.
    /// Returns `false` when there is nothing to hold.
    fn hold_for_reconnect(&mut self, player: PlayerId, now: Instant) -> bool {
        let Some(match_id) = self.sessions.current_match_of(player) else {
            return false;
        };
        let Some(game) = self.matches.get_mut(match_id) else {
            return false;
        };
        if game.phase().is_terminal() {
            return false;
        }
        let opponent = game.opponent_of(player);
        // The first player to drop keeps the hold if both are away.
        let holder = game.held_for().unwrap_or(player);
        game.hold_for(holder);

        let grace = self.config.disconnect_grace;
        self.graces.insert(player, match_id);
        self.timers.schedule(Timer::Grace(player), now + grace);
        tracing::info!(player_id = %player, %match_id, grace_ms = grace.as_millis() as u64, "holding match for reconnect");

        if let Some(opponent) = opponent {
            self.send(
                opponent,
                ServerMessage::OpponentDisconnecting {
                    grace_period_ms: grace.as_millis() as u64,
                    message: format!(
                        "Opponent disconnected. Waiting {}s for reconnect...",
                        grace.as_secs()
                    ),
                },
            );
        }
        true
    }

    /// Ends `player`'s reconnect window, if any, and lifts the hold on
    /// their match unless the opponent is away too. A pause a player asked
    /// for stays in place.
    pub(crate) fn reconnected(&mut self, player: PlayerId) {
        let Some(match_id) = self.graces.remove(&player) else {
            return;
        };
        self.timers.cancel(&Timer::Grace(player));
        tracing::info!(player_id = %player, %match_id, "player reconnected within grace");

        let Some(game) = self.matches.get_mut(match_id) else {
            return;
        };
        if game.held_for() != Some(player) {
            return;
        }
        let opponent = game.opponent_of(player);
        if let Some(opp) = opponent.filter(|o| self.graces.contains_key(o)) {
            game.hold_for(opp);
            return;
        }
        let resumed = game.release_hold();
        let players = game.players();
        self.send_both(
            players,
            ServerMessage::PauseUpdate {
                paused: !resumed,
                message: Some("Opponent reconnected".into()),
            },
        );
    }

    /// The reconnect window ran out: `player` forfeits.
    pub(crate) fn grace_expired(&mut self, player: PlayerId) {
        let Some(match_id) = self.graces.remove(&player) else {
            return;
        };
        tracing::info!(player_id = %player, %match_id, "reconnect window expired");
        if let Some(winner) = self.matches.get(match_id).and_then(|g| g.opponent_of(player)) {
            self.send(
                winner,
                ServerMessage::OpponentDisconnected {
                    message: "Opponent disconnected - you win!".into(),
                },
            );
        }
        self.finish_match(
            match_id,
            EndReason::Forfeit {
                loser: player,
                reason: "disconnect".into(),
            },
            true,
        );
        if !self.sessions.is_connected(player) {
            self.forget(player);
        }
    }

    /// Drops every trace of a player who is gone for good.
    pub(crate) fn forget(&mut self, player: PlayerId) {
        self.sessions.remove(player);
        self.rematch.forget(player);
        self.last_opponent.remove(&player);
    }
}
