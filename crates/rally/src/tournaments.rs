//! The engine side of the tournament seam.

use std::time::{Duration, Instant};

use rally_match::{Contender, EndReason, MatchKind};
use rally_protocol::{MatchId, PlayerId, ServerMessage, TournamentId};
use rally_tournament::{Entrant, TournamentHost, TournamentRecord, TournamentTimer};

use crate::engine::{Core, Timer};

/// Lends the engine core to a tournament for one call.
pub(crate) struct HostCtx<'a> {
    core: &'a mut Core,
    now: Instant,
}

impl<'a> HostCtx<'a> {
    pub(crate) fn new(core: &'a mut Core, now: Instant) -> Self {
        Self { core, now }
    }
}

impl TournamentHost for HostCtx<'_> {
    fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        self.core.send(to, msg);
    }

    fn is_connected(&self, player: PlayerId) -> bool {
        self.core.sessions.is_connected(player)
    }

    fn is_in_match(&self, player: PlayerId) -> bool {
        self.core.sessions.is_in_match(player)
    }

    fn start_match(
        &mut self,
        tournament: &TournamentId,
        left: &Entrant,
        right: &Entrant,
    ) -> Option<MatchId> {
        let match_id = self.core.start_match(
            Contender::new(left.id, left.name.clone()),
            Contender::new(right.id, right.name.clone()),
            MatchKind::Tournament,
            self.now,
        )?;
        self.core.subscriptions.insert(match_id, tournament.clone());
        tracing::debug!(tournament_id = %tournament, %match_id, "bracket match subscribed");
        Some(match_id)
    }

    fn end_match(&mut self, match_id: MatchId, loser: PlayerId, reason: &str) {
        self.core.finish_match(
            match_id,
            EndReason::Forfeit {
                loser,
                reason: reason.to_string(),
            },
            false,
        );
    }

    fn live_score(&self, match_id: MatchId) -> Option<(u32, u32)> {
        self.core.matches.live_score(match_id)
    }

    fn schedule(&mut self, timer: TournamentTimer, after: Duration) {
        self.core
            .timers
            .schedule(Timer::Tournament(timer), self.now + after);
    }

    fn cancel(&mut self, timer: &TournamentTimer) {
        self.core.timers.cancel(&Timer::Tournament(timer.clone()));
    }

    fn persist(&mut self, record: TournamentRecord) {
        self.core.sink.tournament_concluded(record);
    }
}
