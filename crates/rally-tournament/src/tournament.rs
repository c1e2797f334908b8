//! One tournament's state machine.
//!
//! ```text
//! created ──(everyone ready, valid size)──→ starting ──→ inProgress ──→ completed
//!    ↑                                          │
//!    └──────────────(invalid size)──────────────┘
//! ```
//!
//! Round one starts as soon as the draw is made. Every later round waits
//! for its players to ready up again; the first ready signal arms a timeout
//! after which the stragglers forfeit.

use std::collections::{BTreeSet, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;
use rally_protocol::{
    MatchId, ParticipantView, PlayerId, ServerMessage, Side, TournamentId, TournamentStatus,
    UpdateStatus, unix_millis,
};

use crate::{
    Bracket, Entrant, TournamentConfig, TournamentError, TournamentHost, TournamentRecord,
    TournamentTimer,
};

/// A single-elimination tournament.
///
/// ## Invariants
///
/// - Only the current (last) round ever has unresolved bracket-matches.
/// - A bracket-match has a running match only while it is unresolved.
/// - `awaiting_ready` is set exactly between a round being drawn and its
///   kickoff; round-ready signals are ignored outside that window.
#[derive(Debug)]
pub struct Tournament {
    id: TournamentId,
    creator: PlayerId,
    config: TournamentConfig,
    status: TournamentStatus,
    roster: Vec<Entrant>,
    ready: HashSet<PlayerId>,
    round_ready: BTreeSet<PlayerId>,
    awaiting_ready: bool,
    ready_timer_armed: bool,
    retry_armed: bool,
    bracket: Bracket,
    champion: Option<PlayerId>,
}

impl Tournament {
    pub fn new(id: TournamentId, creator: Entrant, config: TournamentConfig) -> Self {
        tracing::info!(tournament_id = %id, creator = %creator.id, "tournament created");
        Self {
            id,
            creator: creator.id,
            config,
            status: TournamentStatus::Created,
            roster: vec![creator],
            ready: HashSet::new(),
            round_ready: BTreeSet::new(),
            awaiting_ready: false,
            ready_timer_armed: false,
            retry_armed: false,
            bracket: Bracket::default(),
            champion: None,
        }
    }

    pub fn id(&self) -> &TournamentId {
        &self.id
    }

    pub fn creator(&self) -> PlayerId {
        self.creator
    }

    pub fn status(&self) -> TournamentStatus {
        self.status
    }

    pub fn round(&self) -> usize {
        self.bracket.round()
    }

    pub fn bracket(&self) -> &Bracket {
        &self.bracket
    }

    pub fn roster(&self) -> &[Entrant] {
        &self.roster
    }

    pub fn champion(&self) -> Option<PlayerId> {
        self.champion
    }

    pub fn is_completed(&self) -> bool {
        self.status == TournamentStatus::Completed
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.roster.iter().any(|e| e.id == player)
    }

    /// Whether the round is drawn but not yet kicked off.
    pub fn awaiting_ready(&self) -> bool {
        self.awaiting_ready
    }

    /// Whether `player` still has to play in the current round.
    pub fn is_in_active_match(&self, player: PlayerId) -> bool {
        self.status == TournamentStatus::InProgress && self.bracket.open_match_of(player).is_some()
    }

    fn name_of(&self, player: PlayerId) -> String {
        self.roster
            .iter()
            .find(|e| e.id == player)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("Player {}", player.0))
    }

    fn wrong_status(&self) -> TournamentError {
        TournamentError::WrongStatus {
            tournament: self.id.clone(),
            status: self.status,
        }
    }

    // =====================================================================
    // Broadcasts
    // =====================================================================

    fn send_all<H: TournamentHost>(&self, host: &mut H, msg: ServerMessage) {
        for entrant in &self.roster {
            host.send(entrant.id, msg.clone());
        }
    }

    /// Ready flags come from the join-phase set until the draw, then from
    /// the current round's set.
    pub fn participants_message(&self) -> ServerMessage {
        let ready_set = |id: &PlayerId| {
            if self.status == TournamentStatus::Created {
                self.ready.contains(id)
            } else {
                self.round_ready.contains(id)
            }
        };
        ServerMessage::TournamentParticipants {
            tournament_id: self.id.clone(),
            count: self.roster.len(),
            round: self.round(),
            status: self.status,
            participants: self
                .roster
                .iter()
                .map(|e| ParticipantView {
                    id: e.id,
                    username: e.name.clone(),
                    ready: ready_set(&e.id),
                })
                .collect(),
        }
    }

    pub fn bracket_message<H: TournamentHost>(&self, host: &H) -> ServerMessage {
        ServerMessage::TournamentBracket {
            tournament_id: self.id.clone(),
            round: self.round(),
            bracket: self.bracket.view(|id| host.live_score(id)),
        }
    }

    fn broadcast_participants<H: TournamentHost>(&self, host: &mut H) {
        self.send_all(host, self.participants_message());
    }

    fn broadcast_bracket<H: TournamentHost>(&self, host: &mut H) {
        let msg = self.bracket_message(host);
        self.send_all(host, msg);
    }

    fn broadcast_round_ready<H: TournamentHost>(&self, host: &mut H, active: &[PlayerId]) {
        self.send_all(
            host,
            ServerMessage::TournamentRoundReady {
                tournament_id: self.id.clone(),
                round: self.round(),
                ready_players: self.round_ready.iter().copied().collect(),
                active_players: active.to_vec(),
            },
        );
    }

    fn assignment_message(&self, player: PlayerId) -> Option<ServerMessage> {
        let slot = self.bracket.open_match_of(player)?;
        let opponent = slot.opponent_of(player)?;
        let role = if slot.left.as_ref().is_some_and(|e| e.id == player) {
            Side::Left
        } else {
            Side::Right
        };
        Some(ServerMessage::TournamentMatch {
            tournament_id: self.id.clone(),
            round: self.round(),
            opponent_id: opponent.id,
            opponent_username: opponent.name.clone(),
            role,
        })
    }

    // =====================================================================
    // Join phase
    // =====================================================================

    /// Adds `entrant` to the roster. Re-joining is a no-op apart from the
    /// participant broadcast.
    pub fn join<H: TournamentHost>(
        &mut self,
        host: &mut H,
        entrant: Entrant,
    ) -> Result<(), TournamentError> {
        if !self.status.accepts_joins() {
            return Err(TournamentError::Closed {
                tournament: self.id.clone(),
                status: self.status,
            });
        }
        if !self.contains(entrant.id) {
            tracing::info!(
                tournament_id = %self.id,
                player_id = %entrant.id,
                players = self.roster.len() + 1,
                "player joined tournament"
            );
            self.roster.push(entrant);
        }
        self.broadcast_participants(host);
        Ok(())
    }

    /// Toggles `player`'s readiness: the join-phase flag before the draw,
    /// the round flag between rounds.
    pub fn set_ready<H: TournamentHost, R: Rng + ?Sized>(
        &mut self,
        host: &mut H,
        player: PlayerId,
        ready: bool,
        rng: &mut R,
    ) -> Result<(), TournamentError> {
        if !self.contains(player) {
            return Err(TournamentError::NotParticipant {
                player,
                tournament: self.id.clone(),
            });
        }
        match self.status {
            TournamentStatus::Created => {
                if ready {
                    self.ready.insert(player);
                } else {
                    self.ready.remove(&player);
                }
                tracing::debug!(
                    tournament_id = %self.id,
                    player_id = %player,
                    ready,
                    count = self.ready.len(),
                    of = self.roster.len(),
                    "join-phase ready"
                );
                self.broadcast_participants(host);
                if self.ready.len() == self.roster.len() {
                    self.start(host, rng);
                }
                Ok(())
            }
            TournamentStatus::InProgress => {
                self.set_round_ready(host, player, ready);
                Ok(())
            }
            TournamentStatus::Starting | TournamentStatus::Completed => Err(self.wrong_status()),
        }
    }

    fn start<H: TournamentHost, R: Rng + ?Sized>(&mut self, host: &mut H, rng: &mut R) {
        self.status = TournamentStatus::Starting;
        let count = self.roster.len();

        if !self.config.is_valid_size(count) {
            self.status = TournamentStatus::Created;
            tracing::info!(tournament_id = %self.id, count, "cannot start, invalid roster size");
            self.send_all(
                host,
                ServerMessage::TournamentUpdate {
                    tournament_id: self.id.clone(),
                    status: UpdateStatus::Error,
                    message: format!(
                        "Cannot start - need exactly {} players (currently {count}). Waiting for more players...",
                        self.config.sizes_label()
                    ),
                },
            );
            return;
        }

        let mut entrants = self.roster.clone();
        entrants.shuffle(rng);
        self.bracket = Bracket::seed(entrants);
        self.status = TournamentStatus::InProgress;
        tracing::info!(tournament_id = %self.id, players = count, "tournament started");

        self.broadcast_bracket(host);
        self.evaluate(host);
    }

    // =====================================================================
    // Rounds
    // =====================================================================

    fn set_round_ready<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId, ready: bool) {
        if !self.awaiting_ready {
            tracing::debug!(
                tournament_id = %self.id,
                player_id = %player,
                "round ready ignored, round already under way"
            );
            return;
        }
        let active = self.bracket.active_players();
        if !active.contains(&player) {
            tracing::debug!(tournament_id = %self.id, player_id = %player, "round ready from inactive player");
            return;
        }

        if ready {
            self.round_ready.insert(player);
        } else {
            self.round_ready.remove(&player);
        }
        self.broadcast_round_ready(host, &active);

        if ready && !self.ready_timer_armed {
            self.ready_timer_armed = true;
            host.schedule(
                TournamentTimer::ReadyTimeout(self.id.clone()),
                self.config.ready_timeout,
            );
            let secs = self.config.ready_timeout.as_secs();
            tracing::info!(tournament_id = %self.id, round = self.round(), secs, "ready timeout armed");
            for &pid in &active {
                host.send(
                    pid,
                    ServerMessage::TournamentReadyTimeout {
                        tournament_id: self.id.clone(),
                        timeout_seconds: secs,
                        message: format!("{secs} seconds to ready up or forfeit!"),
                    },
                );
            }
        }

        self.start_round_if_ready(host);
    }

    /// Kicks off the awaiting round once every active player is ready.
    fn start_round_if_ready<H: TournamentHost>(&mut self, host: &mut H) {
        let active = self.bracket.active_players();
        if active.is_empty() || !active.iter().all(|p| self.round_ready.contains(p)) {
            return;
        }
        self.disarm_ready_timer(host);
        self.awaiting_ready = false;
        self.round_ready.clear();
        tracing::info!(tournament_id = %self.id, round = self.round(), "all players ready");
        self.kickoff(host);
    }

    fn disarm_ready_timer<H: TournamentHost>(&mut self, host: &mut H) {
        if self.ready_timer_armed {
            self.ready_timer_armed = false;
            host.cancel(&TournamentTimer::ReadyTimeout(self.id.clone()));
        }
    }

    fn disarm_retry<H: TournamentHost>(&mut self, host: &mut H) {
        if self.retry_armed {
            self.retry_armed = false;
            host.cancel(&TournamentTimer::KickoffRetry(self.id.clone()));
        }
    }

    /// Starts every startable bracket-match of the current round at once.
    ///
    /// A pairing with a player still busy in another match is deferred and
    /// retried; a player who is not connected forfeits.
    fn kickoff<H: TournamentHost>(&mut self, host: &mut H) {
        if self.status != TournamentStatus::InProgress || self.awaiting_ready {
            return;
        }
        let round = self.round();
        let mut started = Vec::new();
        let mut absent = Vec::new();
        let mut deferred = false;

        for slot in self.bracket.current_mut() {
            if slot.is_resolved() || slot.running_match.is_some() {
                continue;
            }
            let (Some(left), Some(right)) = (&slot.left, &slot.right) else {
                continue;
            };
            let offline: Vec<PlayerId> = [left.id, right.id]
                .into_iter()
                .filter(|&p| !host.is_connected(p))
                .collect();
            if let Some(&first) = offline.first() {
                absent.push(first);
                continue;
            }
            if host.is_in_match(left.id) || host.is_in_match(right.id) {
                deferred = true;
                continue;
            }
            match host.start_match(&self.id, left, right) {
                Some(match_id) => {
                    slot.running_match = Some(match_id);
                    tracing::info!(
                        tournament_id = %self.id,
                        round,
                        %match_id,
                        left = %left.id,
                        right = %right.id,
                        "bracket match started"
                    );
                    started.push((left.id, right.id));
                }
                None => deferred = true,
            }
        }

        for (left, right) in &started {
            for player in [left, right] {
                if let Some(msg) = self.assignment_message(*player) {
                    host.send(*player, msg);
                }
            }
        }
        if !started.is_empty() {
            self.broadcast_bracket(host);
        }

        if deferred && !self.retry_armed {
            self.retry_armed = true;
            tracing::debug!(tournament_id = %self.id, round, "kickoff deferred, players busy");
            host.schedule(
                TournamentTimer::KickoffRetry(self.id.clone()),
                self.config.kickoff_retry,
            );
        }

        if !absent.is_empty() {
            for player in absent {
                self.resolve_forfeit(host, player, "not connected");
            }
            self.evaluate(host);
        }
    }

    /// Moves the tournament forward after any bracket-match resolves.
    fn evaluate<H: TournamentHost>(&mut self, host: &mut H) {
        if self.status != TournamentStatus::InProgress {
            return;
        }
        if !self.bracket.is_current_complete() {
            if self.awaiting_ready {
                self.start_round_if_ready(host);
            } else {
                self.kickoff(host);
            }
            return;
        }

        if self.bracket.current().len() == 1 {
            if let Some(champion) = self.bracket.current()[0].winner {
                self.complete(host, champion, None);
            }
            return;
        }

        let finished = self.round();
        self.bracket.advance();
        self.disarm_retry(host);
        self.disarm_ready_timer(host);
        self.round_ready.clear();
        self.awaiting_ready = true;
        tracing::info!(tournament_id = %self.id, round = self.round(), "advancing to next round");

        self.broadcast_participants(host);
        self.broadcast_bracket(host);
        for player in self.bracket.active_players() {
            host.send(
                player,
                ServerMessage::TournamentRoundComplete {
                    tournament_id: self.id.clone(),
                    round: self.round(),
                    message: format!("Round {finished} complete! Click Ready to continue."),
                },
            );
        }

        // A round made only of byes needs nobody to ready up.
        if self.bracket.is_current_complete() {
            self.awaiting_ready = false;
            self.evaluate(host);
        }
    }

    fn complete<H: TournamentHost>(&mut self, host: &mut H, champion: PlayerId, reason: Option<&str>) {
        self.status = TournamentStatus::Completed;
        self.champion = Some(champion);
        self.awaiting_ready = false;
        self.disarm_ready_timer(host);
        self.disarm_retry(host);
        tracing::info!(tournament_id = %self.id, winner = %champion, "tournament completed");

        self.send_all(
            host,
            ServerMessage::TournamentCompleted {
                tournament_id: self.id.clone(),
                winner_id: champion,
                reason: reason.map(str::to_string),
            },
        );
        host.persist(TournamentRecord {
            tournament_id: self.id.clone(),
            winner_id: champion,
            players: self.roster.iter().map(|e| e.id).collect(),
            rounds: self.bracket.round_sizes(),
            timestamp: unix_millis(),
        });
    }

    /// Records the result of a bracket-match's live match.
    pub fn match_finished<H: TournamentHost>(&mut self, host: &mut H, match_id: MatchId, winner: PlayerId) {
        let Some(slot) = self.bracket.by_running_match_mut(match_id) else {
            tracing::warn!(tournament_id = %self.id, %match_id, "finished match not in bracket");
            return;
        };
        slot.running_match = None;
        if slot.is_resolved() {
            return;
        }
        if !slot.involves(winner) {
            tracing::warn!(tournament_id = %self.id, %match_id, %winner, "winner not in bracket match");
            return;
        }
        slot.winner = Some(winner);
        tracing::info!(tournament_id = %self.id, %match_id, %winner, "bracket match decided");
        self.broadcast_bracket(host);
        self.evaluate(host);
    }

    /// Handles one of this tournament's timers firing.
    pub fn on_timer<H: TournamentHost>(&mut self, host: &mut H, timer: &TournamentTimer) {
        match timer {
            TournamentTimer::ReadyTimeout(_) => {
                self.ready_timer_armed = false;
                self.ready_timeout(host);
            }
            TournamentTimer::KickoffRetry(_) => {
                self.retry_armed = false;
                self.kickoff(host);
            }
        }
    }

    fn ready_timeout<H: TournamentHost>(&mut self, host: &mut H) {
        if self.status != TournamentStatus::InProgress || !self.awaiting_ready {
            return;
        }
        let stragglers: Vec<PlayerId> = self
            .bracket
            .active_players()
            .into_iter()
            .filter(|p| !self.round_ready.contains(p))
            .collect();
        if stragglers.is_empty() {
            return;
        }
        tracing::info!(
            tournament_id = %self.id,
            round = self.round(),
            count = stragglers.len(),
            "ready timeout, forfeiting players not ready"
        );
        for player in stragglers {
            self.resolve_forfeit(host, player, "ready timeout");
        }
        self.awaiting_ready = false;
        self.round_ready.clear();
        self.evaluate(host);
    }

    // =====================================================================
    // Forfeits, leave, rejoin
    // =====================================================================

    /// Forfeits `player`. Before the draw this removes them from the
    /// roster; afterwards their opponent wins their open bracket-match.
    pub fn forfeit<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId, reason: &str) {
        self.resolve_forfeit(host, player, reason);
        self.evaluate(host);
    }

    /// The forfeit itself, without moving the bracket on.
    fn resolve_forfeit<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId, reason: &str) {
        match self.status {
            TournamentStatus::Created | TournamentStatus::Starting => {
                let Some(index) = self.roster.iter().position(|e| e.id == player) else {
                    return;
                };
                let removed = self.roster.remove(index);
                self.ready.remove(&player);
                tracing::info!(tournament_id = %self.id, player_id = %player, reason, "player removed before start");
                self.send_all(
                    host,
                    ServerMessage::TournamentForfeit {
                        tournament_id: self.id.clone(),
                        forfeited_player_id: player,
                        forfeited_username: removed.name.clone(),
                        winner_id: None,
                        winner_username: None,
                        reason: reason.to_string(),
                        message: format!("{} left the tournament", removed.name),
                    },
                );
                self.broadcast_participants(host);
            }
            TournamentStatus::InProgress => self.forfeit_open_match(host, player, reason),
            TournamentStatus::Completed => {}
        }
    }

    fn forfeit_open_match<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId, reason: &str) {
        self.round_ready.remove(&player);
        let tournament_id = self.id.clone();
        let Some(slot) = self.bracket.open_match_of_mut(player) else {
            tracing::debug!(%tournament_id, player_id = %player, "forfeit with no open bracket match");
            return;
        };
        let running = slot.running_match.take();
        let Some(winner) = slot.opponent_of(player).cloned() else {
            tracing::warn!(%tournament_id, player_id = %player, "forfeit in a bye, left unresolved");
            return;
        };
        slot.winner = Some(winner.id);

        if let Some(match_id) = running {
            host.end_match(match_id, player, reason);
        }
        let loser_name = self.name_of(player);
        tracing::info!(
            %tournament_id,
            player_id = %player,
            winner = %winner.id,
            reason,
            "bracket match forfeited"
        );

        host.send(
            winner.id,
            ServerMessage::GameOver {
                won: true,
                reason: "forfeit".into(),
                message: format!("You win! Opponent {reason}."),
            },
        );
        self.send_all(
            host,
            ServerMessage::TournamentForfeit {
                tournament_id,
                forfeited_player_id: player,
                forfeited_username: loser_name,
                winner_id: Some(winner.id),
                winner_username: Some(winner.name.clone()),
                reason: reason.to_string(),
                message: format!("{} wins by forfeit (opponent {reason})", winner.name),
            },
        );
        self.broadcast_bracket(host);
    }

    /// Voluntary exit. Mid-tournament, if this leaves a single player not
    /// yet eliminated, that player is champion at once.
    pub fn leave<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId) -> Result<(), TournamentError> {
        if !self.contains(player) {
            return Err(TournamentError::NotParticipant {
                player,
                tournament: self.id.clone(),
            });
        }
        tracing::info!(tournament_id = %self.id, player_id = %player, "player leaving tournament");
        self.forfeit(host, player, "left the tournament");

        if self.status == TournamentStatus::InProgress {
            let remaining: Vec<PlayerId> = self
                .roster
                .iter()
                .map(|e| e.id)
                .filter(|&id| id != player && !self.bracket.is_eliminated(id))
                .collect();
            if let [champion] = remaining.as_slice() {
                self.complete(host, *champion, Some("All other players left"));
            }
        }
        Ok(())
    }

    /// Re-sends the full tournament picture to a returning player, adding
    /// them to the roster if joins are still open.
    pub fn rejoin<H: TournamentHost>(&mut self, host: &mut H, entrant: Entrant) -> Result<(), TournamentError> {
        let player = entrant.id;
        if !self.contains(player) {
            self.join(host, entrant)?;
        }
        host.send(
            player,
            ServerMessage::TournamentUpdate {
                tournament_id: self.id.clone(),
                status: self.status.into(),
                message: format!("Rejoined tournament. Status: {}", self.status),
            },
        );
        self.broadcast_participants(host);
        if self.status == TournamentStatus::InProgress {
            self.broadcast_bracket(host);
            if let Some(msg) = self.assignment_message(player) {
                host.send(player, msg);
            }
        }
        Ok(())
    }
}
