//! The serialized engine.
//!
//! Every state change in the server happens inside one [`Engine`] call:
//! a connection arriving or leaving, an inbound message, a lobby answer,
//! or a batch of due timers. Calls never block and never overlap, so the
//! registries need no locking. The actor in [`crate::actor`] owns the
//! engine and feeds it.
//!
//! Time is passed in, never read, which keeps the engine deterministic
//! under test.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use rally_match::{Contender, Match, MatchKind, MatchRegistry};
use rally_protocol::{ClientMessage, MatchId, PlayerId, ServerMessage, TournamentId, UpdateStatus};
use rally_session::{Binding, Identity, Outbound, SessionRegistry};
use rally_tick::{TickBudget, TickMetrics, TimerQueue};
use rally_tournament::{Entrant, Tournament, TournamentError, TournamentRegistry, TournamentTimer};
use rally_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::lobby::{LobbyInfo, LobbyKey, LobbyRequest};
use crate::rematch::RematchBook;
use crate::tournaments::HostCtx;
use crate::{EngineConfig, LobbyError, OutcomeSink};

/// Every deadline the engine tracks, keyed by what it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Timer {
    /// Next 60 Hz frame of a match.
    MatchTick(MatchId),
    /// Serve after a point.
    BallReset(MatchId),
    /// End of a dropped player's reconnect window.
    Grace(PlayerId),
    Tournament(TournamentTimer),
}

/// Counts reported by [`Engine::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub players: usize,
    pub matches: usize,
    pub tournaments: usize,
}

/// State shared by matches, the disconnect supervisor and rematches.
///
/// Tournaments live beside it in [`Engine`] and reach it only through
/// [`HostCtx`], so a tournament can start and end matches while the
/// registry that owns it is borrowed.
pub(crate) struct Core {
    pub(crate) config: EngineConfig,
    pub(crate) sessions: SessionRegistry,
    pub(crate) matches: MatchRegistry,
    pub(crate) timers: TimerQueue<Timer>,
    /// Tournament waiting on each bracket match's result.
    pub(crate) subscriptions: HashMap<MatchId, TournamentId>,
    /// Players inside a reconnect window, with the match they left.
    pub(crate) graces: HashMap<PlayerId, MatchId>,
    /// Opponent of each player's last casual match.
    pub(crate) last_opponent: HashMap<PlayerId, PlayerId>,
    pub(crate) rematch: RematchBook,
    pub(crate) sink: Arc<dyn OutcomeSink>,
    pub(crate) rng: StdRng,
    pub(crate) budget: TickBudget,
    /// Bracket results to deliver once the current call unwinds.
    pub(crate) results: VecDeque<(TournamentId, MatchId, PlayerId)>,
    /// Players whose link failed mid-call.
    pub(crate) dropped: VecDeque<PlayerId>,
    /// A match ended, so withheld rematches may start now.
    pub(crate) rematch_due: bool,
}

impl Core {
    /// Queues `msg` for `to`. A dead link queues the player for the
    /// disconnect path; an offline player is skipped.
    pub(crate) fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        match self.sessions.send(to, msg) {
            Ok(()) => {}
            Err(e) if e.is_connection_loss() => {
                tracing::warn!(player_id = %to, error = %e, "send failed, treating as disconnect");
                if !self.dropped.contains(&to) {
                    self.dropped.push_back(to);
                }
            }
            Err(e) => tracing::debug!(player_id = %to, error = %e, "message not delivered"),
        }
    }

    pub(crate) fn send_both(&mut self, (left, right): (PlayerId, PlayerId), msg: ServerMessage) {
        self.send(left, msg.clone());
        self.send(right, msg);
    }

    pub(crate) fn name_of(&self, player: PlayerId) -> String {
        self.sessions
            .display_name(player)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Player {}", player.0))
    }

    pub(crate) fn contender(&self, player: PlayerId) -> Contender {
        Contender::new(player, self.name_of(player))
    }
}

/// The match and tournament engine.
pub struct Engine {
    pub(crate) core: Core,
    pub(crate) tournaments: TournamentRegistry,
    /// Tournament codes and draws. Kept apart from the match RNG so the
    /// two can be borrowed together.
    rng: StdRng,
}

impl Engine {
    pub fn new(config: EngineConfig, sink: Arc<dyn OutcomeSink>) -> Self {
        let mut config = config;
        config.tick = config.tick.validated();
        let (match_rng, draw_rng) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
        };
        let core = Core {
            sessions: SessionRegistry::new(),
            matches: MatchRegistry::new(config.match_config.clone()),
            timers: TimerQueue::new(),
            subscriptions: HashMap::new(),
            graces: HashMap::new(),
            last_opponent: HashMap::new(),
            rematch: RematchBook::default(),
            sink,
            rng: match_rng,
            budget: TickBudget::new(&config.tick),
            results: VecDeque::new(),
            dropped: VecDeque::new(),
            rematch_due: false,
            config: config.clone(),
        };
        Self {
            core,
            tournaments: TournamentRegistry::new(config.tournament),
            rng: draw_rng,
        }
    }

    // =====================================================================
    // Introspection
    // =====================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.core.sessions
    }

    pub fn matches(&self) -> &MatchRegistry {
        &self.core.matches
    }

    pub fn match_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.core.matches.get_mut(id)
    }

    pub fn tournament(&self, id: &TournamentId) -> Option<&Tournament> {
        self.tournaments.get(id)
    }

    pub fn tournaments(&self) -> &TournamentRegistry {
        &self.tournaments
    }

    pub fn current_match_of(&self, player: PlayerId) -> Option<MatchId> {
        self.core.sessions.current_match_of(player)
    }

    /// Whether `player` dropped out of a match and may still come back.
    pub fn is_awaiting_reconnect(&self, player: PlayerId) -> bool {
        self.core.graces.contains_key(&player)
    }

    pub fn tick_metrics(&self) -> &TickMetrics {
        self.core.budget.metrics()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            players: self.core.sessions.len(),
            matches: self.core.matches.len(),
            tournaments: self.tournaments.len(),
        }
    }

    /// Earliest pending timer; the owner should call [`advance`] then.
    ///
    /// [`advance`]: Self::advance
    pub fn next_deadline(&self) -> Option<Instant> {
        self.core.timers.next_deadline()
    }

    // =====================================================================
    // Connections
    // =====================================================================

    /// Binds an authenticated connection. Doubles as the reconnect path.
    pub fn connect(&mut self, link: Arc<dyn Outbound>, identity: Identity, now: Instant) -> Binding {
        let binding = self
            .core
            .sessions
            .bind(link, identity.id, identity.display_name);
        let player = binding.player_id;

        if let Some(match_id) = self.core.sessions.current_match_of(player) {
            if !self.core.matches.contains(match_id) {
                self.core.sessions.leave_match(player, match_id);
                tracing::info!(player_id = %player, %match_id, "cleared stale match mapping");
            }
        }
        self.core.reconnected(player);
        self.settle(now);
        binding
    }

    /// The connection went away. Ignored unless it is the player's current
    /// one.
    pub fn disconnect(&mut self, conn: ConnectionId, now: Instant) {
        let Some(player) = self.core.sessions.resolve(conn).map(|p| p.id) else {
            tracing::debug!(%conn, "disconnect of an unbound connection");
            return;
        };
        self.connection_lost(player, now);
        self.settle(now);
    }

    // =====================================================================
    // Inbound messages
    // =====================================================================

    /// Routes one inbound message. A `startGame` comes back as a
    /// [`LobbyRequest`] for the caller to resolve off the engine; its
    /// answer goes to [`resolve_lobby`](Self::resolve_lobby).
    pub fn handle(
        &mut self,
        link: &Arc<dyn Outbound>,
        msg: ClientMessage,
        now: Instant,
    ) -> Option<LobbyRequest> {
        let player = self.sender_of(link, &msg)?;
        tracing::debug!(player_id = %player, kind = msg.kind(), "message received");

        let mut lobby = None;
        match msg {
            ClientMessage::Input {
                paddle_up,
                paddle_down,
                ..
            } => self.core.apply_input(
                player,
                paddle_up.unwrap_or(false),
                paddle_down.unwrap_or(false),
            ),
            ClientMessage::StartGame { lobby_key } => {
                lobby = self.core.lobby_request(player, &lobby_key);
            }
            ClientMessage::RequestRematch => self.core.request_rematch(player, now),
            ClientMessage::PauseGame => self.core.request_pause(player, true),
            ClientMessage::ResumeGame => self.core.request_pause(player, false),
            other => self.tournament_request(player, other, now),
        }
        self.settle(now);
        lobby
    }

    /// The player behind `link`. An input from an unknown connection that
    /// names a known player re-binds that player to it.
    fn sender_of(&mut self, link: &Arc<dyn Outbound>, msg: &ClientMessage) -> Option<PlayerId> {
        let conn = link.connection_id();
        if let Some(player) = self.core.sessions.resolve(conn) {
            return Some(player.id);
        }
        let ClientMessage::Input {
            player_id: Some(declared),
            ..
        } = msg
        else {
            tracing::debug!(%conn, kind = msg.kind(), "message from unbound connection dropped");
            return None;
        };
        match self.core.sessions.rebind(Arc::clone(link), *declared) {
            Some(player) => {
                let id = player.id;
                tracing::info!(player_id = %id, %conn, "player recovered from declared id");
                self.core.reconnected(id);
                Some(id)
            }
            None => {
                tracing::debug!(%conn, declared = %declared, "declared player unknown, input dropped");
                None
            }
        }
    }

    fn tournament_request(&mut self, player: PlayerId, msg: ClientMessage, now: Instant) {
        let entrant = Entrant::new(player, self.core.name_of(player));
        let mut host = HostCtx::new(&mut self.core, now);
        let (id, result, failure) = match msg {
            ClientMessage::CreateTournament => {
                let id = self.tournaments.create(&mut host, entrant, &mut self.rng);
                tracing::info!(player_id = %player, tournament_id = %id, "tournament created");
                return;
            }
            ClientMessage::JoinTournament { tournament_id } => {
                let result = self.tournaments.join(&mut host, &tournament_id, entrant);
                (tournament_id, result, "Failed to join tournament.")
            }
            ClientMessage::SetTournamentReady {
                tournament_id,
                ready,
            } => {
                let result =
                    self.tournaments
                        .set_ready(&mut host, &tournament_id, player, ready, &mut self.rng);
                (tournament_id, result, "Failed to set ready status.")
            }
            ClientMessage::RejoinTournament { tournament_id } => {
                let result = self.tournaments.rejoin(&mut host, &tournament_id, entrant);
                (tournament_id, result, "Failed to rejoin tournament.")
            }
            ClientMessage::LeaveTournament { tournament_id } => {
                let result = self.tournaments.leave(&mut host, &tournament_id, player);
                (tournament_id, result, "Failed to leave tournament.")
            }
            other => {
                tracing::debug!(player_id = %player, kind = other.kind(), "not a tournament request");
                return;
            }
        };
        if let Err(e) = result {
            refuse(&mut host, player, id, failure, &e);
        }
    }

    // =====================================================================
    // Lobby
    // =====================================================================

    /// Finishes a `startGame` once the lobby service has answered.
    pub fn resolve_lobby(
        &mut self,
        request: LobbyRequest,
        result: Result<LobbyInfo, LobbyError>,
        now: Instant,
    ) {
        let LobbyRequest { player, key } = request;
        match result {
            Ok(info) => match self.core.check_lobby_start(player, &key, info) {
                Ok(opponent) => {
                    let (a, b) = (self.core.contender(player), self.core.contender(opponent));
                    self.core.start_match(a, b, MatchKind::Casual, now);
                }
                Err(reason) => {
                    tracing::debug!(player_id = %player, lobby_key = key.as_str(), reason, "start refused");
                    self.core.send(player, ServerMessage::error(reason));
                }
            },
            Err(e) => {
                tracing::warn!(player_id = %player, lobby_key = key.as_str(), error = %e, "lobby lookup failed");
                self.core
                    .send(player, ServerMessage::error("Could not reach the lobby service."));
            }
        }
        self.settle(now);
    }

    // =====================================================================
    // Timers
    // =====================================================================

    /// Fires every timer due at `now`, in deadline order.
    pub fn advance(&mut self, now: Instant) {
        while let Some((timer, due)) = self.core.timers.pop_due(now) {
            match timer {
                Timer::MatchTick(id) => self.core.tick_match(id, due, now),
                Timer::BallReset(id) => self.core.reset_ball(id),
                Timer::Grace(player) => self.core.grace_expired(player),
                Timer::Tournament(timer) => {
                    let mut host = HostCtx::new(&mut self.core, now);
                    self.tournaments.on_timer(&mut host, &timer);
                }
            }
            self.settle(now);
        }
    }

    /// Drains the follow-ups queued during a call: bracket results, dead
    /// links and withheld rematches. Each may queue more.
    fn settle(&mut self, now: Instant) {
        loop {
            if let Some((tournament, match_id, winner)) = self.core.results.pop_front() {
                let mut host = HostCtx::new(&mut self.core, now);
                self.tournaments
                    .match_finished(&mut host, &tournament, match_id, winner);
            } else if let Some(player) = self.core.dropped.pop_front() {
                self.connection_lost(player, now);
            } else if std::mem::take(&mut self.core.rematch_due) {
                self.core.recheck_rematches(now);
            } else {
                break;
            }
        }
    }
}

fn refuse(host: &mut HostCtx<'_>, player: PlayerId, id: TournamentId, message: &str, error: &TournamentError) {
    use rally_tournament::TournamentHost;

    tracing::debug!(player_id = %player, tournament_id = %id, error = %error, "tournament request refused");
    host.send(
        player,
        ServerMessage::TournamentUpdate {
            tournament_id: id,
            status: UpdateStatus::Error,
            message: message.to_string(),
        },
    );
}

impl Core {
    fn lobby_request(&mut self, player: PlayerId, raw: &str) -> Option<LobbyRequest> {
        let key = match LobbyKey::parse(raw) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(player_id = %player, error = %e, "bad lobby key");
                self.send(player, ServerMessage::error("Invalid lobby key."));
                return None;
            }
        };
        if !key.contains(player) {
            self.send(player, ServerMessage::error("You are not part of this lobby."));
            return None;
        }
        if self.sessions.is_in_match(player) {
            self.send(player, ServerMessage::error("You are already in a match."));
            return None;
        }
        Some(LobbyRequest { player, key })
    }

    /// Returns the opponent to start against, or why not.
    fn check_lobby_start(
        &self,
        player: PlayerId,
        key: &LobbyKey,
        info: LobbyInfo,
    ) -> Result<PlayerId, &'static str> {
        let opponent = key
            .opponent_of(player)
            .ok_or("You are not part of this lobby.")?;
        if !info.is_challenger {
            return Err("Only the challenger can start the game.");
        }
        if !info.opponent_ready {
            return Err("Opponent is not ready.");
        }
        if !self.sessions.is_connected(opponent) {
            return Err("Opponent is not connected.");
        }
        if self.sessions.is_in_match(player) || self.sessions.is_in_match(opponent) {
            return Err("A player is already in a match.");
        }
        Ok(opponent)
    }
}
