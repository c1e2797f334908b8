//! Engine scenarios driven with explicit instants and channel links.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rally::{Engine, EngineConfig, LobbyError, LobbyInfo, RecordingSink, TournamentDisconnectPolicy};
use rally_protocol::{ClientMessage, MatchId, PlayerId, ServerMessage, TournamentId, UpdateStatus};
use rally_session::{ChannelOutbound, Identity, Outbound};
use rally_transport::ConnectionId;
use tokio::sync::mpsc::UnboundedReceiver;

const TICK: Duration = Duration::from_nanos(16_666_667);

struct Client {
    id: PlayerId,
    link: Arc<dyn Outbound>,
    rx: UnboundedReceiver<ServerMessage>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }
}

struct Harness {
    engine: Engine,
    sink: RecordingSink,
    now: Instant,
    next_conn: u64,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: EngineConfig) -> Self {
        let sink = RecordingSink::new();
        Self {
            engine: Engine::new(config, Arc::new(sink.clone())),
            sink,
            now: Instant::now(),
            next_conn: 1,
        }
    }

    fn connect(&mut self, id: u64) -> Client {
        let conn = ConnectionId::new(self.next_conn);
        self.next_conn += 1;
        let (link, rx) = ChannelOutbound::new(conn);
        let link: Arc<dyn Outbound> = Arc::new(link);
        self.engine.connect(
            Arc::clone(&link),
            Identity {
                id: PlayerId(id),
                display_name: format!("player{id}"),
            },
            self.now,
        );
        Client {
            id: PlayerId(id),
            link,
            rx,
        }
    }

    fn send(&mut self, client: &Client, msg: ClientMessage) {
        let lobby = self.engine.handle(&client.link, msg, self.now);
        assert!(lobby.is_none(), "unexpected lobby request");
    }

    fn disconnect(&mut self, client: &Client) {
        self.engine.disconnect(client.link.connection_id(), self.now);
    }

    /// Starts a casual match as `a`, the lobby's challenger.
    fn start_casual(&mut self, a: &Client, b: &Client) -> MatchId {
        let request = self
            .engine
            .handle(
                &a.link,
                ClientMessage::StartGame {
                    lobby_key: format!("{}-{}", a.id.0, b.id.0),
                },
                self.now,
            )
            .expect("lobby request");
        self.engine.resolve_lobby(
            request,
            Ok(LobbyInfo {
                is_challenger: true,
                opponent_ready: true,
            }),
            self.now,
        );
        self.engine.current_match_of(a.id).expect("match started")
    }

    fn elapse(&mut self, by: Duration) {
        self.now += by;
        self.engine.advance(self.now);
    }

    fn ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.elapse(TICK);
        }
    }

    /// Puts the ball one frame from crossing the right edge.
    fn ball_about_to_score_left(&mut self, id: MatchId) {
        let game = self.engine.match_mut(id).expect("live match");
        let ball = game.ball_mut();
        ball.x = 1015.0;
        ball.y = 200.0;
        ball.dx = 5.0;
        ball.dy = 0.0;
    }
}

fn test_config() -> EngineConfig {
    let mut config = EngineConfig {
        seed: Some(7),
        ..EngineConfig::default()
    };
    config.match_config.countdown_secs = 0;
    config.match_config.max_score = 2;
    config.disconnect_grace = Duration::from_secs(10);
    config
}

fn tournament_created(msgs: &[ServerMessage]) -> Option<TournamentId> {
    msgs.iter().find_map(|m| match m {
        ServerMessage::TournamentUpdate {
            tournament_id,
            status: UpdateStatus::Created,
            ..
        } => Some(tournament_id.clone()),
        _ => None,
    })
}

// =========================================================================
// Casual start
// =========================================================================

#[test]
fn test_start_game_via_lobby_starts_match_for_both() {
    let mut h = Harness::new();
    let mut a = h.connect(5);
    let mut b = h.connect(3);

    let id = h.start_casual(&a, &b);

    assert_eq!(h.engine.current_match_of(b.id), Some(id));
    let game = h.engine.matches().get(id).unwrap();
    assert_eq!(game.players(), (PlayerId(3), PlayerId(5)), "lower id on the left");
    assert_eq!(a.drain(), vec![ServerMessage::GameStart]);
    assert_eq!(b.drain(), vec![ServerMessage::GameStart]);
}

#[test]
fn test_start_game_by_non_challenger_is_refused() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let _b = h.connect(2);

    let request = h
        .engine
        .handle(&a.link, ClientMessage::StartGame { lobby_key: "1-2".into() }, h.now)
        .unwrap();
    h.engine.resolve_lobby(
        request,
        Ok(LobbyInfo {
            is_challenger: false,
            opponent_ready: true,
        }),
        h.now,
    );

    assert!(h.engine.matches().is_empty());
    assert_eq!(
        a.drain(),
        vec![ServerMessage::error("Only the challenger can start the game.")]
    );
}

#[test]
fn test_start_game_with_offline_opponent_is_refused() {
    let mut h = Harness::new();
    let mut a = h.connect(1);

    let request = h
        .engine
        .handle(&a.link, ClientMessage::StartGame { lobby_key: "1-2".into() }, h.now)
        .unwrap();
    h.engine.resolve_lobby(
        request,
        Ok(LobbyInfo {
            is_challenger: true,
            opponent_ready: true,
        }),
        h.now,
    );

    assert!(h.engine.matches().is_empty());
    assert_eq!(a.drain(), vec![ServerMessage::error("Opponent is not connected.")]);
}

#[test]
fn test_start_game_malformed_key_sends_error_without_lookup() {
    let mut h = Harness::new();
    let mut a = h.connect(1);

    let lobby = h.engine.handle(
        &a.link,
        ClientMessage::StartGame { lobby_key: "one-two".into() },
        h.now,
    );

    assert!(lobby.is_none());
    assert_eq!(a.drain(), vec![ServerMessage::error("Invalid lobby key.")]);
}

#[test]
fn test_start_game_for_foreign_lobby_is_refused() {
    let mut h = Harness::new();
    let mut a = h.connect(1);

    let lobby = h.engine.handle(
        &a.link,
        ClientMessage::StartGame { lobby_key: "2-3".into() },
        h.now,
    );

    assert!(lobby.is_none());
    assert_eq!(a.drain(), vec![ServerMessage::error("You are not part of this lobby.")]);
}

#[test]
fn test_lobby_failure_reports_error_and_leaves_players_free() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let _b = h.connect(2);

    let request = h
        .engine
        .handle(&a.link, ClientMessage::StartGame { lobby_key: "1-2".into() }, h.now)
        .unwrap();
    h.engine
        .resolve_lobby(request, Err(LobbyError::Status(503)), h.now);

    assert!(h.engine.current_match_of(a.id).is_none());
    assert_eq!(
        a.drain(),
        vec![ServerMessage::error("Could not reach the lobby service.")]
    );
}

// =========================================================================
// Ticking and teardown
// =========================================================================

#[test]
fn test_tick_streams_state_every_third_frame() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let b = h.connect(2);
    h.start_casual(&a, &b);
    a.drain();

    h.ticks(3);

    let states = a
        .drain()
        .into_iter()
        .filter(|m| matches!(m, ServerMessage::State { .. }))
        .count();
    assert_eq!(states, 1);
}

#[test]
fn test_score_limit_ends_match_and_records_history() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);

    h.ball_about_to_score_left(id);
    h.ticks(1);
    h.elapse(Duration::from_millis(400));
    h.ball_about_to_score_left(id);
    h.ticks(1);

    assert!(h.engine.matches().get(id).is_none());
    assert!(h.engine.current_match_of(a.id).is_none());
    assert!(h.engine.current_match_of(b.id).is_none());

    let last = a.drain().pop().expect("final frame");
    match last {
        ServerMessage::State { state } => {
            assert!(state.game_over);
            assert_eq!(state.player.score, 2);
        }
        other => panic!("expected final state, got {other:?}"),
    }
    let last_b = b.drain().pop().unwrap();
    assert!(matches!(last_b, ServerMessage::State { state } if state.game_over && state.opponent.score == 2));

    let history = h.sink.matches();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].player1_score, 2);
    assert_eq!(history[0].player2_score, 0);
    assert_eq!(history[0].match_type, "online");
}

#[test]
fn test_point_schedules_serve_after_reset_delay() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let b = h.connect(2);
    let id = h.start_casual(&a, &b);

    h.ball_about_to_score_left(id);
    h.ticks(1);
    assert!(a.drain().iter().any(|m| matches!(
        m,
        ServerMessage::BallSync { left_score: 1, right_score: 0, .. }
    )));

    h.elapse(Duration::from_millis(400));
    let serve = a
        .drain()
        .into_iter()
        .find(|m| matches!(m, ServerMessage::BallSync { event: rally_protocol::SyncEvent::Reset, .. }));
    assert!(serve.is_some(), "serve after reset delay");
    let ball = h.engine.matches().get(id).unwrap().ball();
    assert!(!ball.resetting);
}

#[test]
fn test_input_moves_only_senders_paddle() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    let id = h.start_casual(&a, &b);

    h.send(
        &a,
        ClientMessage::Input {
            player_id: None,
            paddle_up: Some(true),
            paddle_down: None,
        },
    );

    let game = h.engine.matches().get(id).unwrap();
    assert!(game.slot(rally_protocol::Side::Left).paddle.dy < 0.0);
    assert_eq!(game.slot(rally_protocol::Side::Right).paddle.dy, 0.0);
}

// =========================================================================
// Pause
// =========================================================================

#[test]
fn test_pause_and_resume_notify_both_players() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    a.drain();
    b.drain();

    h.send(&b, ClientMessage::PauseGame);
    let paused = ServerMessage::PauseUpdate {
        paused: true,
        message: None,
    };
    assert_eq!(a.drain(), vec![paused.clone()]);
    assert_eq!(b.drain(), vec![paused]);

    let before = h.engine.matches().get(id).unwrap().ball().x;
    h.ticks(2);
    assert_eq!(h.engine.matches().get(id).unwrap().ball().x, before);

    h.send(&a, ClientMessage::ResumeGame);
    assert!(a.drain().contains(&ServerMessage::PauseUpdate {
        paused: false,
        message: None
    }));
}

// =========================================================================
// Disconnect supervision
// =========================================================================

#[test]
fn test_disconnect_pauses_match_and_reconnect_resumes() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    b.drain();

    h.disconnect(&a);

    assert!(h.engine.is_awaiting_reconnect(a.id));
    let game = h.engine.matches().get(id).unwrap();
    assert_eq!(game.held_for(), Some(a.id));
    assert_eq!(
        b.drain(),
        vec![ServerMessage::OpponentDisconnecting {
            grace_period_ms: 10_000,
            message: "Opponent disconnected. Waiting 10s for reconnect...".into(),
        }]
    );

    h.elapse(Duration::from_secs(4));
    let mut a2 = h.connect(1);

    assert!(!h.engine.is_awaiting_reconnect(a.id));
    assert_eq!(h.engine.current_match_of(a.id), Some(id));
    let resumed = ServerMessage::PauseUpdate {
        paused: false,
        message: Some("Opponent reconnected".into()),
    };
    assert!(a2.drain().contains(&resumed));
    assert!(b.drain().contains(&resumed));

    h.elapse(Duration::from_secs(10));
    assert!(h.engine.matches().get(id).is_some(), "grace timer was cancelled");
}

#[test]
fn test_requested_pause_survives_opponent_reconnect() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    h.send(&a, ClientMessage::PauseGame);

    h.disconnect(&b);
    h.elapse(Duration::from_secs(2));
    let mut b2 = h.connect(2);

    let game = h.engine.matches().get(id).unwrap();
    assert_eq!(game.phase(), rally_match::MatchPhase::Paused);
    assert_eq!(game.held_for(), None);
    assert!(game.pause_requested());
    let still_paused = ServerMessage::PauseUpdate {
        paused: true,
        message: Some("Opponent reconnected".into()),
    };
    assert!(b2.drain().contains(&still_paused));
    b.drain();

    h.send(&a, ClientMessage::ResumeGame);
    assert_eq!(
        h.engine.matches().get(id).unwrap().phase(),
        rally_match::MatchPhase::Playing
    );
}

#[test]
fn test_reconnect_twice_resumes_once() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    b.drain();

    h.disconnect(&a);
    h.elapse(Duration::from_secs(1));
    let _a2 = h.connect(1);
    h.elapse(Duration::from_secs(1));
    let _a3 = h.connect(1);

    let resumes = b
        .drain()
        .into_iter()
        .filter(|m| matches!(m, ServerMessage::PauseUpdate { paused: false, .. }))
        .count();
    assert_eq!(resumes, 1);
    assert_eq!(h.engine.sessions().len(), 2, "no duplicate player");
    assert_eq!(h.engine.current_match_of(a.id), Some(id));
    assert_eq!(
        h.engine.matches().get(id).unwrap().phase(),
        rally_match::MatchPhase::Playing
    );
}

#[test]
fn test_resume_refused_while_opponent_away() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    let id = h.start_casual(&a, &b);

    h.disconnect(&a);
    h.send(&b, ClientMessage::ResumeGame);

    let game = h.engine.matches().get(id).unwrap();
    assert_eq!(game.held_for(), Some(a.id));
    assert_eq!(game.phase(), rally_match::MatchPhase::Paused);
}

#[test]
fn test_grace_expiry_forfeits_absent_player() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    b.drain();

    h.disconnect(&a);
    h.elapse(Duration::from_secs(10));

    assert!(h.engine.matches().get(id).is_none());
    assert!(b.drain().contains(&ServerMessage::OpponentDisconnected {
        message: "Opponent disconnected - you win!".into()
    }));
    assert!(!h.engine.sessions().contains(a.id), "absent player is forgotten");
    assert!(h.engine.current_match_of(b.id).is_none());
    assert_eq!(h.sink.matches().len(), 1);
}

#[test]
fn test_both_players_away_keeps_first_as_holder() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    let id = h.start_casual(&a, &b);

    h.disconnect(&a);
    h.disconnect(&b);
    assert_eq!(h.engine.matches().get(id).unwrap().held_for(), Some(a.id));

    let _a2 = h.connect(1);
    let game = h.engine.matches().get(id).unwrap();
    assert_eq!(game.phase(), rally_match::MatchPhase::Paused, "still waiting for b");
    assert_eq!(game.held_for(), Some(b.id));
}

#[test]
fn test_dead_link_is_treated_as_disconnect() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    h.start_casual(&a, &b);
    b.drain();

    let Client { link, rx, .. } = a;
    drop(rx);
    h.ticks(3);

    assert!(h.engine.is_awaiting_reconnect(PlayerId(1)));
    assert!(
        b.drain()
            .iter()
            .any(|m| matches!(m, ServerMessage::OpponentDisconnecting { .. }))
    );
    assert!(h.engine.sessions().resolve(link.connection_id()).is_none());
}

#[test]
fn test_disconnect_outside_match_forgets_player() {
    let mut h = Harness::new();
    let a = h.connect(1);

    h.disconnect(&a);

    assert!(!h.engine.sessions().contains(a.id));
}

#[test]
fn test_input_from_unknown_connection_recovers_declared_player() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    let id = h.start_casual(&a, &b);
    h.disconnect(&a);

    let (fresh, mut rx) = ChannelOutbound::new(ConnectionId::new(99));
    let fresh: Arc<dyn Outbound> = Arc::new(fresh);
    h.engine.handle(
        &fresh,
        ClientMessage::Input {
            player_id: Some(a.id),
            paddle_up: None,
            paddle_down: Some(true),
        },
        h.now,
    );

    assert_eq!(
        h.engine.sessions().resolve(ConnectionId::new(99)).map(|p| p.id),
        Some(a.id)
    );
    assert!(!h.engine.is_awaiting_reconnect(a.id));
    let game = h.engine.matches().get(id).unwrap();
    assert!(game.slot(rally_protocol::Side::Left).paddle.dy > 0.0);
    assert!(rx.try_recv().is_ok(), "recovered link receives updates");
}

#[test]
fn test_unknown_connection_without_declared_id_is_dropped() {
    let mut h = Harness::new();
    let (stray, mut rx) = ChannelOutbound::new(ConnectionId::new(42));
    let stray: Arc<dyn Outbound> = Arc::new(stray);

    let lobby = h.engine.handle(&stray, ClientMessage::CreateTournament, h.now);

    assert!(lobby.is_none());
    assert!(h.engine.tournaments().is_empty());
    assert!(rx.try_recv().is_err());
}

// =========================================================================
// Rematch
// =========================================================================

fn finish_casual(h: &mut Harness, a: &Client) {
    h.disconnect(a);
    h.elapse(Duration::from_secs(10));
}

/// Scores the two points that end a match, left side winning.
fn play_out(h: &mut Harness, id: MatchId) {
    h.ball_about_to_score_left(id);
    h.ticks(1);
    h.elapse(Duration::from_millis(400));
    h.ball_about_to_score_left(id);
    h.ticks(1);
    assert!(h.engine.matches().get(id).is_none(), "match should be over");
}

#[test]
fn test_rematch_starts_once_both_ask() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let mut b = h.connect(2);
    let id = h.start_casual(&a, &b);
    play_out(&mut h, id);
    b.drain();

    h.send(&a, ClientMessage::RequestRematch);
    assert_eq!(b.drain(), vec![ServerMessage::RematchRequest]);
    assert!(h.engine.matches().is_empty());

    h.send(&b, ClientMessage::RequestRematch);
    let msgs = b.drain();
    assert!(msgs.contains(&ServerMessage::RematchAccepted));
    assert!(msgs.contains(&ServerMessage::GameStart));
    assert_eq!(h.engine.matches().len(), 1);
}

#[test]
fn test_rematch_starts_after_partner_frees_up() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    let c = h.connect(3);
    let first = h.start_casual(&a, &b);
    play_out(&mut h, first);

    let busy = h.start_casual(&b, &c);
    h.send(&a, ClientMessage::RequestRematch);
    h.send(&b, ClientMessage::RequestRematch);

    assert_eq!(h.engine.matches().len(), 1, "rematch withheld while b plays");
    assert!(h.engine.current_match_of(a.id).is_none());

    play_out(&mut h, busy);

    let rematch = h.engine.current_match_of(a.id).expect("rematch started");
    assert_eq!(h.engine.current_match_of(b.id), Some(rematch));
    assert!(h.engine.current_match_of(c.id).is_none());
    assert_eq!(h.engine.matches().len(), 1);
}

#[test]
fn test_rematch_without_previous_opponent_is_ignored() {
    let mut h = Harness::new();
    let mut a = h.connect(1);

    h.send(&a, ClientMessage::RequestRematch);

    assert!(a.drain().is_empty());
}

#[test]
fn test_rematch_with_departed_opponent_is_ignored() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    h.start_casual(&a, &b);
    finish_casual(&mut h, &a);

    h.send(&b, ClientMessage::RequestRematch);

    assert!(h.engine.matches().is_empty());
}

// =========================================================================
// Tournaments
// =========================================================================

fn start_tournament(h: &mut Harness) -> (TournamentId, Vec<Client>) {
    let mut clients: Vec<Client> = (1..=4).map(|id| h.connect(id)).collect();
    h.send(&clients[0], ClientMessage::CreateTournament);
    let id = tournament_created(&clients[0].drain()).expect("created");
    for c in &clients[1..] {
        h.send(
            c,
            ClientMessage::JoinTournament {
                tournament_id: id.clone(),
            },
        );
    }
    for c in &clients {
        h.send(
            c,
            ClientMessage::SetTournamentReady {
                tournament_id: id.clone(),
                ready: true,
            },
        );
    }
    for c in &mut clients {
        c.drain();
    }
    (id, clients)
}

#[test]
fn test_tournament_start_runs_two_bracket_matches() {
    let mut h = Harness::new();
    let (id, clients) = start_tournament(&mut h);

    assert_eq!(h.engine.matches().len(), 2);
    for c in &clients {
        assert!(h.engine.current_match_of(c.id).is_some());
    }
    assert_eq!(
        h.engine.tournament(&id).unwrap().status(),
        rally_protocol::TournamentStatus::InProgress
    );
}

#[test]
fn test_tournament_disconnect_forfeits_without_grace() {
    let mut h = Harness::new();
    let (id, mut clients) = start_tournament(&mut h);
    let quitter = clients[0].id;
    let match_id = h.engine.current_match_of(quitter).unwrap();
    let opponent = h.engine.matches().get(match_id).unwrap().opponent_of(quitter).unwrap();

    h.engine.disconnect(clients[0].link.connection_id(), h.now);

    assert!(!h.engine.is_awaiting_reconnect(quitter));
    assert!(h.engine.matches().get(match_id).is_none());
    let winner = clients.iter_mut().find(|c| c.id == opponent).unwrap();
    assert!(winner.drain().contains(&ServerMessage::GameOver {
        won: true,
        reason: "forfeit".into(),
        message: "You win! Opponent disconnect.".into(),
    }));
    let history = h.sink.matches();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].match_type, "tournament");
    assert!(h.engine.tournament(&id).is_some());
}

#[test]
fn test_tournament_grace_policy_holds_bracket_match() {
    let mut config = test_config();
    config.tournament_disconnect = TournamentDisconnectPolicy::Grace;
    let mut h = Harness::with_config(config);
    let (_, clients) = start_tournament(&mut h);
    let match_id = h.engine.current_match_of(clients[0].id).unwrap();

    h.engine.disconnect(clients[0].link.connection_id(), h.now);

    assert!(h.engine.is_awaiting_reconnect(clients[0].id));
    assert!(h.engine.matches().get(match_id).is_some());
}

#[test]
fn test_tournament_final_produces_champion_record() {
    let mut config = test_config();
    config.match_config.max_score = 1;
    let mut h = Harness::with_config(config);
    let (id, clients) = start_tournament(&mut h);

    let first_round: Vec<MatchId> = h.engine.matches().ids().collect();
    for m in first_round {
        h.ball_about_to_score_left(m);
    }
    h.ticks(1);
    assert!(h.engine.matches().is_empty());

    let finalists: Vec<&Client> = clients
        .iter()
        .filter(|c| {
            h.engine
                .tournament(&id)
                .unwrap()
                .bracket()
                .current()
                .iter()
                .any(|m| m.involves(c.id))
        })
        .collect();
    assert_eq!(finalists.len(), 2);
    for c in &finalists {
        h.send(
            c,
            ClientMessage::SetTournamentReady {
                tournament_id: id.clone(),
                ready: true,
            },
        );
    }
    let final_match = h.engine.current_match_of(finalists[0].id).expect("final running");
    h.ball_about_to_score_left(final_match);
    h.ticks(1);

    let records = h.sink.tournaments();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rounds, vec![2, 1]);
    assert_eq!(h.sink.matches().len(), 3);
    assert!(h.engine.tournament(&id).is_none(), "completed tournament is swept");
}

#[test]
fn test_tournament_join_after_start_reports_error() {
    let mut h = Harness::new();
    let (id, _clients) = start_tournament(&mut h);
    let mut late = h.connect(9);

    h.send(
        &late,
        ClientMessage::JoinTournament {
            tournament_id: id.clone(),
        },
    );

    assert!(late.drain().contains(&ServerMessage::TournamentUpdate {
        tournament_id: id,
        status: UpdateStatus::Error,
        message: "Failed to join tournament.".into(),
    }));
}

#[test]
fn test_leave_unknown_tournament_reports_error() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let id = TournamentId::new("zzzz");

    h.send(
        &a,
        ClientMessage::LeaveTournament {
            tournament_id: id.clone(),
        },
    );

    assert_eq!(
        a.drain(),
        vec![ServerMessage::TournamentUpdate {
            tournament_id: id,
            status: UpdateStatus::Error,
            message: "Failed to leave tournament.".into(),
        }]
    );
}

#[test]
fn test_join_with_blank_code_is_refused() {
    let mut h = Harness::new();
    let mut a = h.connect(1);
    let id = TournamentId::new("");

    h.send(
        &a,
        ClientMessage::JoinTournament {
            tournament_id: id.clone(),
        },
    );

    assert!(h.engine.tournaments().is_empty());
    assert_eq!(
        a.drain(),
        vec![ServerMessage::TournamentUpdate {
            tournament_id: id,
            status: UpdateStatus::Error,
            message: "Failed to join tournament.".into(),
        }]
    );
}

#[test]
fn test_stats_counts_live_state() {
    let mut h = Harness::new();
    let a = h.connect(1);
    let b = h.connect(2);
    h.start_casual(&a, &b);

    let stats = h.engine.stats();
    assert_eq!(stats.players, 2);
    assert_eq!(stats.matches, 1);
    assert_eq!(stats.tournaments, 0);
    assert!(h.engine.next_deadline().is_some());
}
