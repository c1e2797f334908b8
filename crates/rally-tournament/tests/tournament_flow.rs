//! Integration tests driving tournaments through a recording host.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rally_protocol::{MatchId, PlayerId, ServerMessage, TournamentId, TournamentStatus, UpdateStatus};
use rally_tournament::{
    CODE_ALPHABET, CODE_LEN, Entrant, TournamentError, TournamentHost, TournamentRecord,
    TournamentRegistry, TournamentTimer,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

// =========================================================================
// Recording host
// =========================================================================

#[derive(Default)]
struct MockHost {
    sent: Vec<(PlayerId, ServerMessage)>,
    offline: HashSet<PlayerId>,
    busy: HashSet<PlayerId>,
    running: HashMap<MatchId, (PlayerId, PlayerId)>,
    next_match: u64,
    ended: Vec<(MatchId, PlayerId, String)>,
    timers: HashMap<TournamentTimer, Duration>,
    persisted: Vec<TournamentRecord>,
}

impl TournamentHost for MockHost {
    fn send(&mut self, to: PlayerId, msg: ServerMessage) {
        self.sent.push((to, msg));
    }

    fn is_connected(&self, player: PlayerId) -> bool {
        !self.offline.contains(&player)
    }

    fn is_in_match(&self, player: PlayerId) -> bool {
        self.busy.contains(&player)
            || self.running.values().any(|&(l, r)| l == player || r == player)
    }

    fn start_match(&mut self, _: &TournamentId, left: &Entrant, right: &Entrant) -> Option<MatchId> {
        self.next_match += 1;
        let id = MatchId(self.next_match);
        self.running.insert(id, (left.id, right.id));
        Some(id)
    }

    fn end_match(&mut self, match_id: MatchId, loser: PlayerId, reason: &str) {
        self.running.remove(&match_id);
        self.ended.push((match_id, loser, reason.to_string()));
    }

    fn live_score(&self, match_id: MatchId) -> Option<(u32, u32)> {
        self.running.contains_key(&match_id).then_some((0, 0))
    }

    fn schedule(&mut self, timer: TournamentTimer, after: Duration) {
        self.timers.insert(timer, after);
    }

    fn cancel(&mut self, timer: &TournamentTimer) {
        self.timers.remove(timer);
    }

    fn persist(&mut self, record: TournamentRecord) {
        self.persisted.push(record);
    }
}

impl MockHost {
    fn messages_to(&self, player: PlayerId) -> impl Iterator<Item = &ServerMessage> {
        self.sent
            .iter()
            .filter(move |(to, _)| *to == player)
            .map(|(_, msg)| msg)
    }

    fn forfeits(&self) -> Vec<(PlayerId, String)> {
        let mut seen = Vec::new();
        for (_, msg) in &self.sent {
            if let ServerMessage::TournamentForfeit {
                forfeited_player_id,
                reason,
                ..
            } = msg
            {
                let entry = (*forfeited_player_id, reason.clone());
                if !seen.contains(&entry) {
                    seen.push(entry);
                }
            }
        }
        seen
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn entrant(id: u64) -> Entrant {
    Entrant::new(pid(id), format!("p{id}"))
}

struct Fixture {
    reg: TournamentRegistry,
    host: MockHost,
    rng: StdRng,
    id: TournamentId,
}

impl Fixture {
    /// A tournament created by player 1 and joined by 2..=n.
    fn new(n: u64) -> Self {
        let mut reg = TournamentRegistry::default();
        let mut host = MockHost::default();
        let mut rng = StdRng::seed_from_u64(n);
        let id = reg.create(&mut host, entrant(1), &mut rng);
        for p in 2..=n {
            reg.join(&mut host, &id, entrant(p)).unwrap();
        }
        Self { reg, host, rng, id }
    }

    fn ready(&mut self, player: u64, ready: bool) -> Result<(), TournamentError> {
        self.reg
            .set_ready(&mut self.host, &self.id, pid(player), ready, &mut self.rng)
    }

    fn ready_all(&mut self, n: u64) {
        for p in 1..=n {
            self.ready(p, true).unwrap();
        }
    }

    fn status(&self) -> Option<TournamentStatus> {
        self.reg.get(&self.id).map(|t| t.status())
    }

    /// Ends a running match the way the engine does: teardown first, then
    /// the result.
    fn finish(&mut self, match_id: MatchId, winner: PlayerId) {
        self.host.running.remove(&match_id);
        self.reg
            .match_finished(&mut self.host, &self.id, match_id, winner);
    }

    /// Finishes every running match with its left player winning.
    fn finish_all_left(&mut self) -> Vec<PlayerId> {
        let mut running: Vec<(MatchId, (PlayerId, PlayerId))> =
            self.host.running.iter().map(|(k, v)| (*k, *v)).collect();
        running.sort();
        let mut winners = Vec::new();
        for (match_id, (left, _)) in running {
            self.finish(match_id, left);
            winners.push(left);
        }
        winners
    }

    fn finalists(&self) -> (PlayerId, PlayerId) {
        let t = self.reg.get(&self.id).expect("live tournament");
        let slot = &t.bracket().current()[0];
        (
            slot.left.as_ref().map(|e| e.id).expect("left"),
            slot.right.as_ref().map(|e| e.id).expect("right"),
        )
    }
}

// =========================================================================
// Join phase
// =========================================================================

#[test]
fn test_ready_with_invalid_size_reverts_to_created_and_explains() {
    let mut fx = Fixture::new(3);
    fx.ready_all(3);

    assert_eq!(fx.status(), Some(TournamentStatus::Created));
    let expected = "Cannot start - need exactly 4 or 8 players (currently 3). Waiting for more players...";
    for p in 1..=3 {
        assert!(fx.host.messages_to(pid(p)).any(|m| matches!(
            m,
            ServerMessage::TournamentUpdate { status: UpdateStatus::Error, message, .. } if message == expected
        )));
    }

    // Still open: a fourth player can join and start it.
    fx.reg.join(&mut fx.host, &fx.id.clone(), entrant(4)).unwrap();
    fx.ready(4, true).unwrap();
    assert_eq!(fx.status(), Some(TournamentStatus::InProgress));
}

#[test]
fn test_all_ready_four_players_starts_round_one_in_parallel() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);

    assert_eq!(fx.status(), Some(TournamentStatus::InProgress));
    assert_eq!(fx.host.running.len(), 2, "both matches start at once");
    for p in 1..=4 {
        let assignment = fx
            .host
            .messages_to(pid(p))
            .find(|m| matches!(m, ServerMessage::TournamentMatch { .. }));
        assert!(assignment.is_some(), "player {p} told their opponent");
    }
    for (left, right) in fx.host.running.values() {
        assert!(left < right, "lower id plays left");
    }
}

#[test]
fn test_join_after_start_is_refused() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    let err = fx.reg.join(&mut fx.host, &fx.id.clone(), entrant(5)).unwrap_err();
    assert!(matches!(err, TournamentError::Closed { .. }));
}

#[test]
fn test_join_unknown_code_creates_tournament_on_demand() {
    let mut reg = TournamentRegistry::default();
    let mut host = MockHost::default();
    reg.join(&mut host, &TournamentId::new("ab2c"), entrant(7)).unwrap();

    let t = reg.get(&TournamentId::new("AB2C")).expect("created");
    assert_eq!(t.creator(), pid(7));
    assert!(host.messages_to(pid(7)).any(|m| matches!(
        m,
        ServerMessage::TournamentUpdate { status: UpdateStatus::Created, .. }
    )));
}

#[test]
fn test_join_malformed_code_is_refused() {
    let mut reg = TournamentRegistry::default();
    let mut host = MockHost::default();
    for code in ["", "ab", "abcde", "ab-c"] {
        let err = reg
            .join(&mut host, &TournamentId::new(code), entrant(7))
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidCode(_)), "{code:?}");
    }
    assert!(reg.is_empty());
    assert!(host.sent.is_empty());
}

#[test]
fn test_generate_id_uses_four_unambiguous_characters() {
    let reg = TournamentRegistry::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let id = reg.generate_id(&mut rng);
        assert_eq!(id.as_str().len(), CODE_LEN);
        assert!(id.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }
}

#[test]
fn test_leave_before_start_removes_from_roster() {
    let mut fx = Fixture::new(3);
    fx.reg.leave(&mut fx.host, &fx.id.clone(), pid(2)).unwrap();

    let t = fx.reg.get(&fx.id).unwrap();
    assert_eq!(t.roster().len(), 2);
    assert!(!t.contains(pid(2)));
    assert_eq!(fx.host.forfeits(), vec![(pid(2), "left the tournament".to_string())]);
    assert!(fx.host.messages_to(pid(2)).any(|m| matches!(
        m,
        ServerMessage::TournamentUpdate { status: UpdateStatus::Left, .. }
    )));
}

#[test]
fn test_last_player_leaving_before_start_drops_tournament() {
    let mut fx = Fixture::new(2);
    fx.reg.leave(&mut fx.host, &fx.id.clone(), pid(2)).unwrap();
    assert!(fx.reg.get(&fx.id).is_some());

    fx.reg.leave(&mut fx.host, &fx.id.clone(), pid(1)).unwrap();

    assert!(fx.reg.get(&fx.id).is_none());
    assert!(fx.reg.is_empty());
}

#[test]
fn test_set_ready_unknown_player_is_rejected() {
    let mut fx = Fixture::new(2);
    assert!(matches!(
        fx.ready(9, true),
        Err(TournamentError::NotParticipant { .. })
    ));
}

// =========================================================================
// Rounds
// =========================================================================

#[test]
fn test_forfeit_before_match_start_resolves_slot_and_waits_for_rest_of_round() {
    let mut fx = Fixture::new(4);
    // Everyone is still busy elsewhere, so kickoff defers every pairing.
    fx.host.busy = (1..=4).map(pid).collect();
    fx.ready_all(4);
    assert!(fx.host.running.is_empty());
    assert!(fx.host.timers.contains_key(&TournamentTimer::KickoffRetry(fx.id.clone())));

    let opponent = fx
        .reg
        .get(&fx.id)
        .unwrap()
        .bracket()
        .open_match_of(pid(1))
        .and_then(|m| m.opponent_of(pid(1)))
        .map(|e| e.id)
        .unwrap();
    fx.reg.leave(&mut fx.host, &fx.id.clone(), opponent).unwrap();

    let t = fx.reg.get(&fx.id).unwrap();
    assert!(t.bracket().open_match_of(pid(1)).is_none(), "slot decided");
    assert_eq!(t.round(), 1, "other slot still open");

    // The retry starts the remaining pairing once its players are free.
    fx.host.busy.clear();
    fx.reg
        .on_timer(&mut fx.host, &TournamentTimer::KickoffRetry(fx.id.clone()));
    assert_eq!(fx.host.running.len(), 1);

    let winners = fx.finish_all_left();
    let t = fx.reg.get(&fx.id).unwrap();
    assert_eq!(t.round(), 2);
    assert!(t.awaiting_ready());
    let (left, right) = fx.finalists();
    let mut finalists = vec![left, right];
    finalists.sort();
    let mut expected = vec![pid(1), winners[0]];
    expected.sort();
    assert_eq!(finalists, expected);
    assert!(left < right);
}

#[test]
fn test_round_ready_then_final_produces_champion_and_record() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.finish_all_left();

    let (a, b) = fx.finalists();
    assert!(fx.host.messages_to(a).any(|m| matches!(m, ServerMessage::TournamentRoundComplete { round: 2, .. })));

    fx.ready(a.0, true).unwrap();
    let timeout = TournamentTimer::ReadyTimeout(fx.id.clone());
    assert_eq!(fx.host.timers.get(&timeout), Some(&Duration::from_secs(30)));
    assert!(fx.host.messages_to(b).any(|m| matches!(
        m,
        ServerMessage::TournamentReadyTimeout { timeout_seconds: 30, .. }
    )));
    assert!(fx.host.running.is_empty(), "final waits for both players");

    fx.ready(b.0, true).unwrap();
    assert!(!fx.host.timers.contains_key(&timeout), "timeout cancelled");
    assert_eq!(fx.host.running.len(), 1);

    let (final_id, _) = fx.host.running.iter().map(|(k, v)| (*k, *v)).next().unwrap();
    fx.finish(final_id, b);

    assert!(fx.reg.is_empty(), "completed tournament removed");
    assert_eq!(fx.host.persisted.len(), 1);
    let record = &fx.host.persisted[0];
    assert_eq!(record.winner_id, b);
    assert_eq!(record.rounds, vec![2, 1]);
    assert_eq!(record.players.len(), 4);
    for p in 1..=4 {
        assert!(fx.host.messages_to(pid(p)).any(|m| matches!(
            m,
            ServerMessage::TournamentCompleted { winner_id, .. } if *winner_id == b
        )));
    }
}

#[test]
fn test_round_ready_during_running_round_is_ignored() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.ready(1, true).unwrap();
    assert!(!fx.host.timers.contains_key(&TournamentTimer::ReadyTimeout(fx.id.clone())));
}

#[test]
fn test_ready_timeout_forfeits_only_players_not_ready() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.finish_all_left();
    let (a, b) = fx.finalists();

    fx.ready(a.0, true).unwrap();
    fx.reg
        .on_timer(&mut fx.host, &TournamentTimer::ReadyTimeout(fx.id.clone()));

    assert_eq!(fx.host.forfeits(), vec![(b, "ready timeout".to_string())]);
    assert_eq!(fx.host.persisted.len(), 1);
    assert_eq!(fx.host.persisted[0].winner_id, a);
    assert!(fx.host.messages_to(a).any(|m| matches!(m, ServerMessage::GameOver { won: true, .. })));
}

#[test]
fn test_stale_kickoff_retry_after_completion_is_noop() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.finish_all_left();
    let (a, _) = fx.finalists();
    fx.reg.leave(&mut fx.host, &fx.id.clone(), a).unwrap();
    assert!(fx.reg.is_empty());

    let sent = fx.host.sent.len();
    fx.reg
        .on_timer(&mut fx.host, &TournamentTimer::KickoffRetry(fx.id.clone()));
    assert_eq!(fx.host.sent.len(), sent);
}

// =========================================================================
// Forfeits
// =========================================================================

#[test]
fn test_forfeit_active_ends_running_match_and_awards_opponent() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    let (&match_id, &(left, right)) = fx.host.running.iter().next().unwrap();

    assert!(fx.reg.is_in_active_match(left));
    assert!(fx.reg.forfeit_active(&mut fx.host, left, "disconnect"));

    assert_eq!(fx.host.ended, vec![(match_id, left, "disconnect".to_string())]);
    assert!(!fx.host.running.contains_key(&match_id));
    assert!(fx.host.messages_to(right).any(|m| matches!(
        m,
        ServerMessage::GameOver { won: true, message, .. } if message == "You win! Opponent disconnect."
    )));
    let t = fx.reg.get(&fx.id).unwrap();
    assert!(t.bracket().is_eliminated(left));
    assert!(!fx.reg.is_in_active_match(left));
}

#[test]
fn test_offline_player_at_kickoff_forfeits() {
    let mut fx = Fixture::new(4);
    fx.host.offline.insert(pid(2));
    fx.ready_all(4);

    assert_eq!(fx.host.forfeits(), vec![(pid(2), "not connected".to_string())]);
    assert_eq!(fx.host.running.len(), 1);
    assert!(fx.reg.get(&fx.id).unwrap().bracket().is_eliminated(pid(2)));
}

#[test]
fn test_leaving_finalist_makes_opponent_champion() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.finish_all_left();
    let (a, b) = fx.finalists();

    fx.reg.leave(&mut fx.host, &fx.id.clone(), a).unwrap();

    assert!(fx.reg.is_empty());
    assert_eq!(fx.host.persisted[0].winner_id, b);
    assert!(fx.host.messages_to(a).any(|m| matches!(
        m,
        ServerMessage::TournamentUpdate { status: UpdateStatus::Left, .. }
    )));
}

#[test]
fn test_rejoin_in_progress_resends_assignment() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    fx.host.sent.clear();

    fx.reg.rejoin(&mut fx.host, &fx.id.clone(), entrant(3)).unwrap();
    let to_three: Vec<&ServerMessage> = fx.host.messages_to(pid(3)).collect();
    assert!(to_three.iter().any(|m| matches!(
        m,
        ServerMessage::TournamentUpdate { status: UpdateStatus::InProgress, .. }
    )));
    assert!(to_three.iter().any(|m| matches!(m, ServerMessage::TournamentBracket { .. })));
    assert!(to_three.iter().any(|m| matches!(m, ServerMessage::TournamentMatch { .. })));
}

#[test]
fn test_rejoin_stranger_after_start_is_refused() {
    let mut fx = Fixture::new(4);
    fx.ready_all(4);
    let err = fx.reg.rejoin(&mut fx.host, &fx.id.clone(), entrant(9)).unwrap_err();
    assert!(matches!(err, TournamentError::Closed { .. }));
}
