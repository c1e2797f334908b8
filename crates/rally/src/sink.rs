//! Where finished matches and tournaments are reported.
//!
//! Reporting is fire-and-forget: the engine hands a record over and moves
//! on. A sink that talks to the network does so from its own task, and a
//! failure is logged, never retried and never surfaced to the engine.

use std::sync::{Arc, Mutex};

use rally_match::MatchRecord;
use rally_tournament::TournamentRecord;
use serde::Serialize;

/// Receives every match and tournament result.
pub trait OutcomeSink: Send + Sync + 'static {
    /// Called once per match teardown, whatever ended it.
    fn match_concluded(&self, record: MatchRecord);

    /// Called once when a tournament produces its champion.
    fn tournament_concluded(&self, record: TournamentRecord);
}

/// Logs results and nothing else. The default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn match_concluded(&self, record: MatchRecord) {
        tracing::info!(
            player1 = %record.player1_id,
            player2 = %record.player2_id,
            score1 = record.player1_score,
            score2 = record.player2_score,
            match_type = %record.match_type,
            "match concluded"
        );
    }

    fn tournament_concluded(&self, record: TournamentRecord) {
        tracing::info!(
            tournament_id = %record.tournament_id,
            winner = %record.winner_id,
            rounds = ?record.rounds,
            "tournament concluded"
        );
    }
}

/// Posts match history to the user service and tournament results to the
/// ledger.
#[derive(Debug, Clone)]
pub struct HttpOutcomeSink {
    client: reqwest::Client,
    history_url: String,
    ledger_url: Option<String>,
}

impl HttpOutcomeSink {
    /// `user_service_url` is the base URL; history goes to `/matches`.
    pub fn new(user_service_url: &str, ledger_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            history_url: format!("{}/matches", user_service_url.trim_end_matches('/')),
            ledger_url,
        }
    }

    fn post<T: Serialize + Send + 'static>(&self, url: String, body: T, what: &'static str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(%url, what, "no runtime, result not posted");
            return;
        };
        let client = self.client.clone();
        runtime.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(%url, what, status = %resp.status(), "result posted");
                }
                Ok(resp) => {
                    tracing::warn!(%url, what, status = %resp.status(), "result rejected");
                }
                Err(e) => tracing::warn!(%url, what, error = %e, "posting result failed"),
            }
        });
    }
}

impl OutcomeSink for HttpOutcomeSink {
    fn match_concluded(&self, record: MatchRecord) {
        self.post(self.history_url.clone(), record, "match history");
    }

    fn tournament_concluded(&self, record: TournamentRecord) {
        match &self.ledger_url {
            Some(url) => self.post(url.clone(), record, "tournament result"),
            None => LogSink.tournament_concluded(record),
        }
    }
}

/// Keeps every record in memory. Handy for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    matches: Arc<Mutex<Vec<MatchRecord>>>,
    tournaments: Arc<Mutex<Vec<TournamentRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> Vec<MatchRecord> {
        self.matches.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn tournaments(&self) -> Vec<TournamentRecord> {
        self.tournaments.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl OutcomeSink for RecordingSink {
    fn match_concluded(&self, record: MatchRecord) {
        if let Ok(mut matches) = self.matches.lock() {
            matches.push(record);
        }
    }

    fn tournament_concluded(&self, record: TournamentRecord) {
        if let Ok(mut tournaments) = self.tournaments.lock() {
            tournaments.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_protocol::{PlayerId, TournamentId};

    fn match_record() -> MatchRecord {
        MatchRecord {
            player1_id: PlayerId(1),
            player2_id: PlayerId(2),
            player1_username: "ana".into(),
            player2_username: "bo".into(),
            player1_score: 11,
            player2_score: 4,
            match_type: "online".into(),
        }
    }

    #[test]
    fn test_recording_sink_shares_records_between_clones() {
        let sink = RecordingSink::new();
        let clone = sink.clone();
        clone.match_concluded(match_record());
        clone.tournament_concluded(TournamentRecord {
            tournament_id: TournamentId::new("ABCD"),
            winner_id: PlayerId(2),
            players: vec![PlayerId(1), PlayerId(2)],
            rounds: vec![1],
            timestamp: 0,
        });
        assert_eq!(sink.matches(), vec![match_record()]);
        assert_eq!(sink.tournaments().len(), 1);
    }

    #[test]
    fn test_http_sink_builds_history_url() {
        let sink = HttpOutcomeSink::new("http://users:5100/", None);
        assert_eq!(sink.history_url, "http://users:5100/matches");
    }

    #[test]
    fn test_http_sink_without_runtime_does_not_panic() {
        let sink = HttpOutcomeSink::new("http://127.0.0.1:1", None);
        sink.match_concluded(match_record());
    }
}
