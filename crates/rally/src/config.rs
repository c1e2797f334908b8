//! Engine and server configuration.

use std::str::FromStr;
use std::time::Duration;

use rally_match::MatchConfig;
use rally_tick::TickConfig;
use rally_tournament::TournamentConfig;

use crate::RallyError;

/// What happens when a player drops out of a running tournament match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TournamentDisconnectPolicy {
    /// Forfeit at once; a bracket round is not held up for a reconnect.
    #[default]
    ForfeitImmediately,
    /// Treat it like a casual match: pause and wait out the grace period.
    Grace,
}

/// Everything the engine needs to run matches and tournaments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub match_config: MatchConfig,
    pub tick: TickConfig,
    pub tournament: TournamentConfig,
    /// How long a casual match waits for a dropped player.
    pub disconnect_grace: Duration,
    pub tournament_disconnect: TournamentDisconnectPolicy,
    /// Fixed RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            tick: TickConfig::default(),
            tournament: TournamentConfig::default(),
            disconnect_grace: Duration::from_secs(10),
            tournament_disconnect: TournamentDisconnectPolicy::default(),
            seed: None,
        }
    }
}

/// Process-level settings for the `rally-server` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Base URL of the user service (lobby info and match history).
    pub user_service_url: String,
    /// Tournament ledger endpoint. Results are only logged when unset.
    pub ledger_url: Option<String>,
    /// A connection silent for this long is dropped. Off unless set:
    /// players waiting in a tournament lobby send nothing for minutes.
    pub idle_timeout: Option<Duration>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:3000";
    pub const DEFAULT_USER_SERVICE_URL: &'static str = "http://user-service:5100";

    /// Reads the `RALLY_*` environment variables.
    pub fn from_env() -> Result<Self, RallyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `RALLY_JWT_SECRET` is
    /// required; everything else has a default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RallyError> {
        let jwt_secret = lookup("RALLY_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RallyError::Config("RALLY_JWT_SECRET is not set".into()))?;

        let mut engine = EngineConfig::default();
        if let Some(ms) = parse::<u64>(&lookup, "RALLY_GRACE_MS")? {
            engine.disconnect_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "RALLY_READY_TIMEOUT_MS")? {
            engine.tournament.ready_timeout = Duration::from_millis(ms);
        }
        if let Some(score) = parse::<u32>(&lookup, "RALLY_MAX_SCORE")? {
            if score == 0 {
                return Err(RallyError::Config("RALLY_MAX_SCORE must be at least 1".into()));
            }
            engine.match_config.max_score = score;
        }
        let idle_timeout = parse::<u64>(&lookup, "RALLY_IDLE_TIMEOUT_SECS")?
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            bind_addr: lookup("RALLY_BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.into()),
            jwt_secret,
            user_service_url: lookup("RALLY_USER_SERVICE_URL")
                .unwrap_or_else(|| Self::DEFAULT_USER_SERVICE_URL.into()),
            ledger_url: lookup("RALLY_LEDGER_URL").filter(|s| !s.is_empty()),
            idle_timeout,
            engine,
        })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, RallyError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| RallyError::Config(format!("{key} has an invalid value {raw:?}")))
        })
        .transpose()
}
