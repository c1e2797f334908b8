//! Tournament rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Roster sizes a tournament may start with.
    pub sizes: Vec<usize>,

    /// How long a round waits, after its first ready signal, before every
    /// player still not ready is forfeited.
    pub ready_timeout: Duration,

    /// Delay before retrying to start a bracket-match whose players were
    /// still busy in another match.
    pub kickoff_retry: Duration,
}

impl TournamentConfig {
    pub fn is_valid_size(&self, count: usize) -> bool {
        self.sizes.contains(&count)
    }

    /// Human-readable list of sizes, e.g. `"4 or 8"`.
    pub fn sizes_label(&self) -> String {
        match self.sizes.split_last() {
            None => String::new(),
            Some((last, [])) => last.to_string(),
            Some((last, rest)) => {
                let head: Vec<String> = rest.iter().map(ToString::to_string).collect();
                format!("{} or {last}", head.join(", "))
            }
        }
    }
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            sizes: vec![4, 8],
            ready_timeout: Duration::from_secs(30),
            kickoff_retry: Duration::from_secs(1),
        }
    }
}
