//! Every live tournament, keyed by its short code.

use std::collections::HashMap;

use rand::Rng;
use rally_protocol::{MatchId, PlayerId, ServerMessage, TournamentId, TournamentStatus, UpdateStatus};

use crate::{Entrant, Tournament, TournamentConfig, TournamentError, TournamentHost, TournamentTimer};

/// Characters used in tournament codes. No `I`, `O`, `0` or `1`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a tournament code.
pub const CODE_LEN: usize = 4;

/// Owns every live tournament and routes player requests to them.
///
/// Completed tournaments are dropped at the end of the call that completed
/// them; nothing about a bracket is kept once its result is persisted.
#[derive(Debug, Default)]
pub struct TournamentRegistry {
    config: TournamentConfig,
    tournaments: HashMap<TournamentId, Tournament>,
}

impl TournamentRegistry {
    pub fn new(config: TournamentConfig) -> Self {
        Self {
            config,
            tournaments: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    pub fn get(&self, id: &TournamentId) -> Option<&Tournament> {
        self.tournaments.get(id)
    }

    pub fn len(&self) -> usize {
        self.tournaments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tournaments.is_empty()
    }

    /// A fresh code not used by any live tournament.
    pub fn generate_id<R: Rng + ?Sized>(&self, rng: &mut R) -> TournamentId {
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            let id = TournamentId::new(code);
            if !self.tournaments.contains_key(&id) {
                return id;
            }
        }
    }

    fn open<H: TournamentHost>(&mut self, host: &mut H, id: TournamentId, creator: Entrant) {
        let player = creator.id;
        let tournament = Tournament::new(id.clone(), creator, self.config.clone());
        host.send(
            player,
            ServerMessage::TournamentUpdate {
                tournament_id: id.clone(),
                status: UpdateStatus::Created,
                message: "Tournament created. Share ID to let others join.".into(),
            },
        );
        host.send(player, tournament.participants_message());
        self.tournaments.insert(id, tournament);
    }

    /// Creates a tournament with `creator` as its first entrant.
    pub fn create<H: TournamentHost, R: Rng + ?Sized>(
        &mut self,
        host: &mut H,
        creator: Entrant,
        rng: &mut R,
    ) -> TournamentId {
        let id = self.generate_id(rng);
        self.open(host, id.clone(), creator);
        id
    }

    /// Joins `entrant` to tournament `id`, creating it on first use so a
    /// shared code works as an invitation.
    pub fn join<H: TournamentHost>(
        &mut self,
        host: &mut H,
        id: &TournamentId,
        entrant: Entrant,
    ) -> Result<(), TournamentError> {
        if !self.tournaments.contains_key(id) {
            if !is_valid_code(id) {
                return Err(TournamentError::InvalidCode(id.clone()));
            }
            tracing::info!(tournament_id = %id, "unknown code, creating tournament on demand");
            self.open(host, id.clone(), entrant);
            return Ok(());
        }
        let player = entrant.id;
        let tournament = self.lookup(id)?;
        tournament.join(host, entrant)?;
        host.send(
            player,
            ServerMessage::TournamentUpdate {
                tournament_id: id.clone(),
                status: tournament.status().into(),
                message: "Joined tournament.".into(),
            },
        );
        Ok(())
    }

    pub fn set_ready<H: TournamentHost, R: Rng + ?Sized>(
        &mut self,
        host: &mut H,
        id: &TournamentId,
        player: PlayerId,
        ready: bool,
        rng: &mut R,
    ) -> Result<(), TournamentError> {
        let result = self.lookup(id)?.set_ready(host, player, ready, rng);
        self.sweep();
        result
    }

    pub fn rejoin<H: TournamentHost>(
        &mut self,
        host: &mut H,
        id: &TournamentId,
        entrant: Entrant,
    ) -> Result<(), TournamentError> {
        self.lookup(id)?.rejoin(host, entrant)
    }

    pub fn leave<H: TournamentHost>(
        &mut self,
        host: &mut H,
        id: &TournamentId,
        player: PlayerId,
    ) -> Result<(), TournamentError> {
        let result = self.lookup(id)?.leave(host, player);
        if result.is_ok() {
            host.send(
                player,
                ServerMessage::TournamentUpdate {
                    tournament_id: id.clone(),
                    status: UpdateStatus::Left,
                    message: "Left tournament successfully.".into(),
                },
            );
        }
        self.sweep();
        result
    }

    /// Delivers a live match's result to the tournament that started it.
    pub fn match_finished<H: TournamentHost>(
        &mut self,
        host: &mut H,
        id: &TournamentId,
        match_id: MatchId,
        winner: PlayerId,
    ) {
        match self.tournaments.get_mut(id) {
            Some(t) => t.match_finished(host, match_id, winner),
            None => tracing::warn!(tournament_id = %id, %match_id, "result for a tournament that is gone"),
        }
        self.sweep();
    }

    pub fn on_timer<H: TournamentHost>(&mut self, host: &mut H, timer: &TournamentTimer) {
        if let Some(t) = self.tournaments.get_mut(timer.tournament()) {
            t.on_timer(host, timer);
        }
        self.sweep();
    }

    /// Forfeits `player` from every tournament where they are due to play
    /// in the current round. Returns whether any did.
    pub fn forfeit_active<H: TournamentHost>(&mut self, host: &mut H, player: PlayerId, reason: &str) -> bool {
        let mut any = false;
        for t in self.tournaments.values_mut() {
            if t.is_in_active_match(player) {
                t.forfeit(host, player, reason);
                any = true;
            }
        }
        self.sweep();
        any
    }

    /// Whether `player` has an undecided bracket-match anywhere.
    pub fn is_in_active_match(&self, player: PlayerId) -> bool {
        self.tournaments.values().any(|t| t.is_in_active_match(player))
    }

    fn lookup(&mut self, id: &TournamentId) -> Result<&mut Tournament, TournamentError> {
        self.tournaments
            .get_mut(id)
            .ok_or_else(|| TournamentError::NotFound(id.clone()))
    }

    fn sweep(&mut self) {
        self.tournaments.retain(|id, t| {
            if t.is_completed() {
                tracing::debug!(tournament_id = %id, "completed tournament removed");
                false
            } else if t.status() == TournamentStatus::Created && t.roster().is_empty() {
                tracing::debug!(tournament_id = %id, "abandoned tournament removed");
                false
            } else {
                true
            }
        });
    }
}

/// Whether `id` could have come from [`TournamentRegistry::generate_id`]
/// or been typed from one: `CODE_LEN` ASCII letters or digits.
fn is_valid_code(id: &TournamentId) -> bool {
    id.as_str().len() == CODE_LEN && id.as_str().bytes().all(|b| b.is_ascii_alphanumeric())
}
