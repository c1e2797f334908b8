//! The single-elimination bracket.
//!
//! A bracket-match outlives the live match that decides it: it keeps the
//! pairing and the winner, and refers to the live match only by id while
//! it runs.

use rally_protocol::{BracketEntryView, EntrantView, MatchId, PlayerId};

/// A roster member as the bracket records them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrant {
    pub id: PlayerId,
    pub name: String,
}

impl Entrant {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn view(&self) -> EntrantView {
        EntrantView {
            id: self.id,
            username: self.name.clone(),
        }
    }
}

/// One slot of a round.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BracketMatch {
    pub left: Option<Entrant>,
    pub right: Option<Entrant>,
    pub winner: Option<PlayerId>,
    /// The live match deciding this slot, while it runs.
    pub running_match: Option<MatchId>,
}

impl BracketMatch {
    /// A pairing with the lower player id on the left. A missing opponent
    /// makes it a bye that the present player wins outright.
    pub fn pair(a: Entrant, b: Option<Entrant>) -> Self {
        match b {
            Some(b) => {
                let (left, right) = if a.id < b.id { (a, b) } else { (b, a) };
                Self {
                    left: Some(left),
                    right: Some(right),
                    winner: None,
                    running_match: None,
                }
            }
            None => Self {
                winner: Some(a.id),
                left: Some(a),
                right: None,
                running_match: None,
            },
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.left.as_ref().is_some_and(|e| e.id == player)
            || self.right.as_ref().is_some_and(|e| e.id == player)
    }

    /// The entrant facing `player` in this slot.
    pub fn opponent_of(&self, player: PlayerId) -> Option<&Entrant> {
        match (&self.left, &self.right) {
            (Some(l), right) if l.id == player => right.as_ref(),
            (left, Some(r)) if r.id == player => left.as_ref(),
            _ => None,
        }
    }

    pub fn entrant(&self, player: PlayerId) -> Option<&Entrant> {
        [&self.left, &self.right]
            .into_iter()
            .flatten()
            .find(|e| e.id == player)
    }

    pub fn winner_entrant(&self) -> Option<&Entrant> {
        self.winner.and_then(|id| self.entrant(id))
    }

    /// Players of an unresolved slot.
    pub fn contenders(&self) -> impl Iterator<Item = PlayerId> + '_ {
        let open = !self.is_resolved();
        [&self.left, &self.right]
            .into_iter()
            .flatten()
            .filter(move |_| open)
            .map(|e| e.id)
    }
}

/// All rounds so far; the last one is the current round.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bracket {
    rounds: Vec<Vec<BracketMatch>>,
}

impl Bracket {
    /// Draws round one from `entrants` in the given (already shuffled)
    /// order, pairing neighbours.
    pub fn seed(entrants: Vec<Entrant>) -> Self {
        let mut bracket = Self::default();
        bracket.rounds.push(pair_up(entrants));
        bracket
    }

    /// 1-based number of the current round; 0 before the draw.
    pub fn round(&self) -> usize {
        self.rounds.len()
    }

    pub fn rounds(&self) -> &[Vec<BracketMatch>] {
        &self.rounds
    }

    pub fn current(&self) -> &[BracketMatch] {
        self.rounds.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current_mut(&mut self) -> &mut [BracketMatch] {
        self.rounds.last_mut().map(Vec::as_mut_slice).unwrap_or(&mut [])
    }

    pub fn is_current_complete(&self) -> bool {
        !self.current().is_empty() && self.current().iter().all(BracketMatch::is_resolved)
    }

    /// Builds the next round from the current round's winners in bracket
    /// order. Call only once the current round is complete.
    pub fn advance(&mut self) -> &[BracketMatch] {
        let winners: Vec<Entrant> = self
            .current()
            .iter()
            .filter_map(|m| m.winner_entrant().cloned())
            .collect();
        self.rounds.push(pair_up(winners));
        self.current()
    }

    /// Players still to play in the current round.
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.current().iter().flat_map(BracketMatch::contenders).collect()
    }

    /// The current-round slot `player` has yet to decide.
    pub fn open_match_of(&self, player: PlayerId) -> Option<&BracketMatch> {
        self.current()
            .iter()
            .find(|m| !m.is_resolved() && m.involves(player))
    }

    pub fn open_match_of_mut(&mut self, player: PlayerId) -> Option<&mut BracketMatch> {
        self.current_mut()
            .iter_mut()
            .find(|m| !m.is_resolved() && m.involves(player))
    }

    /// The slot decided by live match `id`.
    pub fn by_running_match_mut(&mut self, id: MatchId) -> Option<&mut BracketMatch> {
        self.rounds
            .iter_mut()
            .flatten()
            .find(|m| m.running_match == Some(id))
    }

    /// Whether `player` has lost a decided slot.
    pub fn is_eliminated(&self, player: PlayerId) -> bool {
        self.rounds
            .iter()
            .flatten()
            .any(|m| m.involves(player) && m.winner.is_some_and(|w| w != player))
    }

    /// Bracket-match count of each round.
    pub fn round_sizes(&self) -> Vec<usize> {
        self.rounds.iter().map(Vec::len).collect()
    }

    /// Client view; `score` looks up live scores of running matches.
    pub fn view(&self, score: impl Fn(MatchId) -> Option<(u32, u32)>) -> Vec<Vec<BracketEntryView>> {
        self.rounds
            .iter()
            .map(|round| {
                round
                    .iter()
                    .map(|m| {
                        let live = m.running_match.filter(|_| !m.is_resolved());
                        let (left_score, right_score) =
                            live.and_then(&score).unwrap_or((0, 0));
                        BracketEntryView {
                            left: m.left.as_ref().map(Entrant::view),
                            right: m.right.as_ref().map(Entrant::view),
                            winner: m.winner_entrant().map(Entrant::view),
                            in_progress: live.is_some(),
                            game_id: m.running_match,
                            left_score,
                            right_score,
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

fn pair_up(entrants: Vec<Entrant>) -> Vec<BracketMatch> {
    let mut iter = entrants.into_iter();
    let mut round = Vec::new();
    while let Some(a) = iter.next() {
        round.push(BracketMatch::pair(a, iter.next()));
    }
    round
}
