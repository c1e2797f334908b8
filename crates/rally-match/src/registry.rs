//! Every live match, keyed by id.

use std::collections::HashMap;

use rand::Rng;
use rally_protocol::{MatchId, PlayerId};

use crate::{Match, MatchConfig, MatchError, MatchKind};

/// A player about to be placed in a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contender {
    pub id: PlayerId,
    pub name: String,
}

impl Contender {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Owns every live [`Match`].
///
/// Ids are never reused within a process, so a stale id held by a timer or
/// a bracket entry can only ever miss.
pub struct MatchRegistry {
    config: MatchConfig,
    matches: HashMap<MatchId, Match>,
    next_id: u64,
}

impl MatchRegistry {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            matches: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Creates a match between `a` and `b`. The lower player id always
    /// takes the left paddle, whatever the argument order.
    pub fn create<R: Rng + ?Sized>(
        &mut self,
        a: Contender,
        b: Contender,
        kind: MatchKind,
        rng: &mut R,
    ) -> Result<MatchId, MatchError> {
        if a.id == b.id {
            return Err(MatchError::SamePlayer(a.id));
        }
        let (left, right) = if a.id < b.id { (a, b) } else { (b, a) };

        let id = MatchId(self.next_id);
        self.next_id += 1;
        let game = Match::new(
            id,
            kind,
            self.config.clone(),
            (left.id, left.name),
            (right.id, right.name),
            rng,
        );
        tracing::info!(
            match_id = %id,
            left = %left.id,
            right = %right.id,
            ?kind,
            "match created"
        );
        self.matches.insert(id, game);
        Ok(id)
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&id)
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.matches.contains_key(&id)
    }

    pub fn remove(&mut self, id: MatchId) -> Option<Match> {
        self.matches.remove(&id)
    }

    /// `(left, right)` scores of a live match.
    pub fn live_score(&self, id: MatchId) -> Option<(u32, u32)> {
        self.matches.get(&id).map(Match::score)
    }

    pub fn ids(&self) -> impl Iterator<Item = MatchId> + '_ {
        self.matches.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rally_protocol::Side;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    #[test]
    fn test_create_orders_sides_by_player_id() {
        let mut reg = MatchRegistry::default();
        let id = reg
            .create(
                Contender::new(PlayerId(9), "zed"),
                Contender::new(PlayerId(3), "cy"),
                MatchKind::Casual,
                &mut rng(),
            )
            .unwrap();
        let m = reg.get(id).unwrap();
        assert_eq!(m.players(), (PlayerId(3), PlayerId(9)));
        assert_eq!(m.slot(Side::Left).name, "cy");
    }

    #[test]
    fn test_create_same_player_is_rejected() {
        let mut reg = MatchRegistry::default();
        let err = reg
            .create(
                Contender::new(PlayerId(1), "ana"),
                Contender::new(PlayerId(1), "ana"),
                MatchKind::Casual,
                &mut rng(),
            )
            .unwrap_err();
        assert!(matches!(err, MatchError::SamePlayer(PlayerId(1))));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_remove() {
        let mut reg = MatchRegistry::default();
        let mut r = rng();
        let first = reg
            .create(
                Contender::new(PlayerId(1), "a"),
                Contender::new(PlayerId(2), "b"),
                MatchKind::Casual,
                &mut r,
            )
            .unwrap();
        reg.remove(first);
        let second = reg
            .create(
                Contender::new(PlayerId(1), "a"),
                Contender::new(PlayerId(2), "b"),
                MatchKind::Tournament,
                &mut r,
            )
            .unwrap();
        assert_ne!(first, second);
        assert!(reg.get(first).is_none());
        assert_eq!(reg.live_score(second), Some((0, 0)));
    }
}
