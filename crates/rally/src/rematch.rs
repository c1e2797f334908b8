//! Rematch requests between casual opponents.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rally_match::MatchKind;
use rally_protocol::{PlayerId, ServerMessage};

use crate::engine::Core;

/// Unordered pair key; the lower id comes first.
pub(crate) type Pair = (PlayerId, PlayerId);

pub(crate) fn pair(a: PlayerId, b: PlayerId) -> Pair {
    if a < b { (a, b) } else { (b, a) }
}

/// Outstanding requests, per unordered pair.
#[derive(Debug, Default)]
pub(crate) struct RematchBook {
    requests: BTreeMap<Pair, BTreeSet<PlayerId>>,
}

impl RematchBook {
    /// Records `player` asking for a rematch against `opponent`. Returns
    /// whether both sides have now asked.
    pub(crate) fn request(&mut self, player: PlayerId, opponent: PlayerId) -> bool {
        let key = pair(player, opponent);
        let askers = self.requests.entry(key).or_default();
        askers.insert(player);
        askers.len() == 2
    }

    /// Pairs where both sides have asked, in id order.
    pub(crate) fn agreed(&self) -> Vec<Pair> {
        self.requests
            .iter()
            .filter(|(_, askers)| askers.len() == 2)
            .map(|(key, _)| *key)
            .collect()
    }

    pub(crate) fn is_agreed(&self, key: Pair) -> bool {
        self.requests.get(&key).is_some_and(|askers| askers.len() == 2)
    }

    pub(crate) fn clear(&mut self, key: Pair) {
        self.requests.remove(&key);
    }

    /// Drops every request involving `player`.
    pub(crate) fn forget(&mut self, player: PlayerId) {
        self.requests.retain(|(a, b), _| *a != player && *b != player);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }
}

impl Core {
    /// `player` asks to play their last casual opponent again. The match
    /// starts once both have asked and both are free.
    pub(crate) fn request_rematch(&mut self, player: PlayerId, now: Instant) {
        let Some(&opponent) = self.last_opponent.get(&player) else {
            tracing::debug!(player_id = %player, "rematch without a previous casual opponent");
            return;
        };
        if !self.sessions.contains(opponent) {
            tracing::debug!(player_id = %player, opponent = %opponent, "rematch opponent is gone");
            self.last_opponent.remove(&player);
            return;
        }
        self.rematch.request(player, opponent);
        tracing::info!(player_id = %player, opponent = %opponent, "rematch requested");
        self.send(opponent, ServerMessage::RematchRequest);
        self.try_rematch(pair(player, opponent), now);
    }

    /// Starts every agreed rematch whose players have become free.
    pub(crate) fn recheck_rematches(&mut self, now: Instant) {
        for key in self.rematch.agreed() {
            self.try_rematch(key, now);
        }
    }

    fn try_rematch(&mut self, key: Pair, now: Instant) {
        if !self.rematch.is_agreed(key) {
            return;
        }
        let (a, b) = key;
        if !self.sessions.is_connected(a) || !self.sessions.is_connected(b) {
            tracing::debug!(a = %a, b = %b, "rematch waits for both players to be online");
            return;
        }
        if self.sessions.is_in_match(a) || self.sessions.is_in_match(b) {
            tracing::debug!(a = %a, b = %b, "rematch waits for both players to be free");
            return;
        }
        self.rematch.clear(key);
        tracing::info!(a = %a, b = %b, "rematch agreed");
        self.send_both(key, ServerMessage::RematchAccepted);
        let (left, right) = (self.contender(a), self.contender(b));
        self.start_match(left, right, MatchKind::Casual, now);
    }
}
