//! The lobby collaborator behind `startGame`.
//!
//! A casual match is agreed on elsewhere; the client only sends the lobby
//! key. The engine asks the user service who the challenger is and whether
//! the opponent is ready, off the engine task, and finishes the start when
//! the answer comes back.

use std::future::Future;

use rally_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::LobbyError;

/// A parsed `"<idA>-<idB>"` lobby key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyKey {
    raw: String,
    members: (PlayerId, PlayerId),
}

impl LobbyKey {
    pub fn parse(raw: &str) -> Result<Self, LobbyError> {
        let invalid = || LobbyError::InvalidKey(raw.to_string());
        let (a, b) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let a: u64 = a.parse().map_err(|_| invalid())?;
        let b: u64 = b.parse().map_err(|_| invalid())?;
        if a == b {
            return Err(invalid());
        }
        Ok(Self {
            raw: raw.trim().to_string(),
            members: (PlayerId(a), PlayerId(b)),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn members(&self) -> (PlayerId, PlayerId) {
        self.members
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.members.0 == player || self.members.1 == player
    }

    /// The other member, if `player` is one.
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        match self.members {
            (a, b) if a == player => Some(b),
            (a, b) if b == player => Some(a),
            _ => None,
        }
    }
}

/// A `startGame` waiting on the lobby service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyRequest {
    pub player: PlayerId,
    pub key: LobbyKey,
}

/// The lobby service's view of one player in a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyInfo {
    pub is_challenger: bool,
    pub opponent_ready: bool,
}

/// Answers lobby questions for `startGame`.
pub trait LobbyService: Send + Sync + 'static {
    fn lobby_info(
        &self,
        key: &LobbyKey,
        player: PlayerId,
    ) -> impl Future<Output = Result<LobbyInfo, LobbyError>> + Send;
}

/// `GET {user_service}/lobby-info?lobbyKey=..&userId=..`.
#[derive(Debug, Clone)]
pub struct HttpLobbyService {
    client: reqwest::Client,
    url: String,
}

impl HttpLobbyService {
    pub fn new(user_service_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/lobby-info", user_service_url.trim_end_matches('/')),
        }
    }
}

impl LobbyService for HttpLobbyService {
    async fn lobby_info(&self, key: &LobbyKey, player: PlayerId) -> Result<LobbyInfo, LobbyError> {
        let user_id = player.0.to_string();
        let resp = self
            .client
            .get(&self.url)
            .query(&[("lobbyKey", key.as_str()), ("userId", user_id.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(LobbyError::Status(resp.status().as_u16()));
        }
        Ok(resp.json::<LobbyInfo>().await?)
    }
}
