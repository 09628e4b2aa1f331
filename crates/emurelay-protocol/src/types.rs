//! Event catalogue and the identifier/metadata types it carries.
//!
//! Event names and field names follow the browser client's convention:
//! kebab-case event tags, camelCase fields. The serde attributes on the
//! two enums are load-bearing — changing them changes the wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies one player for the lifetime of their connection.
///
/// Derived from the transport's connection id, so it is unique and
/// never reused while the process lives. Serializes as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// A six-character room code drawn from `[A-Z0-9]`.
///
/// Codes are case-normalized on construction, so lookups with a
/// lowercased code find the room. Unique among live rooms only — a
/// destroyed room's code may be handed out again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Code length in characters.
    pub const LEN: usize = 6;

    /// The alphabet codes are generated from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Builds a code from caller input, trimming and uppercasing.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the caller supplied no code at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member's role within a room.
///
/// Never stored on the player record — always derived from whether the
/// player is the room's current host, so it cannot drift out of sync
/// with host failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Spectator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Spectator => f.write_str("spectator"),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata blobs
// ---------------------------------------------------------------------------

/// Game metadata attached to a room. Passed through unvalidated; the
/// relay never interprets it. Unknown fields survive the round trip via
/// the flattened `extra` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMeta {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub cover: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Lobby-visible state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Only the host is present.
    Waiting,
    /// At least one guest has joined.
    Playing,
}

/// One entry in the lobby listing; also the payload of the
/// `session-updated` broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub room_code: RoomCode,
    pub players_count: usize,
    pub game: GameMeta,
    pub status: SessionStatus,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    pub is_public: bool,
}

// ---------------------------------------------------------------------------
// Client -> relay events
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// Everything a client can send to the relay.
///
/// Wire shape: `{ "event": "join-room", "data": { "roomCode": "AB12CD" } }`.
/// The `input` / `guest-input` / `sync-state` payloads are opaque JSON:
/// the relay forwards them without looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Create a room and become its host.
    CreateRoom {
        #[serde(default)]
        game: GameMeta,
        #[serde(default)]
        username: Option<String>,
    },

    /// Join an existing room by code.
    JoinRoom {
        #[serde(default)]
        room_code: String,
        #[serde(default, alias = "playerName")]
        username: Option<String>,
    },

    /// Create a lobby session (room + session index entry) explicitly.
    CreateSession {
        #[serde(default)]
        session_name: Option<String>,
        #[serde(default)]
        game_id: String,
        #[serde(default)]
        game_title: String,
        #[serde(default)]
        game_platform: String,
        #[serde(default)]
        game_cover: String,
        #[serde(default)]
        max_players: Option<u32>,
        #[serde(default = "default_true")]
        is_public: bool,
        #[serde(default)]
        host_user_id: Option<String>,
        #[serde(default)]
        host_name: Option<String>,
    },

    /// Join an existing session by id; fails if the session is unknown.
    JoinSession {
        #[serde(default)]
        session_id: String,
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        user_name: Option<String>,
        #[serde(default)]
        game_id: Option<String>,
    },

    /// Join the session's room, or create both if the id is unseen.
    JoinOrCreateSession {
        #[serde(default)]
        session_id: String,
        #[serde(default)]
        game: GameMeta,
        #[serde(default)]
        username: Option<String>,
    },

    /// Leave the current room.
    LeaveRoom,

    /// Host input frame, fanned out to every other member.
    Input(serde_json::Value),

    /// Guest input frame, forwarded to the host only.
    GuestInput(serde_json::Value),

    /// Host state snapshot, fanned out to every other member.
    SyncState(serde_json::Value),

    /// Chat line for the whole room.
    ChatMessage {
        #[serde(default)]
        message: String,
    },

    /// Ask whether a room exists and has a host.
    CheckRoom {
        #[serde(default)]
        room_code: String,
    },

    /// Ask for the lobby listing of active sessions.
    GetLobbySessions,

    /// Liveness ping; answered with `heartbeat-ack`, no state effect.
    Heartbeat,
}

// ---------------------------------------------------------------------------
// Relay -> client events
// ---------------------------------------------------------------------------

/// Everything the relay can send to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Acknowledges a new connection.
    Connected {
        player_id: PlayerId,
        message: String,
    },

    /// The caller's room was created; sent to the creator only.
    RoomCreated {
        room_code: RoomCode,
        role: Role,
        game: GameMeta,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    /// Confirms room state to a joining (or re-confirming) player.
    RoomJoined {
        room_code: RoomCode,
        role: Role,
        host_id: PlayerId,
        players_count: usize,
        game: GameMeta,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    /// The caller's lobby session was created.
    SessionCreated {
        session_id: String,
        room_code: RoomCode,
        role: Role,
        game: GameMeta,
    },

    /// Confirms session entry to a player who joined by session id.
    JoinedSession {
        success: bool,
        session_id: String,
        room_code: RoomCode,
        role: Role,
        players: usize,
        game: GameMeta,
        host_id: PlayerId,
    },

    /// A new member entered the room; sent to every member.
    PlayerJoined {
        player_id: PlayerId,
        username: String,
        players_count: usize,
        room_code: RoomCode,
    },

    /// A member left; sent to the remaining members.
    PlayerLeft {
        player_id: PlayerId,
        players_count: usize,
    },

    /// The host left and another member was promoted.
    HostChanged { new_host: PlayerId },

    /// Relayed host input.
    Input(serde_json::Value),

    /// Relayed guest input, delivered to the host.
    Player2Input(serde_json::Value),

    /// Relayed host state snapshot.
    StateUpdate(serde_json::Value),

    /// Relayed chat line, stamped with sender identity and time.
    ChatMessage {
        player_id: PlayerId,
        username: String,
        message: String,
        timestamp: u64,
    },

    /// Answer to `check-room`.
    RoomStatus {
        exists: bool,
        has_host: bool,
        room_code: String,
        players_count: usize,
    },

    /// Answer to `get-lobby-sessions`.
    LobbySessions { sessions: Vec<SessionSummary> },

    /// Lobby-wide notification that a session appeared or changed.
    SessionUpdated(SessionSummary),

    /// Answer to `heartbeat`.
    HeartbeatAck { timestamp: u64 },

    /// A request-scoped failure, reported to the sender only.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
}

// =========================================================================
// Tests
// =========================================================================
