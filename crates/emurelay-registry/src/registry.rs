//! The registry: connection records, room store, session index, and
//! every lifecycle transition between them.
//!
//! All operations are synchronous and run under the hub's single lock;
//! see the crate docs for the concurrency discipline.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use emurelay_protocol::{
    GameMeta, PlayerId, Role, RoomCode, ServerEvent, SessionSummary,
};
use rand::Rng;

use crate::player::default_username;
use crate::{EventSink, Player, RegistryError, Room};

/// Retry budget for room-code generation. 36^6 codes means collisions
/// are vanishingly rare at any realistic room count, so hitting this
/// bound indicates a nearly saturated code space.
const MAX_CODE_ATTEMPTS: usize = 32;

/// Parameters for an explicit lobby-session creation.
#[derive(Debug, Default)]
pub struct NewSession {
    pub session_name: Option<String>,
    pub game: GameMeta,
    pub max_players: Option<u32>,
    pub is_public: bool,
    pub host_user_id: Option<String>,
    pub host_name: Option<String>,
}

/// Outcome of placing a player into a room, used to build the
/// caller-facing confirmation event.
struct Admission {
    role: Role,
    host_id: PlayerId,
    players_count: usize,
    game: GameMeta,
    /// `true` when the player was already a member and nothing changed.
    rejoined: bool,
}

/// All shared relay state: players, rooms, and the session index.
///
/// The session index maps caller-chosen session ids to room codes.
/// Every entry references a live room; entries are removed in the same
/// operation that destroys their room, so the index never goes stale.
pub struct Registry {
    players: HashMap<PlayerId, Player>,
    rooms: HashMap<RoomCode, Room>,
    sessions: HashMap<String, RoomCode>,
    /// Produces candidate room codes; swapped out in tests to force
    /// collisions.
    code_source: fn() -> RoomCode,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_code_source(random_code)
    }

    fn with_code_source(code_source: fn() -> RoomCode) -> Self {
        Self {
            players: HashMap::new(),
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            code_source,
        }
    }

    // -- Connection lifecycle ------------------------------------------------

    /// Registers a new connection and acknowledges it.
    pub fn connect(&mut self, id: PlayerId, sink: EventSink) {
        let player = Player::new(id, sink, now_millis());
        player.send(ServerEvent::Connected {
            player_id: id,
            message: "Connected to Emurelay".into(),
        });
        self.players.insert(id, player);
        tracing::info!(%id, players = self.players.len(), "player connected");
    }

    /// Removes a connection. Safe to call for ids that never registered
    /// (disconnect can race ahead of registration) and runs the full
    /// leave path before the player record disappears, so room cleanup
    /// never observes a half-removed player.
    pub fn disconnect(&mut self, id: PlayerId) {
        if !self.players.contains_key(&id) {
            return;
        }
        self.leave_room(id);
        self.players.remove(&id);
        tracing::info!(%id, players = self.players.len(), "player disconnected");
    }

    /// Liveness echo. No state effect.
    pub fn heartbeat(&self, id: PlayerId) {
        self.send_to(id, ServerEvent::HeartbeatAck { timestamp: now_millis() });
    }

    // -- Room lifecycle ------------------------------------------------------

    /// Creates a room with the caller as host and sole member.
    pub fn create_room(
        &mut self,
        id: PlayerId,
        game: GameMeta,
        username: Option<String>,
    ) -> Result<RoomCode, RegistryError> {
        let code = self.insert_room(id, game, username, None)?;
        let room = &self.rooms[&code];
        self.send_to(
            id,
            ServerEvent::RoomCreated {
                room_code: code.clone(),
                role: Role::Host,
                game: room.game.clone(),
                session_id: None,
            },
        );
        Ok(code)
    }

    /// Joins an existing room by code, case-insensitively.
    ///
    /// A player already in the room gets a re-confirmation of current
    /// room state with no membership change and no `player-joined`
    /// broadcast. A missing code falls back to the caller's current
    /// room, covering hosts confirming entry right after `create-room`.
    pub fn join_room(
        &mut self,
        id: PlayerId,
        raw_code: &str,
        username: Option<String>,
    ) -> Result<(), RegistryError> {
        let mut code = RoomCode::normalized(raw_code);
        if code.is_empty() {
            code = self
                .players
                .get(&id)
                .and_then(|p| p.room.clone())
                .ok_or(RegistryError::InvalidRequest("room code required"))?;
        }

        let admission = self.admit(id, &code, username, None, None)?;
        let session_id = self
            .rooms
            .get(&code)
            .and_then(|room| room.session_id.clone());
        self.send_to(
            id,
            ServerEvent::RoomJoined {
                room_code: code,
                role: admission.role,
                host_id: admission.host_id,
                players_count: admission.players_count,
                game: admission.game,
                session_id,
            },
        );
        Ok(())
    }

    /// Creates a lobby session: a room plus a generated session id,
    /// announced lobby-wide.
    pub fn create_session(
        &mut self,
        id: PlayerId,
        params: NewSession,
    ) -> Result<String, RegistryError> {
        let code = self.insert_room(id, params.game, params.host_name, None)?;
        let session_id = format!("session_{}_{}", code, now_millis() / 1000);

        if let Some(room) = self.rooms.get_mut(&code) {
            room.session_id = Some(session_id.clone());
            room.session_name = params.session_name;
            room.max_players = params.max_players;
            room.is_public = params.is_public;
        }
        self.sessions.insert(session_id.clone(), code.clone());
        if let Some(player) = self.players.get_mut(&id) {
            player.session_id = Some(session_id.clone());
            player.user_id = params.host_user_id;
        }
        tracing::info!(%id, %code, session_id, "session created");

        let room = &self.rooms[&code];
        self.send_to(
            id,
            ServerEvent::SessionCreated {
                session_id: session_id.clone(),
                room_code: code.clone(),
                role: Role::Host,
                game: room.game.clone(),
            },
        );
        let summary = self.session_summary(&session_id, room);
        self.broadcast_all(Some(id), ServerEvent::SessionUpdated(summary));
        Ok(session_id)
    }

    /// Joins an existing session by id; the session must be known.
    pub fn join_session(
        &mut self,
        id: PlayerId,
        session_id: &str,
        user_id: Option<String>,
        username: Option<String>,
    ) -> Result<(), RegistryError> {
        if session_id.is_empty() {
            return Err(RegistryError::SessionIdRequired);
        }
        let code = self
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RegistryError::SessionNotFound(session_id.into()))?;
        if !self.rooms.contains_key(&code) {
            // Defensive: the index should never outlive its room, but a
            // violated invariant must not crash the lobby path.
            self.sessions.remove(session_id);
            tracing::warn!(session_id, %code, "dropped stale session mapping");
            return Err(RegistryError::SessionNotFound(session_id.into()));
        }

        let admission =
            self.admit(id, &code, username, user_id, Some(session_id.into()))?;
        self.send_to(
            id,
            ServerEvent::JoinedSession {
                success: true,
                session_id: session_id.into(),
                room_code: code.clone(),
                role: admission.role,
                players: admission.players_count,
                game: admission.game,
                host_id: admission.host_id,
            },
        );

        if !admission.rejoined {
            if let Some(room) = self.rooms.get(&code) {
                let summary = self.session_summary(session_id, room);
                self.broadcast_all(None, ServerEvent::SessionUpdated(summary));
            }
        }
        Ok(())
    }

    /// Session-keyed entry point: joins the session's room as spectator,
    /// or creates room and mapping when the id is unseen. The stale-
    /// mapping case (room died, index entry survived a crash of the
    /// invariant) deletes the mapping and falls through to creation.
    ///
    /// Host role belongs to whoever created the session's room and is
    /// never reassigned here, so concurrent first-joiners resolve to
    /// one host and the rest spectators, in arrival order. The whole
    /// method runs under the hub lock, which closes the race between
    /// the index lookup and room creation.
    pub fn join_or_create_session(
        &mut self,
        id: PlayerId,
        session_id: &str,
        game: GameMeta,
        username: Option<String>,
    ) -> Result<(), RegistryError> {
        if session_id.is_empty() {
            return Err(RegistryError::SessionIdRequired);
        }

        if let Some(code) = self.sessions.get(session_id).cloned() {
            if self.rooms.contains_key(&code) {
                let admission = self.admit(
                    id,
                    &code,
                    username,
                    None,
                    Some(session_id.into()),
                )?;
                self.send_to(
                    id,
                    ServerEvent::RoomJoined {
                        room_code: code,
                        role: admission.role,
                        host_id: admission.host_id,
                        players_count: admission.players_count,
                        game: admission.game,
                        session_id: Some(session_id.into()),
                    },
                );
                return Ok(());
            }
            self.sessions.remove(session_id);
            tracing::warn!(session_id, %code, "dropped stale session mapping");
        }

        let code =
            self.insert_room(id, game, username, Some(session_id.into()))?;
        self.sessions.insert(session_id.into(), code.clone());
        let room = &self.rooms[&code];
        self.send_to(
            id,
            ServerEvent::RoomCreated {
                room_code: code.clone(),
                role: Role::Host,
                game: room.game.clone(),
                session_id: Some(session_id.into()),
            },
        );
        Ok(())
    }

    /// Removes the caller from their room, if any.
    ///
    /// The last member leaving destroys the room and its session-index
    /// entries in this same call — there is no observable state where
    /// one exists without the other. Otherwise the earliest-joined
    /// remaining member inherits the host role when the host departs,
    /// and the room hears `host-changed` (if any) then `player-left`.
    pub fn leave_room(&mut self, id: PlayerId) {
        let Some(code) = self.players.get_mut(&id).and_then(|p| p.room.take())
        else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };

        let was_host = room.host_id == id;
        if !room.remove_member(id) {
            return;
        }

        if room.is_empty() {
            self.rooms.remove(&code);
            self.sessions.retain(|_, mapped| *mapped != code);
            tracing::info!(%code, "room destroyed (last member left)");
            return;
        }

        let mut events = Vec::with_capacity(2);
        if was_host {
            let new_host = room.members[0];
            room.host_id = new_host;
            tracing::info!(%code, %new_host, "host changed");
            events.push(ServerEvent::HostChanged { new_host });
        }
        events.push(ServerEvent::PlayerLeft {
            player_id: id,
            players_count: room.players_count(),
        });

        let members = room.members.clone();
        for event in events {
            for member in &members {
                self.send_to(*member, event.clone());
            }
        }
    }

    /// Answers `check-room`: does the room exist, and how full is it?
    /// Never an error — unknown codes report `exists: false`.
    pub fn check_room(&self, id: PlayerId, raw_code: &str) {
        let code = RoomCode::normalized(raw_code);
        let event = match self.rooms.get(&code) {
            Some(room) => ServerEvent::RoomStatus {
                exists: true,
                // host_id is always a live member, see Room invariants
                has_host: true,
                room_code: code.to_string(),
                players_count: room.players_count(),
            },
            None => ServerEvent::RoomStatus {
                exists: false,
                has_host: false,
                room_code: code.to_string(),
                players_count: 0,
            },
        };
        self.send_to(id, event);
    }

    // -- Read accessors ------------------------------------------------------

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// The room a session id currently maps to, if any.
    pub fn session_room(&self, session_id: &str) -> Option<&RoomCode> {
        self.sessions.get(session_id)
    }

    pub fn players_count(&self) -> usize {
        self.players.len()
    }

    pub fn rooms_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn sessions_count(&self) -> usize {
        self.sessions.len()
    }

    /// Iterates the session index, pairing each id with its room (or
    /// `None` if the cleanup invariant was somehow violated).
    pub(crate) fn sessions_iter(
        &self,
    ) -> impl Iterator<Item = (&str, Option<&Room>)> {
        self.sessions
            .iter()
            .map(|(sid, code)| (sid.as_str(), self.rooms.get(code)))
    }

    // -- Internals -----------------------------------------------------------

    /// Creates a room with a freshly generated code and the caller as
    /// host; updates the caller's player record. Emits nothing.
    fn insert_room(
        &mut self,
        id: PlayerId,
        game: GameMeta,
        username: Option<String>,
        session_id: Option<String>,
    ) -> Result<RoomCode, RegistryError> {
        let code = self.generate_code()?;
        let mut room = Room::new(code.clone(), id, game, now_millis());
        room.session_id = session_id.clone();
        self.rooms.insert(code.clone(), room);

        if let Some(player) = self.players.get_mut(&id) {
            player.room = Some(code.clone());
            if let Some(name) = username.filter(|n| !n.is_empty()) {
                player.username = name;
            }
            if session_id.is_some() {
                player.session_id = session_id;
            }
        }
        tracing::info!(%id, %code, "room created");
        Ok(code)
    }

    /// Places a player into an existing room and broadcasts
    /// `player-joined`; idempotent for current members (no mutation, no
    /// broadcast).
    fn admit(
        &mut self,
        id: PlayerId,
        code: &RoomCode,
        username: Option<String>,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Admission, RegistryError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RegistryError::RoomNotFound(code.clone()))?;

        if room.contains(id) {
            tracing::debug!(%id, %code, "re-confirming existing membership");
            return Ok(Admission {
                role: room.role_of(id),
                host_id: room.host_id,
                players_count: room.players_count(),
                game: room.game.clone(),
                rejoined: true,
            });
        }

        room.members.push(id);
        let admission = Admission {
            role: Role::Spectator,
            host_id: room.host_id,
            players_count: room.players_count(),
            game: room.game.clone(),
            rejoined: false,
        };
        let members = room.members.clone();

        let username_now = match self.players.get_mut(&id) {
            Some(player) => {
                player.room = Some(code.clone());
                if let Some(name) = username.filter(|n| !n.is_empty()) {
                    player.username = name;
                }
                if user_id.is_some() {
                    player.user_id = user_id;
                }
                if session_id.is_some() {
                    player.session_id = session_id;
                }
                player.username.clone()
            }
            None => default_username(id),
        };
        tracing::info!(
            %id, %code,
            players = admission.players_count,
            "player joined room"
        );

        let joined = ServerEvent::PlayerJoined {
            player_id: id,
            username: username_now,
            players_count: admission.players_count,
            room_code: code.clone(),
        };
        for member in &members {
            self.send_to(*member, joined.clone());
        }
        Ok(admission)
    }

    /// Generates a code not currently in use, with a bounded number of
    /// attempts.
    fn generate_code(&self) -> Result<RoomCode, RegistryError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = (self.code_source)();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::error!(
            rooms = self.rooms.len(),
            "room code generation exhausted its retry budget"
        );
        Err(RegistryError::CodesExhausted)
    }

    /// Builds the lobby-facing summary of one session.
    pub(crate) fn session_summary(
        &self,
        session_id: &str,
        room: &Room,
    ) -> SessionSummary {
        SessionSummary {
            session_id: session_id.into(),
            room_code: room.code.clone(),
            players_count: room.players_count(),
            game: room.game.clone(),
            status: room.status(),
            created_at: room.created_at,
            session_name: room.session_name.clone(),
            host_name: self
                .players
                .get(&room.host_id)
                .map(|p| p.username.clone()),
            max_players: room.max_players,
            is_public: room.is_public,
        }
    }

    /// Queues an event for one player. No-op for unknown ids.
    pub(crate) fn send_to(&self, id: PlayerId, event: ServerEvent) {
        if let Some(player) = self.players.get(&id) {
            player.send(event);
        }
    }

    /// Delivers an event to every member of a room, optionally skipping
    /// the sender.
    pub(crate) fn broadcast_room(
        &self,
        room: &Room,
        exclude: Option<PlayerId>,
        event: ServerEvent,
    ) {
        for member in &room.members {
            if Some(*member) == exclude {
                continue;
            }
            self.send_to(*member, event.clone());
        }
    }

    /// Delivers an event to every connected player (lobby-wide).
    pub(crate) fn broadcast_all(
        &self,
        exclude: Option<PlayerId>,
        event: ServerEvent,
    ) {
        for player in self.players.values() {
            if Some(player.id) == exclude {
                continue;
            }
            player.send(event.clone());
        }
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Draws one uniformly random code from the room-code alphabet.
fn random_code() -> RoomCode {
    let mut rng = rand::rng();
    let raw: String = (0..RoomCode::LEN)
        .map(|_| {
            let idx = rng.random_range(0..RoomCode::ALPHABET.len());
            RoomCode::ALPHABET[idx] as char
        })
        .collect();
    RoomCode::normalized(&raw)
}
