//! Relay routing: read-only fan-out of gameplay traffic over current
//! room membership.
//!
//! All relay operations are deliberately best-effort: a sender that is
//! not in a recognized room is silently ignored rather than answered
//! with an error. Gameplay frames arrive at high frequency, the
//! condition self-heals on the next valid frame, and error chatter
//! would drown everything else out.

use emurelay_protocol::{PlayerId, ServerEvent, SessionSummary};

use crate::registry::now_millis;
use crate::{Registry, Room};

impl Registry {
    /// Host input frame: delivered to every member except the sender.
    pub fn relay_input(&self, sender: PlayerId, payload: serde_json::Value) {
        let Some(room) = self.room_of(sender) else { return };
        self.broadcast_room(room, Some(sender), ServerEvent::Input(payload));
    }

    /// Host state snapshot: delivered to every member except the sender.
    pub fn relay_sync_state(&self, sender: PlayerId, payload: serde_json::Value) {
        let Some(room) = self.room_of(sender) else { return };
        self.broadcast_room(room, Some(sender), ServerEvent::StateUpdate(payload));
    }

    /// Guest input frame: delivered to the room's current host only.
    /// Guests never see each other's raw input, and after a host
    /// failover this follows the new host automatically.
    pub fn relay_guest_input(&self, sender: PlayerId, payload: serde_json::Value) {
        let Some(room) = self.room_of(sender) else { return };
        self.send_to(room.host_id, ServerEvent::Player2Input(payload));
    }

    /// Chat line: stamped with the sender's id, resolved username, and a
    /// timestamp, then delivered to the whole room, sender included.
    pub fn relay_chat(&self, sender: PlayerId, message: String) {
        let Some(player) = self.player(sender) else { return };
        let Some(code) = &player.room else { return };
        let Some(room) = self.room(code) else { return };
        let event = ServerEvent::ChatMessage {
            player_id: sender,
            username: player.username.clone(),
            message,
            timestamp: now_millis(),
        };
        self.broadcast_room(room, None, event);
    }

    /// Answers `get-lobby-sessions` with a snapshot of every session
    /// whose room is live, in session-index iteration order. Entries
    /// whose room is gone are skipped rather than crashed on — the
    /// cleanup invariant should make them unreachable, but the lobby
    /// must stay available even if it is violated.
    pub fn lobby_sessions(&self, caller: PlayerId) {
        let sessions: Vec<SessionSummary> = self
            .sessions_iter()
            .filter_map(|(session_id, room)| {
                room.map(|r| self.session_summary(session_id, r))
            })
            .collect();
        tracing::debug!(%caller, count = sessions.len(), "lobby snapshot");
        self.send_to(caller, ServerEvent::LobbySessions { sessions });
    }

    /// Resolves the sender's current room, if both player and room exist.
    fn room_of(&self, id: PlayerId) -> Option<&Room> {
        self.player(id)
            .and_then(|p| p.room.as_ref())
            .and_then(|code| self.room(code))
    }
}
