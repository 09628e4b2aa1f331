//! Player records: one per live connection.

use emurelay_protocol::{PlayerId, RoomCode, ServerEvent};
use tokio::sync::mpsc;

/// Outbound channel for delivering events to one player's connection.
///
/// Unbounded on purpose: sends never block and never fail back into the
/// registry, so a stalled receiver cannot stall the sender or the other
/// members of its room. The connection's writer task drains the other
/// end.
pub type EventSink = mpsc::UnboundedSender<ServerEvent>;

/// One connected player. Created on connect, destroyed on disconnect.
///
/// Owned exclusively by the [`Registry`](crate::Registry); rooms hold
/// only the `id` as a reference. The player's role is not stored here —
/// it is derived from the room's current `host_id`, so it cannot
/// disagree with host failover.
#[derive(Debug)]
pub struct Player {
    /// Connection-derived id, unique for the connection's lifetime.
    pub id: PlayerId,
    /// The room this player is currently in, if any.
    pub room: Option<RoomCode>,
    /// Display name; defaulted until a join/create supplies one.
    pub username: String,
    /// Caller-supplied external identity, if any.
    pub user_id: Option<String>,
    /// The session this player entered through, if any.
    pub session_id: Option<String>,
    /// Epoch millis at connection time. Informational only.
    pub connected_at: u64,
    sink: EventSink,
}

impl Player {
    pub(crate) fn new(id: PlayerId, sink: EventSink, connected_at: u64) -> Self {
        Self {
            id,
            room: None,
            username: default_username(id),
            user_id: None,
            session_id: None,
            connected_at,
            sink,
        }
    }

    /// Queues an event for delivery. Fire-and-forget: if the connection
    /// is already gone the event is dropped silently.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sink.send(event);
    }
}

/// Display name used until the player supplies one.
pub(crate) fn default_username(id: PlayerId) -> String {
    format!("Player_{}", id.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_starts_roomless_with_default_name() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = Player::new(PlayerId(7), tx, 1_000);
        assert!(player.room.is_none());
        assert_eq!(player.username, "Player_7");
        assert!(player.user_id.is_none());
        assert_eq!(player.connected_at, 1_000);
    }

    #[test]
    fn send_to_a_dropped_sink_is_a_no_op() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let player = Player::new(PlayerId(1), tx, 0);
        // Must not panic or error out.
        player.send(ServerEvent::HeartbeatAck { timestamp: 1 });
    }
}
