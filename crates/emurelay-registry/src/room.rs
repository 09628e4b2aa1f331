//! Room records: one per active game session.

use emurelay_protocol::{GameMeta, PlayerId, Role, RoomCode, SessionStatus};

/// One active room.
///
/// Invariants, upheld by the [`Registry`](crate::Registry):
/// - `host_id` is always an element of `members` while `members` is
///   non-empty;
/// - a room with no members does not exist (it is removed, together
///   with any session-index entry pointing at it, in the same
///   operation that empties it);
/// - `members` holds each id at most once, in join order — that order
///   is the host-failover priority.
#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub members: Vec<PlayerId>,
    /// Opaque game metadata, passed through unvalidated.
    pub game: GameMeta,
    pub session_id: Option<String>,
    pub session_name: Option<String>,
    pub max_players: Option<u32>,
    pub is_public: bool,
    /// Epoch millis at creation. Informational only.
    pub created_at: u64,
}

impl Room {
    pub(crate) fn new(
        code: RoomCode,
        host_id: PlayerId,
        game: GameMeta,
        created_at: u64,
    ) -> Self {
        Self {
            code,
            host_id,
            members: vec![host_id],
            game,
            session_id: None,
            session_name: None,
            max_players: None,
            is_public: true,
            created_at,
        }
    }

    /// Returns `true` if the player is a current member.
    pub fn contains(&self, id: PlayerId) -> bool {
        self.members.contains(&id)
    }

    /// Number of current members.
    pub fn players_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The player's role, derived from the current host.
    pub fn role_of(&self, id: PlayerId) -> Role {
        if self.host_id == id { Role::Host } else { Role::Spectator }
    }

    /// Lobby status: waiting until a second member arrives.
    pub fn status(&self) -> SessionStatus {
        if self.members.len() > 1 {
            SessionStatus::Playing
        } else {
            SessionStatus::Waiting
        }
    }

    /// Removes a member, preserving the join order of the rest.
    /// Returns `true` if the player was a member.
    pub(crate) fn remove_member(&mut self, id: PlayerId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        self.members.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new(
            RoomCode::normalized("AB12CD"),
            PlayerId(1),
            GameMeta::default(),
            0,
        )
    }

    #[test]
    fn new_room_contains_only_its_host() {
        let room = room();
        assert_eq!(room.members, vec![PlayerId(1)]);
        assert_eq!(room.host_id, PlayerId(1));
        assert_eq!(room.role_of(PlayerId(1)), Role::Host);
    }

    #[test]
    fn non_host_members_are_spectators() {
        let mut room = room();
        room.members.push(PlayerId(2));
        assert_eq!(room.role_of(PlayerId(2)), Role::Spectator);
    }

    #[test]
    fn remove_member_keeps_join_order() {
        let mut room = room();
        room.members.extend([PlayerId(2), PlayerId(3), PlayerId(4)]);
        assert!(room.remove_member(PlayerId(3)));
        assert_eq!(room.members, vec![PlayerId(1), PlayerId(2), PlayerId(4)]);
        assert!(!room.remove_member(PlayerId(3)));
    }

    #[test]
    fn status_flips_to_playing_with_a_second_member() {
        let mut room = room();
        assert_eq!(room.status(), SessionStatus::Waiting);
        room.members.push(PlayerId(2));
        assert_eq!(room.status(), SessionStatus::Playing);
    }
}
