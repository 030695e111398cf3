use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use uuid::Uuid;

/// A registered member. Immutable after registration and never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Stable identifier.
    pub id: Uuid,
    /// Human-facing number, assigned in registration order starting at 1.
    pub member_number: u32,
    /// Display name, unique-ness not enforced.
    pub nickname: String,
    /// Opaque bearer token handed out at registration.
    pub access_token: String,
    /// Registration instant.
    pub created_at: SystemTime,
}

/// One entry into the facility. Rows are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySession {
    /// Stable identifier of this ledger row.
    pub id: Uuid,
    /// Member who entered.
    pub member_id: Uuid,
    /// Check-in instant.
    pub entry_at: SystemTime,
    /// When the session lapses on its own.
    pub expires_at: SystemTime,
    /// Cleared only by administrative curation, never by this service.
    pub is_active: bool,
}

impl EntrySession {
    /// Whether the session currently grants access.
    pub fn is_current(&self, now: SystemTime) -> bool {
        self.is_active && self.expires_at > now
    }
}

/// Members and their entry ledger.
///
/// The ledger is deliberately append-only: a member checking in again before
/// the previous session lapses simply gets a second row, and reads resolve
/// the newest current one. Sessions are kept in `entry_at` order so "newest"
/// falls out of iteration order on ties.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    members: IndexMap<Uuid, Member>,
    sessions: IndexMap<Uuid, EntrySession>,
    next_member_number: u32,
}

impl Directory {
    /// Empty directory; numbering starts at 1.
    pub fn new() -> Self {
        Self {
            members: IndexMap::new(),
            sessions: IndexMap::new(),
            next_member_number: 1,
        }
    }

    /// True when nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.sessions.is_empty()
    }

    /// Register a member under the next free member number.
    pub fn add_member(
        &mut self,
        nickname: String,
        access_token: String,
        now: SystemTime,
    ) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            member_number: self.next_member_number,
            nickname,
            access_token,
            created_at: now,
        };
        self.next_member_number += 1;
        self.members.insert(member.id, member.clone());
        member
    }

    /// Register a member and open their first entry session in one step.
    pub fn register(
        &mut self,
        nickname: String,
        access_token: String,
        now: SystemTime,
        ttl: Duration,
    ) -> (Member, EntrySession) {
        let member = self.add_member(nickname, access_token, now);
        let session = self.append_session(member.id, now, ttl);
        (member, session)
    }

    /// Look up a member by id.
    pub fn member(&self, member_id: Uuid) -> Option<&Member> {
        self.members.get(&member_id)
    }

    /// Iterate members in registration order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Iterate the full ledger in entry order.
    pub fn sessions(&self) -> impl Iterator<Item = &EntrySession> {
        self.sessions.values()
    }

    /// Append a new entry session for the member.
    ///
    /// Always inserts, even while an earlier session is still current; reads
    /// pick the newest. Returns `None` for an unknown member.
    pub fn open_session(
        &mut self,
        member_id: Uuid,
        now: SystemTime,
        ttl: Duration,
    ) -> Option<EntrySession> {
        if !self.members.contains_key(&member_id) {
            return None;
        }
        Some(self.append_session(member_id, now, ttl))
    }

    fn append_session(&mut self, member_id: Uuid, now: SystemTime, ttl: Duration) -> EntrySession {
        let session = EntrySession {
            id: Uuid::new_v4(),
            member_id,
            entry_at: now,
            expires_at: now + ttl,
            is_active: true,
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    /// The member's newest current session, or `None` when every session has
    /// lapsed. A lapsed session is an absence, not an error.
    pub fn active_session(&self, member_id: Uuid, now: SystemTime) -> Option<&EntrySession> {
        self.sessions
            .values()
            .filter(|session| session.member_id == member_id && session.is_current(now))
            .max_by_key(|session| session.entry_at)
    }

    /// Everyone currently in the facility: one row per member carrying their
    /// newest current session, most recent entries first.
    pub fn active_sessions(&self, now: SystemTime) -> Vec<(&Member, &EntrySession)> {
        let mut newest: IndexMap<Uuid, &EntrySession> = IndexMap::new();
        for session in self.sessions.values().filter(|session| session.is_current(now)) {
            match newest.get(&session.member_id) {
                Some(current) if current.entry_at > session.entry_at => {}
                _ => {
                    newest.insert(session.member_id, session);
                }
            }
        }

        let mut rows: Vec<(&Member, &EntrySession)> = newest
            .into_iter()
            .filter_map(|(member_id, session)| {
                self.members.get(&member_id).map(|member| (member, session))
            })
            .collect();
        rows.sort_by(|(left_member, left), (right_member, right)| {
            right
                .entry_at
                .cmp(&left.entry_at)
                .then(left_member.member_number.cmp(&right_member.member_number))
        });
        rows
    }

    /// Replace the in-memory content with rows loaded from storage.
    ///
    /// Member numbering continues after the highest loaded number. Sessions
    /// are re-sorted by entry time so newest-wins reads keep working.
    pub fn hydrate(&mut self, members: Vec<Member>, mut sessions: Vec<EntrySession>) {
        self.next_member_number = members
            .iter()
            .map(|member| member.member_number)
            .max()
            .map(|max| max + 1)
            .unwrap_or(1);

        self.members = members
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

        sessions.sort_by_key(|session| session.entry_at);
        self.sessions = sessions
            .into_iter()
            .map(|session| (session.id, session))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(2 * 60 * 60);

    fn at(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
    }

    fn register(directory: &mut Directory, nickname: &str) -> Member {
        directory.add_member(nickname.into(), format!("token-{nickname}"), at(0))
    }

    #[test]
    fn member_numbers_are_monotonic_from_one() {
        let mut directory = Directory::new();
        let first = register(&mut directory, "alice");
        let second = register(&mut directory, "bob");

        assert_eq!(first.member_number, 1);
        assert_eq!(second.member_number, 2);
        assert_eq!(directory.member(first.id).unwrap().nickname, "alice");
    }

    #[test]
    fn open_session_always_appends() {
        let mut directory = Directory::new();
        let member = register(&mut directory, "alice");

        directory.open_session(member.id, at(10), TTL).unwrap();
        directory.open_session(member.id, at(20), TTL).unwrap();

        assert_eq!(directory.sessions().count(), 2);
    }

    #[test]
    fn open_session_for_an_unknown_member_is_refused() {
        let mut directory = Directory::new();
        assert!(directory.open_session(Uuid::new_v4(), at(0), TTL).is_none());
    }

    #[test]
    fn register_opens_the_first_session_atomically() {
        let mut directory = Directory::new();
        let (member, session) = directory.register("alice".into(), "tok".into(), at(5), TTL);

        assert_eq!(member.member_number, 1);
        assert_eq!(session.member_id, member.id);
        assert_eq!(session.expires_at, at(5) + TTL);
        assert_eq!(directory.active_session(member.id, at(6)).unwrap().id, session.id);
    }

    #[test]
    fn newest_current_session_wins() {
        let mut directory = Directory::new();
        let member = register(&mut directory, "alice");

        directory.open_session(member.id, at(10), TTL).unwrap();
        let newer = directory.open_session(member.id, at(500), TTL).unwrap();

        let active = directory.active_session(member.id, at(600)).unwrap();
        assert_eq!(active.id, newer.id);
    }

    #[test]
    fn lapsed_sessions_read_as_absent() {
        let mut directory = Directory::new();
        let member = register(&mut directory, "alice");
        let session = directory.open_session(member.id, at(0), TTL).unwrap();

        assert!(directory.active_session(member.id, at(100)).is_some());
        // Exactly at the boundary the session no longer counts.
        assert!(directory.active_session(member.id, session.expires_at - Duration::from_secs(1)).is_some());
        assert!(directory.active_session(member.id, session.expires_at).is_none());
        assert!(directory.active_session(member.id, at(1_000_000)).is_none());
    }

    #[test]
    fn deactivated_rows_never_grant_access() {
        let mut directory = Directory::new();
        let member = register(&mut directory, "alice");
        let mut session = directory.open_session(member.id, at(0), TTL).unwrap();
        session.is_active = false;
        directory.hydrate(vec![member.clone()], vec![session]);

        assert!(directory.active_session(member.id, at(10)).is_none());
    }

    #[test]
    fn re_entry_after_expiry_opens_a_fresh_session() {
        let mut directory = Directory::new();
        let member = register(&mut directory, "alice");
        directory.open_session(member.id, at(0), TTL).unwrap();

        let after_expiry = at(TTL.as_secs() + 60);
        assert!(directory.active_session(member.id, after_expiry).is_none());

        directory.open_session(member.id, after_expiry, TTL).unwrap();
        assert!(directory.active_session(member.id, after_expiry + Duration::from_secs(1)).is_some());
        assert_eq!(directory.sessions().count(), 2);
    }

    #[test]
    fn active_sessions_lists_one_row_per_member_newest_first() {
        let mut directory = Directory::new();
        let alice = register(&mut directory, "alice");
        let bob = register(&mut directory, "bob");

        directory.open_session(alice.id, at(10), TTL).unwrap();
        let newer = directory.open_session(alice.id, at(300), TTL).unwrap();
        directory.open_session(bob.id, at(200), TTL).unwrap();

        let rows = directory.active_sessions(at(400));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.id, alice.id);
        assert_eq!(rows[0].1.id, newer.id);
        assert_eq!(rows[1].0.id, bob.id);
    }

    #[test]
    fn hydrate_restores_numbering_and_session_order() {
        let mut directory = Directory::new();
        let alice = register(&mut directory, "alice");
        let bob = register(&mut directory, "bob");
        let old = directory.open_session(alice.id, at(10), TTL).unwrap();
        let recent = directory.open_session(alice.id, at(50), TTL).unwrap();

        let mut restored = Directory::new();
        // Sessions arrive out of order from storage.
        restored.hydrate(vec![alice.clone(), bob.clone()], vec![recent.clone(), old]);

        assert_eq!(restored.active_session(alice.id, at(60)).unwrap().id, recent.id);
        let next = restored.add_member("carol".into(), "token-carol".into(), at(100));
        assert_eq!(next.member_number, 3);

        let mut empty = Directory::new();
        empty.hydrate(Vec::new(), Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.add_member("dave".into(), "t".into(), at(0)).member_number, 1);
    }
}
