//! Shared fixtures for the integration tests.
//!
//! Everything runs against `MemoryBackend`, so no database is needed.

#![allow(dead_code)]

use agm::backend::{Backend, MemoryBackend};
use agm::models::agenda::{Agenda, AgendaId, ItemKind, NewAgenda};
use agm::models::attendance::{AttendanceType, Ballot, NewAttendance};
use agm::models::member::{Member, NewMember};

/// Ids of the standard agenda: `[F1, I2, I3, F4, I5]`.
pub struct Fixture {
    pub backend: MemoryBackend,
    pub members: Vec<Member>,
    pub meeting_a: AgendaId,
    pub budget: AgendaId,
    pub bylaws: AgendaId,
    pub meeting_b: AgendaId,
    pub election: AgendaId,
}

pub fn new_member(unit: &str, name: &str) -> NewMember {
    NewMember {
        unit: unit.to_string(),
        name: name.to_string(),
        proxy: None,
    }
}

pub fn folder(title: &str) -> NewAgenda {
    NewAgenda::Folder {
        title: title.to_string(),
        presentation_url: None,
    }
}

pub fn item(kind: ItemKind, title: &str) -> NewAgenda {
    NewAgenda::Item {
        kind,
        title: title.to_string(),
        presentation_url: None,
        start_page: None,
    }
}

pub async fn insert(backend: &MemoryBackend, new: NewAgenda) -> Agenda {
    backend.insert_agenda(new, None).await.expect("Failed to insert agenda")
}

/// Backend with `roster_size` members and the standard agenda.
pub async fn setup(roster_size: usize) -> Fixture {
    let backend = MemoryBackend::default();

    let rows = (1..=roster_size)
        .map(|i| new_member(&format!("101-{i:03}"), &format!("Owner {i}")))
        .collect();
    let members = backend.import_members(rows).await.expect("Failed to import roster");

    let meeting_a = insert(&backend, NewAgenda::Folder {
        title: "2026 Annual Meeting".into(),
        presentation_url: Some("/files/decks/annual.pdf".into()),
    })
    .await
    .id();
    let budget = insert(&backend, NewAgenda::Item {
        kind: ItemKind::Majority,
        title: "Approve budget".into(),
        presentation_url: None,
        start_page: Some(4),
    })
    .await
    .id();
    let bylaws = insert(&backend, item(ItemKind::TwoThirds, "Amend bylaws")).await.id();
    let meeting_b = insert(&backend, folder("Board Election")).await.id();
    let election = insert(&backend, item(ItemKind::Election, "Elect chair")).await.id();

    Fixture {
        backend,
        members,
        meeting_a,
        budget,
        bylaws,
        meeting_b,
        election,
    }
}

pub fn attendance(member: &Member, meeting_id: AgendaId, kind: AttendanceType) -> NewAttendance {
    NewAttendance {
        member_id: member.id,
        meeting_id,
        kind,
        proxy_name: (kind == AttendanceType::Proxy).then(|| format!("Delegate of {}", member.name)),
        votes: Vec::new(),
    }
}

pub fn written(member: &Member, meeting_id: AgendaId, votes: Vec<Ballot>) -> NewAttendance {
    NewAttendance {
        votes,
        ..attendance(member, meeting_id, AttendanceType::Written)
    }
}

/// Check in the first `direct + proxy + written` members, in that order.
pub async fn check_in_many(fx: &Fixture, meeting_id: AgendaId, direct: usize, proxy: usize, written_n: usize) {
    let kinds = std::iter::repeat_n(AttendanceType::Direct, direct)
        .chain(std::iter::repeat_n(AttendanceType::Proxy, proxy))
        .chain(std::iter::repeat_n(AttendanceType::Written, written_n));
    for (member, kind) in fx.members.iter().zip(kinds) {
        fx.backend
            .upsert_attendance(attendance(member, meeting_id, kind))
            .await
            .expect("Failed to check in");
    }
}
