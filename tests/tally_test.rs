use chrono::Utc;

use agm::models::agenda::{Agenda, Item, ItemKind, NewAgenda, VoteCounts, VoteResult};
use agm::models::attendance::{AttendanceRecord, AttendanceType, Ballot, Choice};
use agm::tally::{
    DeclarationDraft, MeetingStats, StatsCache, VoteField, assign_meeting_ids, auto_balance, compute_meeting_stats,
    compute_passage, compute_quorum, confirm_snapshot, edit_votes, effective_tally, generate_declaration,
    reset_snapshot, resolve_meeting_context, written_ballot_counts,
};

fn record(member_id: i64, meeting_id: i64, kind: AttendanceType) -> AttendanceRecord {
    AttendanceRecord {
        member_id,
        meeting_id,
        kind,
        proxy_name: None,
        votes: Vec::new(),
        checked_in_at: Utc::now(),
    }
}

fn stats(direct: u32, proxy: u32, written: u32) -> MeetingStats {
    MeetingStats {
        direct,
        proxy,
        written,
        total: direct + proxy + written,
    }
}

fn new_item(id: i64, kind: ItemKind) -> Item {
    NewAgenda::Item {
        kind,
        title: format!("Item {id}"),
        presentation_url: None,
        start_page: None,
    }
    .into_agenda(id, id as i32)
    .as_item()
    .cloned()
    .unwrap()
}

// ---------------------------------------------------------------------------
// Meeting stats
// ---------------------------------------------------------------------------

#[test]
fn test_stats_count_only_the_requested_meeting() {
    let records = vec![
        record(1, 10, AttendanceType::Direct),
        record(2, 10, AttendanceType::Proxy),
        record(3, 10, AttendanceType::Written),
        record(4, 10, AttendanceType::Direct),
        record(1, 20, AttendanceType::Written),
    ];

    let s = compute_meeting_stats(Some(10), &records);
    assert_eq!(s, stats(2, 1, 1));
    assert_eq!(s.total, s.direct + s.proxy + s.written);

    assert_eq!(compute_meeting_stats(Some(20), &records), stats(0, 0, 1));
    assert_eq!(compute_meeting_stats(None, &records), MeetingStats::default());
    assert_eq!(compute_meeting_stats(Some(99), &records), MeetingStats::default());
}

#[test]
fn test_stats_cache_recomputes_when_version_changes() {
    let mut records = vec![record(1, 10, AttendanceType::Direct)];
    let mut cache = StatsCache::default();

    assert_eq!(cache.get(Some(10), 1, &records).total, 1);
    records.push(record(2, 10, AttendanceType::Proxy));
    assert_eq!(cache.get(Some(10), 2, &records).total, 2);
    assert_eq!(cache.get(Some(20), 2, &records).total, 0);
}

#[test]
fn test_written_ballots_are_counted_per_item() {
    let mut a = record(1, 10, AttendanceType::Written);
    a.votes = vec![
        Ballot { agenda_id: 11, choice: Choice::Yes },
        Ballot { agenda_id: 12, choice: Choice::No },
    ];
    let mut b = record(2, 10, AttendanceType::Written);
    b.votes = vec![Ballot { agenda_id: 11, choice: Choice::Abstain }];
    let direct = record(3, 10, AttendanceType::Direct);

    let records = vec![a, b, direct];
    assert_eq!(written_ballot_counts(11, &records), VoteCounts::new(1, 0, 1));
    assert_eq!(written_ballot_counts(12, &records), VoteCounts::new(0, 1, 0));
    assert_eq!(written_ballot_counts(13, &records), VoteCounts::default());
}

// ---------------------------------------------------------------------------
// Quorum
// ---------------------------------------------------------------------------

#[test]
fn test_quorum_targets_round_up() {
    let q = compute_quorum(10, &stats(5, 0, 0), ItemKind::Majority);
    assert_eq!(q.quorum_target, 5);
    assert!(q.is_quorum_satisfied);
    assert_eq!(q.direct_target, 0);

    let q = compute_quorum(10, &stats(6, 0, 0), ItemKind::TwoThirds);
    assert_eq!(q.quorum_target, 7);
    assert!(!q.is_quorum_satisfied);

    let q = compute_quorum(11, &stats(0, 0, 0), ItemKind::Majority);
    assert_eq!(q.quorum_target, 6);
}

#[test]
fn test_election_needs_direct_attendance() {
    // 10 members: a fifth (2) must attend in person.
    let q = compute_quorum(10, &stats(1, 4, 5), ItemKind::Election);
    assert_eq!(q.direct_target, 2);
    assert!(!q.is_direct_satisfied);
    assert!(!q.is_quorum_satisfied, "total alone must not satisfy an election");

    let q = compute_quorum(10, &stats(2, 1, 2), ItemKind::Election);
    assert!(q.is_direct_satisfied);
    assert!(q.is_quorum_satisfied);

    // 11 members: ceil(11/5) = 3.
    assert_eq!(compute_quorum(11, &stats(0, 0, 0), ItemKind::Election).direct_target, 3);
}

#[test]
fn test_quorum_is_monotonic_in_attendance() {
    for kind in [ItemKind::Majority, ItemKind::TwoThirds, ItemKind::Election] {
        let mut was_satisfied = false;
        for direct in 0..=20 {
            let q = compute_quorum(20, &stats(direct, 0, 0), kind);
            assert!(!was_satisfied || q.is_quorum_satisfied, "{kind:?} lost quorum at {direct}");
            was_satisfied = q.is_quorum_satisfied;
        }
        assert!(was_satisfied);
    }
}

#[test]
fn test_quorum_target_grows_with_roster() {
    let mut previous = [0u32; 3];
    for n in 0..=60u32 {
        let majority = compute_quorum(n, &stats(0, 0, 0), ItemKind::Majority).quorum_target;
        let two_thirds = compute_quorum(n, &stats(0, 0, 0), ItemKind::TwoThirds).quorum_target;
        let election = compute_quorum(n, &stats(0, 0, 0), ItemKind::Election).direct_target;

        assert_eq!(majority, n.div_ceil(2), "majority target for {n}");
        assert_eq!(two_thirds, (2 * n).div_ceil(3), "two-thirds target for {n}");
        assert_eq!(election, n.div_ceil(5), "direct target for {n}");

        let current = [majority, two_thirds, election];
        for (now, before) in current.iter().zip(previous) {
            assert!(*now >= before, "target shrank when the roster grew to {n}");
        }
        previous = current;
    }
}

#[test]
fn test_larger_roster_never_creates_quorum() {
    let attending = stats(6, 2, 2);
    for kind in [ItemKind::Majority, ItemKind::TwoThirds, ItemKind::Election] {
        let mut was_satisfied = true;
        for n in 10..=40 {
            let q = compute_quorum(n, &attending, kind);
            assert!(was_satisfied || !q.is_quorum_satisfied, "{kind:?} regained quorum at {n} members");
            was_satisfied = q.is_quorum_satisfied;
        }
    }
}

#[test]
fn test_empty_roster_is_flagged() {
    let q = compute_quorum(0, &stats(0, 0, 0), ItemKind::Election);
    assert!(q.roster_empty);
    assert_eq!(q.quorum_target, 0);
    assert_eq!(q.direct_target, 0);
}

// ---------------------------------------------------------------------------
// Passage
// ---------------------------------------------------------------------------

#[test]
fn test_two_thirds_boundary() {
    assert!(compute_passage(7, 10, ItemKind::TwoThirds));
    assert!(!compute_passage(6, 10, ItemKind::TwoThirds));
    assert!(compute_passage(2, 3, ItemKind::TwoThirds));
    assert!(!compute_passage(1, 3, ItemKind::TwoThirds));
}

#[test]
fn test_majority_tie_fails() {
    assert!(!compute_passage(5, 10, ItemKind::Majority));
    assert!(compute_passage(6, 10, ItemKind::Majority));
    assert!(!compute_passage(5, 10, ItemKind::Election));
    assert!(compute_passage(6, 11, ItemKind::Election));
}

// ---------------------------------------------------------------------------
// Vote entry
// ---------------------------------------------------------------------------

#[test]
fn test_auto_balance_tracks_total() {
    let votes = auto_balance(VoteField::Yes, 60, 100, VoteCounts::default());
    assert_eq!(votes, VoteCounts::new(60, 40, 0));

    let votes = auto_balance(VoteField::Abstain, 10, 100, votes);
    assert_eq!(votes, VoteCounts::new(60, 30, 10));

    let votes = auto_balance(VoteField::No, 50, 100, votes);
    assert_eq!(votes, VoteCounts::new(40, 50, 10));
    assert_eq!(votes.sum(), 100);
}

#[test]
fn test_auto_balance_floors_at_zero() {
    let votes = auto_balance(VoteField::Yes, 120, 100, VoteCounts::new(0, 0, 5));
    assert_eq!(votes, VoteCounts::new(120, 0, 5));
}

#[test]
fn test_manual_entry_leaves_other_counters() {
    let votes = edit_votes(VoteField::Yes, 60, 100, VoteCounts::new(1, 2, 3), false);
    assert_eq!(votes, VoteCounts::new(60, 2, 3));
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn test_confirm_freezes_figures() {
    let mut item = new_item(2, ItemKind::Majority);
    item.votes = VoteCounts::new(6, 3, 1);

    let votes = item.votes;
    let snap = confirm_snapshot(&mut item, stats(8, 1, 1), votes, "declared".into(), Utc::now()).unwrap();
    assert_eq!(snap.result, VoteResult::Passed);
    assert!(item.is_confirmed());

    // Later check-ins and counter edits do not move the frozen figures.
    item.votes = VoteCounts::new(0, 10, 0);
    let tally = effective_tally(&item, stats(20, 5, 5));
    assert!(tally.frozen);
    assert_eq!(tally.stats.total, 10);
    assert_eq!(tally.votes, VoteCounts::new(6, 3, 1));
    assert_eq!(tally.result, VoteResult::Passed);
    assert_eq!(tally.declaration, "declared");
}

#[test]
fn test_second_confirm_is_rejected() {
    let mut item = new_item(2, ItemKind::Majority);
    let first = confirm_snapshot(&mut item, stats(1, 0, 0), VoteCounts::new(1, 0, 0), "a".into(), Utc::now()).unwrap();
    assert!(confirm_snapshot(&mut item, stats(9, 0, 0), VoteCounts::new(0, 9, 0), "b".into(), Utc::now()).is_err());
    assert_eq!(item.vote_snapshot.as_ref(), Some(&first));
}

#[test]
fn test_reset_returns_to_live_figures() {
    let mut item = new_item(2, ItemKind::TwoThirds);
    item.votes = VoteCounts::new(2, 8, 0);
    let votes = item.votes;
    confirm_snapshot(&mut item, stats(10, 0, 0), votes, String::new(), Utc::now()).unwrap();

    assert!(reset_snapshot(&mut item).is_some());
    assert!(reset_snapshot(&mut item).is_none());

    let tally = effective_tally(&item, stats(12, 0, 0));
    assert!(!tally.frozen);
    assert_eq!(tally.stats.total, 12);
    assert_eq!(tally.result, VoteResult::Failed);
    assert_eq!(tally.confirmed_at, None);
}

#[test]
fn test_reconfirming_same_figures_gives_same_snapshot() {
    let now = Utc::now();
    let live = stats(7, 2, 1);
    let votes = VoteCounts::new(7, 2, 1);
    for kind in [ItemKind::Majority, ItemKind::TwoThirds, ItemKind::Election] {
        let mut item = new_item(2, kind);
        item.votes = votes;

        let first = confirm_snapshot(&mut item, live, votes, "carried".into(), now).unwrap();
        let frozen = effective_tally(&item, stats(1, 0, 0));
        reset_snapshot(&mut item);
        let second = confirm_snapshot(&mut item, live, votes, "carried".into(), now).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.votes, second.votes);
        assert_eq!(first.result, second.result);
        assert_eq!(effective_tally(&item, stats(1, 0, 0)), frozen);
    }
}

// ---------------------------------------------------------------------------
// Meeting context
// ---------------------------------------------------------------------------

#[test]
fn test_items_belong_to_nearest_folder_above() {
    let mut list: Vec<Agenda> = vec![
        NewAgenda::Folder { title: "F1".into(), presentation_url: None }.into_agenda(1, 0),
        new_item_agenda(2, 1),
        new_item_agenda(3, 2),
        NewAgenda::Folder { title: "F4".into(), presentation_url: None }.into_agenda(4, 3),
        new_item_agenda(5, 4),
    ];
    assign_meeting_ids(&mut list);

    assert_eq!(resolve_meeting_context(&list, 1), Some(1));
    assert_eq!(resolve_meeting_context(&list, 2), Some(1));
    assert_eq!(resolve_meeting_context(&list, 3), Some(1));
    assert_eq!(resolve_meeting_context(&list, 4), Some(4));
    assert_eq!(resolve_meeting_context(&list, 5), Some(4));
    assert_eq!(list[4].as_item().unwrap().meeting_id, Some(4));
}

fn new_item_agenda(id: i64, order: i32) -> Agenda {
    NewAgenda::Item {
        kind: ItemKind::Majority,
        title: format!("I{id}"),
        presentation_url: None,
        start_page: None,
    }
    .into_agenda(id, order)
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[test]
fn test_declaration_states_outcome() {
    let passed = generate_declaration("Approve budget", VoteCounts::new(6, 3, 1), 10, ItemKind::Majority, true);
    assert!(passed.contains("Approve budget"));
    assert!(passed.contains("가결"));
    assert!(passed.contains("과반수"));

    let failed = generate_declaration("Amend bylaws", VoteCounts::new(6, 4, 0), 10, ItemKind::TwoThirds, false);
    assert!(failed.contains("부결"));
    assert!(failed.contains("2/3"));
}

#[test]
fn test_draft_stops_following_votes_in_manual_mode() {
    let mut draft = DeclarationDraft::default();
    assert!(draft.on_votes_changed("T", VoteCounts::new(6, 4, 0), 10, ItemKind::Majority, true, false));
    let generated = draft.text().to_string();

    draft.set_text("Chair's own wording");
    assert!(draft.is_manual());
    assert!(!draft.on_votes_changed("T", VoteCounts::new(2, 8, 0), 10, ItemKind::Majority, false, false));
    assert_eq!(draft.text(), "Chair's own wording");

    draft.end_manual_edit();
    assert!(draft.on_votes_changed("T", VoteCounts::new(6, 4, 0), 10, ItemKind::Majority, true, false));
    assert_eq!(draft.text(), generated);

    assert!(!draft.on_votes_changed("T", VoteCounts::new(1, 9, 0), 10, ItemKind::Majority, false, true));
}
