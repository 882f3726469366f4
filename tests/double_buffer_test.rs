use std::time::{Duration, Instant};

use agm::presentation::{DoubleBuffer, LoadPage, Slot};

fn load(slot: Slot, page: u32) -> Option<LoadPage> {
    Some(LoadPage { slot, page })
}

#[test]
fn test_first_page_loads_into_hidden_slot() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    assert_eq!(buf.request(3, now), load(Slot::B, 3));
    assert!(buf.is_processing());
    assert_eq!(buf.visible_page(), None);

    assert_eq!(buf.on_rendered(Slot::B, 3, now), None);
    assert_eq!(buf.active_slot(), Slot::B);
    assert_eq!(buf.visible_page(), Some(3));
    assert!(!buf.is_processing());
}

#[test]
fn test_rapid_requests_settle_on_latest() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    assert_eq!(buf.request(3, now), load(Slot::B, 3));
    // Queued behind the in-flight render.
    assert_eq!(buf.request(5, now), None);
    assert_eq!(buf.request(3, now), None);

    assert_eq!(buf.on_rendered(Slot::B, 3, now), None);
    assert_eq!(buf.visible_page(), Some(3));
    assert_eq!(buf.target(), Some(3));
}

#[test]
fn test_return_to_visible_page_while_next_is_loading() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    assert_eq!(buf.request(3, now), load(Slot::B, 3));
    assert_eq!(buf.on_rendered(Slot::B, 3, now), None);

    // Page 5 goes into the hidden slot, then the operator steps back to 3.
    assert_eq!(buf.request(5, now), load(Slot::A, 5));
    assert_eq!(buf.request(3, now), None);
    assert_eq!(buf.visible_page(), Some(3));

    // The late render of 5 must not take over the screen.
    assert_eq!(buf.on_rendered(Slot::A, 5, now), None);
    assert_eq!(buf.active_slot(), Slot::B);
    assert_eq!(buf.visible_page(), Some(3));
    assert_eq!(buf.target(), Some(3));
    assert!(!buf.is_processing());
}

#[test]
fn test_stale_render_is_not_shown() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    buf.request(3, now);
    buf.request(5, now);

    // Page 3 finishes after the operator already moved on.
    assert_eq!(buf.on_rendered(Slot::B, 3, now), load(Slot::B, 5));
    assert_eq!(buf.visible_page(), None);

    assert_eq!(buf.on_rendered(Slot::B, 5, now), None);
    assert_eq!(buf.visible_page(), Some(5));
}

#[test]
fn test_going_back_swaps_instantly() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    buf.request(3, now);
    buf.on_rendered(Slot::B, 3, now);
    assert_eq!(buf.request(5, now), load(Slot::A, 5));
    buf.on_rendered(Slot::A, 5, now);
    assert_eq!(buf.visible_page(), Some(5));

    // Page 3 is still rendered in the hidden slot.
    assert_eq!(buf.request(3, now), None);
    assert_eq!(buf.active_slot(), Slot::B);
    assert_eq!(buf.visible_page(), Some(3));
}

#[test]
fn test_same_page_request_is_a_no_op() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    buf.request(2, now);
    buf.on_rendered(Slot::B, 2, now);
    assert_eq!(buf.request(2, now), None);
    assert!(!buf.is_processing());
}

#[test]
fn test_stuck_render_is_retried_after_timeout() {
    let start = Instant::now();
    let mut buf = DoubleBuffer::with_timeout(Duration::from_secs(2));

    assert_eq!(buf.request(4, start), load(Slot::B, 4));
    assert_eq!(buf.poll_timeout(start + Duration::from_secs(1)), None);
    assert!(buf.is_processing());

    let retry_at = start + Duration::from_secs(2);
    assert_eq!(buf.poll_timeout(retry_at), load(Slot::B, 4));
    assert!(buf.is_processing());

    assert_eq!(buf.on_rendered(Slot::B, 4, retry_at), None);
    assert_eq!(buf.visible_page(), Some(4));
}

#[test]
fn test_failed_render_is_retried() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    buf.request(6, now);
    assert_eq!(buf.on_error(Slot::B, now), load(Slot::B, 6));
    assert_eq!(buf.slot_page(Slot::B), Some(6));

    buf.on_rendered(Slot::B, 6, now);
    assert_eq!(buf.visible_page(), Some(6));
}

#[test]
fn test_error_keeps_visible_page() {
    let now = Instant::now();
    let mut buf = DoubleBuffer::new();

    buf.request(1, now);
    buf.on_rendered(Slot::B, 1, now);
    buf.request(2, now);
    buf.on_error(Slot::A, now);

    assert_eq!(buf.visible_page(), Some(1));
    assert_eq!(buf.active_slot(), Slot::B);
}
