use ctdbrec::net::RequestMultiplexer;
use ctdbrec::wire::{ControlResponseBody, WireBody};

#[test]
fn allocated_ids_are_never_zero_or_reused_while_pending() {
    let mux = RequestMultiplexer::new();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..64 {
        let id = mux.alloc_id();
        assert_ne!(id, 0);
        assert!(seen.insert(id), "id {id} allocated twice while still pending");
        mux.register(id);
    }
}

#[tokio::test]
async fn complete_delivers_the_body_to_the_registered_receiver() {
    let mux = RequestMultiplexer::new();
    let id = mux.alloc_id();
    let rx = mux.register(id);

    mux.complete(id, WireBody::ControlResponse(ControlResponseBody::Ack));

    let body = rx.await.expect("sender was not dropped");
    assert!(matches!(body, WireBody::ControlResponse(ControlResponseBody::Ack)));
}

#[tokio::test]
async fn a_reply_for_an_unknown_id_is_discarded_without_panicking() {
    let mux = RequestMultiplexer::new();
    // No corresponding register() call; this must not panic.
    mux.complete(999, WireBody::ControlResponse(ControlResponseBody::Ack));
}

#[tokio::test]
async fn cancelling_a_request_drains_its_late_reply_silently() {
    let mux = RequestMultiplexer::new();
    let id = mux.alloc_id();
    let rx = mux.register(id);

    mux.cancel(id);
    mux.complete(id, WireBody::ControlResponse(ControlResponseBody::Ack));

    // The receiver observes the sender dropped, not a delivered body.
    assert!(rx.await.is_err());
}

#[test]
fn at_most_one_lock_may_be_held_at_a_time() {
    let mux = RequestMultiplexer::new();
    assert!(mux.try_acquire_lock());
    assert!(!mux.try_acquire_lock());
    mux.release_lock();
    assert!(mux.try_acquire_lock());
}

#[test]
fn marking_broken_clears_pending_requests() {
    let mux = RequestMultiplexer::new();
    let id = mux.alloc_id();
    let mut rx = mux.register(id);
    mux.mark_broken();
    assert!(mux.is_broken());
    assert!(rx.try_recv().is_err());
}
