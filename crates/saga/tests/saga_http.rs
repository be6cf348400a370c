//! Booking saga against a mocked resource owner over HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use common::{CORRELATION_ID_HEADER, DateRange, IdempotencyKey, RequesterId, ResourceId};
use lock_store::{LockStatus, ReservationLock};
use saga::{
    BookingSaga, BookingStatus, BookingStore, CallPolicy, CreateBooking, HttpResourceOwnerClient,
    InMemoryBookingStore,
};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn fast_policy() -> CallPolicy {
    CallPolicy::new(Duration::from_millis(500), 2, Duration::from_millis(10))
}

fn period() -> DateRange {
    let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
    DateRange::new(start, start.succ_opt().unwrap()).unwrap()
}

fn booking(requester: i64, resource: i64, key: &str) -> CreateBooking {
    CreateBooking::new(
        RequesterId::new(requester),
        ResourceId::new(resource),
        period(),
        IdempotencyKey::new(key).unwrap(),
    )
}

fn lock_body(key: &str, resource: i64, status: LockStatus) -> ReservationLock {
    let mut lock = ReservationLock::held(
        IdempotencyKey::new(key).unwrap(),
        ResourceId::new(resource),
        period(),
    );
    lock.status = status;
    lock
}

fn saga_for(
    server: &MockServer,
    policy: CallPolicy,
) -> BookingSaga<InMemoryBookingStore, HttpResourceOwnerClient> {
    let client = HttpResourceOwnerClient::new(server.uri(), policy).unwrap();
    BookingSaga::new(InMemoryBookingStore::new(), client)
}

async fn requests_to(server: &MockServer, suffix: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with(suffix))
        .collect()
}

fn json_body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

async fn mount_release(server: &MockServer, resource: i64, key: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/resources/{resource}/release")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body(key, resource, LockStatus::Released)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_booking_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-1", 10, LockStatus::Held)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/confirm"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-1", 10, LockStatus::Confirmed)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let saga = saga_for(&server, fast_policy());
    let attempt = saga.create_booking(booking(1, 10, "req-1")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Confirmed);

    let hold = &requests_to(&server, "/hold").await[0];
    let body = json_body(hold);
    assert_eq!(body["requestId"], "req-1");
    assert_eq!(body["startDate"], "2026-09-01");
    assert_eq!(body["endDate"], "2026-09-02");

    let confirm = &requests_to(&server, "/confirm").await[0];
    assert_eq!(json_body(confirm)["requestId"], "req-1");
    assert!(requests_to(&server, "/release").await.is_empty());
}

#[tokio::test]
async fn test_failed_hold_releases_and_cancels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/11/hold"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_release(&server, 11, "req-2").await;

    let saga = saga_for(&server, fast_policy());
    let attempt = saga.create_booking(booking(2, 11, "req-2")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Cancelled);

    let releases = requests_to(&server, "/release").await;
    assert_eq!(releases.len(), 1);
    assert_eq!(json_body(&releases[0])["requestId"], "req-2");
    assert!(requests_to(&server, "/confirm").await.is_empty());

    let stored = saga
        .store()
        .find_by_key(&IdempotencyKey::new("req-2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_conflicting_hold_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(ResponseTemplate::new(409).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    mount_release(&server, 10, "req-3").await;

    let saga = saga_for(&server, fast_policy());
    let attempt = saga.create_booking(booking(1, 10, "req-3")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Cancelled);
    assert_eq!(requests_to(&server, "/hold").await.len(), 1);
}

#[tokio::test]
async fn test_hold_timeout_triggers_compensation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/11/hold"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(lock_body("req-2", 11, LockStatus::Held))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    mount_release(&server, 11, "req-2").await;

    let policy = CallPolicy::new(Duration::from_millis(200), 1, Duration::from_millis(10));
    let saga = saga_for(&server, policy);
    let attempt = saga.create_booking(booking(2, 11, "req-2")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Cancelled);

    // One attempt plus one retry.
    assert_eq!(requests_to(&server, "/hold").await.len(), 2);
    assert_eq!(requests_to(&server, "/release").await.len(), 1);
}

#[tokio::test]
async fn test_failed_release_does_not_block_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-4", 10, LockStatus::Held)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/confirm"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/release"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let saga = saga_for(&server, fast_policy());
    let attempt = saga.create_booking(booking(1, 10, "req-4")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Cancelled);
    assert_eq!(requests_to(&server, "/release").await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_resource_owner_cancels() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpResourceOwnerClient::new(
        format!("http://127.0.0.1:{port}"),
        CallPolicy::new(Duration::from_millis(200), 1, Duration::from_millis(10)),
    )
    .unwrap();
    let saga = BookingSaga::new(InMemoryBookingStore::new(), client);

    let attempt = saga.create_booking(booking(1, 10, "req-5")).await.unwrap();
    assert_eq!(attempt.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_every_call_carries_the_correlation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-6", 10, LockStatus::Held)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/confirm"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_release(&server, 10, "req-6").await;

    let saga = saga_for(&server, fast_policy());
    let attempt = saga.create_booking(booking(1, 10, "req-6")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    for request in requests {
        let header = request
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(header, attempt.correlation_id.as_str());
    }
}

#[tokio::test]
async fn test_replayed_key_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-7", 10, LockStatus::Held)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/confirm"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-7", 10, LockStatus::Confirmed)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let saga = saga_for(&server, fast_policy());
    let first = saga.create_booking(booking(1, 10, "req-7")).await.unwrap();
    let second = saga.create_booking(booking(1, 10, "req-7")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, BookingStatus::Confirmed);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_during_slow_hold_waits_for_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resources/10/hold"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(lock_body("req-1", 10, LockStatus::Held))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resources/10/confirm"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(lock_body("req-1", 10, LockStatus::Confirmed)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let saga = Arc::new(saga_for(&server, fast_policy()));
    let first = {
        let saga = saga.clone();
        tokio::spawn(async move { saga.create_booking(booking(1, 10, "req-1")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let duplicate = saga.create_booking(booking(1, 10, "req-1")).await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert_eq!(duplicate.id, first.id);
    assert_eq!(first.status, BookingStatus::Confirmed);
    assert_eq!(duplicate.status, BookingStatus::Confirmed);
}
