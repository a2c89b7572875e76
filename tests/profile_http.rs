//! End-to-end tests: controller + `HttpProfileApi` against a mock backend.

use std::sync::Arc;

use labnose_profile::api::{HttpProfileApi, ProfileApi, ProfileError, ProfileUpdate, SignupPayload};
use labnose_profile::config::HttpTimeouts;
use labnose_profile::notify::{RecordingNotifier, Severity};
use labnose_profile::provision::{
    FileProvisionLedger, MemoryProvisionLedger, NavigationState, PROFILE_PAGE_PATH, ProvisionLedger, ProvisionOutcome,
};
use labnose_profile::session::{Session, SessionUser, StaticTokenProvider};
use labnose_profile::ProfileSyncController;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn alice() -> Session {
    Session::authenticated(SessionUser { name: "Alice".into(), email: "a@x.com".into() })
}

fn api_for(server: &MockServer) -> Arc<HttpProfileApi> {
    Arc::new(HttpProfileApi::new(&server.uri(), HttpTimeouts::default()).unwrap())
}

fn controller_with_ledger(
    server: &MockServer,
    ledger: Arc<dyn ProvisionLedger>,
) -> (ProfileSyncController, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = ProfileSyncController::new(
        api_for(server),
        Arc::new(StaticTokenProvider::new(Some("tok".into()))),
        notifier.clone(),
        ledger,
    );
    (controller, notifier)
}

fn controller_for(server: &MockServer) -> (ProfileSyncController, Arc<RecordingNotifier>) {
    controller_with_ledger(server, Arc::new(MemoryProvisionLedger::new()))
}

fn signup_nav(return_to: &str) -> NavigationState {
    let mut payload = SignupPayload::new();
    payload.insert("organization".into(), json!("Acme Labs"));
    payload.insert("role".into(), json!("researcher"));
    NavigationState::new(return_to, payload)
}

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn load_sends_bearer_token_and_stores_device_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deviceId": "X", "plan": "free"})))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    assert!(controller.initialize(&alice()).await);

    let form = controller.form().await;
    assert_eq!(form.device_id, "X");
    assert_eq!(form.name, "Alice");
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn load_non_success_keeps_defaults_silently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    controller.initialize(&alice()).await;

    assert_eq!(controller.form().await.device_id, "");
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn load_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let err = api.fetch_profile("tok").await.unwrap_err();
    assert!(matches!(err, ProfileError::MalformedResponse(_)));
}

#[tokio::test]
async fn loading_session_issues_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, _notifier) = controller_for(&server);
    let session = Session { is_authenticated: true, is_loading: true, user: None };
    assert!(!controller.initialize(&session).await);
    assert_eq!(
        controller
            .handle_post_signup(&session, &signup_nav(PROFILE_PAGE_PATH))
            .await,
        ProvisionOutcome::Skipped(labnose_profile::provision::SkipReason::SessionNotReady)
    );
}

#[tokio::test]
async fn truncated_error_body_is_still_non_success() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        socket.read(&mut buf).await.unwrap();
        // Promises 100 bytes of body, sends 5, then hangs up.
        socket
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\nshort")
            .await
            .unwrap();
    });

    let api = HttpProfileApi::new(&format!("http://{addr}"), HttpTimeouts::default()).unwrap();
    let err = api.fetch_profile("tok").await.unwrap_err();
    assert!(matches!(err, ProfileError::NonSuccessStatus { status: 503, .. }), "got {err:?}");
    backend.await.unwrap();
}

#[tokio::test]
async fn unreachable_backend_is_network_failure() {
    let api = HttpProfileApi::new("http://127.0.0.1:1", HttpTimeouts { request_secs: 2, connect_secs: 1 }).unwrap();
    let err = api.fetch_profile("tok").await.unwrap_err();
    assert_eq!(err.error_code(), "E_NETWORK");
}

// =============================================================================
// Save
// =============================================================================

#[tokio::test]
async fn save_posts_exact_body_and_notifies_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/profile"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({"email": "a@x.com", "name": "Alice", "deviceId": "D1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    let update = ProfileUpdate { email: "a@x.com".into(), name: "Alice".into(), device_id: "D1".into() };
    controller.save_profile_with(&update).await.unwrap();

    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Profile Updated");
}

#[tokio::test]
async fn save_failure_notifies_once_and_does_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/profile"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    let err = controller.save_profile().await.unwrap_err();
    match err {
        ProfileError::NonSuccessStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }

    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Update Failed");
    assert_eq!(seen[0].severity, Severity::Destructive);
}

// =============================================================================
// Post-signup provisioning
// =============================================================================

#[tokio::test]
async fn post_signup_posts_payload_once_without_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/store-user-data"))
        .and(body_json(json!({"organization": "Acme Labs", "role": "researcher"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    let nav = signup_nav(PROFILE_PAGE_PATH);
    assert_eq!(controller.handle_post_signup(&alice(), &nav).await, ProvisionOutcome::Created);
    assert_eq!(controller.handle_post_signup(&alice(), &nav).await, ProvisionOutcome::AlreadyProvisioned);

    assert_eq!(notifier.count_titled("Account Created"), 1);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn post_signup_non_success_notifies_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/store-user-data"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    let outcome = controller
        .handle_post_signup(&alice(), &signup_nav(PROFILE_PAGE_PATH))
        .await;

    assert_eq!(outcome, ProvisionOutcome::Failed);
    let seen = notifier.notifications();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Error");
    assert_eq!(seen[0].severity, Severity::Destructive);
}

#[tokio::test]
async fn post_signup_mismatched_return_to_posts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, notifier) = controller_for(&server);
    let outcome = controller.handle_post_signup(&alice(), &signup_nav("/somewhere-else")).await;
    assert!(matches!(outcome, ProvisionOutcome::Skipped(_)));
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn post_signup_guard_survives_restart_with_file_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/store-user-data"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("provisioned.json");
    let nav = signup_nav(PROFILE_PAGE_PATH);

    let (first, _) = controller_with_ledger(&server, Arc::new(FileProvisionLedger::open(&ledger_path).unwrap()));
    assert_eq!(first.handle_post_signup(&alice(), &nav).await, ProvisionOutcome::Created);

    // Simulates a page reload replaying the same redirect state.
    let (second, notifier) =
        controller_with_ledger(&server, Arc::new(FileProvisionLedger::open(&ledger_path).unwrap()));
    assert_eq!(second.handle_post_signup(&alice(), &nav).await, ProvisionOutcome::AlreadyProvisioned);
    assert!(notifier.notifications().is_empty());
}
