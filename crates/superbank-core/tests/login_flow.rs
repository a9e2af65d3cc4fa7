use std::sync::Arc;

use serde_json::json;
use superbank_core::api::ApiClient;
use superbank_core::auth::{LoginError, LoginFlow, LoginStep, Session, TokenRead, TokenStore};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "jwt-1", "token_type": "bearer"})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mfa/generate"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"demo_code": "4821"})))
        .mount(server)
        .await;
}

fn new_flow(server: &MockServer) -> (LoginFlow, Arc<Session>) {
    let session = Arc::new(Session::new(TokenStore::in_memory()));
    let client = ApiClient::new(&server.uri(), Arc::clone(&session)).expect("client");
    (LoginFlow::new(client), session)
}

#[tokio::test]
async fn test_login_with_mfa_persists_credential() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/mfa/verify"))
        .and(header("authorization", "Bearer jwt-1"))
        .and(body_json(json!({"code": "4821"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verified": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (mut flow, session) = new_flow(&server);
    let demo = flow
        .submit_credentials("87071234567", "secret")
        .await
        .expect("credentials accepted");
    assert_eq!(demo.as_deref(), Some("4821"));
    assert_eq!(
        flow.step(),
        &LoginStep::AwaitingCode {
            demo_code: Some("4821".into())
        }
    );

    // Nothing is stored until the code is verified
    assert!(!session.is_authenticated());
    assert_eq!(session.store().get().await, TokenRead::Missing);

    flow.submit_code("4821").await.expect("code accepted");
    assert_eq!(flow.step(), &LoginStep::Complete);
    assert_eq!(flow.phone(), Some("87071234567"));
    assert!(session.is_authenticated());
    assert_eq!(session.store().get().await.token(), Some("jwt-1"));
}

#[tokio::test]
async fn test_wrong_code_keeps_waiting() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/mfa/verify"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Invalid code"})))
        .mount(&server)
        .await;

    let (mut flow, session) = new_flow(&server);
    flow.submit_credentials("87071234567", "secret")
        .await
        .expect("credentials accepted");

    let err = flow.submit_code("0000").await.expect_err("wrong code");
    match err {
        LoginError::Api(api) => assert_eq!(api.user_message("Wrong code"), "Invalid code"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(flow.step(), LoginStep::AwaitingCode { .. }));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_rejected_token_during_mfa_restarts_login() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/mfa/verify"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (mut flow, session) = new_flow(&server);
    flow.submit_credentials("87071234567", "secret")
        .await
        .expect("credentials accepted");

    let err = flow.submit_code("4821").await.expect_err("token rejected");
    assert!(matches!(err, LoginError::TokenMissing));
    assert_eq!(flow.step(), &LoginStep::Credentials);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_input_checks_happen_before_any_request() {
    let server = MockServer::start().await;
    let (mut flow, _session) = new_flow(&server);

    assert!(matches!(
        flow.submit_credentials("870", "secret").await,
        Err(LoginError::PhoneTooShort)
    ));
    assert!(matches!(
        flow.submit_code("4821").await,
        Err(LoginError::NotAwaitingCode)
    ));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_short_code_rejected_locally() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let (mut flow, _session) = new_flow(&server);
    flow.submit_credentials("87071234567", "secret")
        .await
        .expect("credentials accepted");
    assert!(matches!(
        flow.submit_code("12").await,
        Err(LoginError::CodeTooShort)
    ));
}

#[tokio::test]
async fn test_bad_password_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Incorrect phone or password"})),
        )
        .mount(&server)
        .await;

    let (mut flow, _session) = new_flow(&server);
    let err = flow
        .submit_credentials("87071234567", "wrong")
        .await
        .expect_err("bad password");
    match err {
        LoginError::Api(api) => {
            assert_eq!(api.user_message("Login failed"), "Incorrect phone or password")
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(flow.step(), &LoginStep::Credentials);
}

#[tokio::test]
async fn test_refused_password_keeps_existing_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect phone or password"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (mut flow, session) = new_flow(&server);
    session.establish("existing").await;

    let err = flow
        .submit_credentials("87071234567", "wrong")
        .await
        .expect_err("password refused");
    match err {
        LoginError::Api(api) => {
            assert!(api.is_unauthorized());
            assert_eq!(api.user_message("Login failed"), "Incorrect phone or password");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(flow.step(), &LoginStep::Credentials);
    assert!(session.is_authenticated());
    assert_eq!(session.store().get().await.token(), Some("existing"));
}
