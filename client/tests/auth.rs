mod support;

use std::time::Duration;

use rqlink_client::{AuthState, Authenticator, ClientError, Connection, ServerMessage};
use support::{BATTLE_ID, FixedAssertion, SHORT, SimServer, credentials};
use tokio::time::Instant;

#[tokio::test]
async fn test_login_success() {
    let server = SimServer::new();
    let creds = credentials();
    let mut connection = Connection::new(server.connect());
    let mut auth = Authenticator::new(&creds);
    assert_eq!(auth.state(), &AuthState::AwaitingChallenge);

    let identity = auth
        .login(&mut connection, &FixedAssertion(Some("signed-assertion")), Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(identity.username, "Ash");
    assert_eq!(identity.assertion, "signed-assertion");
    assert_eq!(auth.state(), &AuthState::Authenticated);
    assert_eq!(server.sent(), vec!["|/trn Ash,0,signed-assertion"]);
}

#[tokio::test]
async fn test_login_name_taken() {
    let server = SimServer::new();
    server.world().reject_login = true;
    let creds = credentials();
    let mut connection = Connection::new(server.connect());
    let mut auth = Authenticator::new(&creds);

    let err = auth
        .login(&mut connection, &FixedAssertion(Some("signed-assertion")), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthRejected(ref m) if m == "Your assertion was invalid."));
    assert_eq!(auth.state(), &AuthState::Failed);
}

#[tokio::test]
async fn test_login_without_challenge_times_out() {
    let server = SimServer::new();
    server.world().send_challstr = false;
    let creds = credentials();
    let mut connection = Connection::new(server.connect());
    let mut auth = Authenticator::new(&creds);

    let err = auth
        .login(&mut connection, &FixedAssertion(Some("signed-assertion")), SHORT)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthTimeout(t) if t == SHORT));
    assert!(err.is_timeout());
    assert_eq!(auth.state(), &AuthState::Failed);
    assert!(server.sent().is_empty());
}

#[tokio::test]
async fn test_rejected_assertion_sends_nothing() {
    let server = SimServer::new();
    let creds = credentials();
    let mut connection = Connection::new(server.connect());
    let mut auth = Authenticator::new(&creds);

    let err = auth
        .login(&mut connection, &FixedAssertion(None), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthRejected(_)));
    assert_eq!(auth.state(), &AuthState::Failed);
    assert!(server.sent().is_empty());
}

#[tokio::test]
async fn test_room_frames_during_login_are_kept() {
    let server = SimServer::with_battle(7);
    server.world().replay_on_login = true;
    let creds = credentials();
    let mut connection = Connection::new(server.connect());
    let mut auth = Authenticator::new(&creds);

    auth.login(&mut connection, &FixedAssertion(Some("signed-assertion")), Duration::from_secs(2))
        .await
        .unwrap();

    let frame = connection
        .next_frame(Instant::now() + SHORT)
        .await
        .unwrap()
        .expect("the replayed room frame");
    assert_eq!(frame.room_id.as_deref(), Some(BATTLE_ID));
    assert_eq!(frame.joined_battle(), Some(BATTLE_ID));
    assert!(frame.messages.contains(&ServerMessage::Title("Ash vs. Gary".into())));

    // Nothing else is pending
    assert!(connection.next_frame(Instant::now() + SHORT).await.unwrap().is_none());
}
