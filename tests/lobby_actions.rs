use crate::fakes::FakeBackend;
use ethers::{
    signers::Signer,
    utils::to_checksum,
};
use lobby_session::{
    Error,
    identity::MemoryProfileStorage,
    lobby::{
        JOIN_LOBBY_PATH,
        JoinLobbyRequest,
        NEW_LOBBY_PATH,
    },
    session::{
        Reported,
        Session,
    },
    transport::JsonTransport,
};
use serde_json::json;

fn session_for(backend: &FakeBackend) -> Session<MemoryProfileStorage> {
    Session::new(backend.origin(), MemoryProfileStorage::new()).unwrap()
}

#[tokio::test]
async fn post_json__success_returns_parsed_body() {
    // given
    let backend = FakeBackend::start(&[("/echo", 200, r#"{"a":1}"#)]);
    let transport = JsonTransport::new(backend.origin()).unwrap();

    // when
    let resp = transport.post_json("/echo", &json!({ "q": true })).await.unwrap();

    // then
    assert_eq!(resp, json!({ "a": 1 }));
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(requests[0].body, r#"{"q":true}"#);
}

#[tokio::test]
async fn post_json__error_status_fails_with_body_text() {
    // given
    let backend = FakeBackend::start(&[("/broken", 400, "bad request")]);
    let transport = JsonTransport::new(backend.origin()).unwrap();

    // when
    let err = transport.post_json("/broken", &json!({})).await.unwrap_err();

    // then
    assert_eq!(err.to_string(), "bad request");
    assert!(matches!(err, Error::Http { status: 400, .. }));
}

#[tokio::test]
async fn post_json__success_with_non_json_body_is_a_decode_error() {
    // given
    let backend = FakeBackend::start(&[("/text", 200, "definitely not json")]);
    let transport = JsonTransport::new(backend.origin()).unwrap();

    // when
    let err = transport.post_json("/text", &json!({})).await.unwrap_err();

    // then
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn new_lobby__posts_data_once_and_returns_response_verbatim() {
    // given
    let backend = FakeBackend::start(&[(NEW_LOBBY_PATH, 200, r#"{"lobbyId":"L-1"}"#)]);
    let session = session_for(&backend);

    // when
    let resp = session.lobby().new_lobby(&json!({ "foo": 1 })).await.unwrap();

    // then
    assert_eq!(resp, json!({ "lobbyId": "L-1" }));
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, NEW_LOBBY_PATH);
    assert_eq!(requests[0].body, r#"{"foo":1}"#);
    assert_eq!(session.status().current(), "Lobby created.");
}

#[tokio::test]
async fn new_lobby__backend_rejection_is_reported_on_status_line() {
    // given
    let backend = FakeBackend::start(&[(NEW_LOBBY_PATH, 400, "bad request")]);
    let session = session_for(&backend);

    // when
    let resp = session
        .lobby()
        .new_lobby(&json!({}))
        .await
        .or_report(session.status());

    // then
    assert_eq!(resp, None);
    assert_eq!(session.status().current(), "Error: bad request");
}

#[tokio::test]
async fn join_lobby__sends_lobby_id_and_player_address() {
    // given
    let backend = FakeBackend::start(&[(JOIN_LOBBY_PATH, 200, r#"{"joined":true}"#)]);
    let session = session_for(&backend);
    let address = session.identity().signer().unwrap().address();
    let req = JoinLobbyRequest {
        lobby_id: String::from("L-9"),
        player_address: to_checksum(&address, None),
    };

    // when
    let resp = session.lobby().join_lobby(&req).await.unwrap();

    // then
    assert_eq!(resp, json!({ "joined": true }));
    let sent: serde_json::Value = serde_json::from_str(&backend.requests()[0].body).unwrap();
    assert_eq!(
        sent,
        json!({ "lobbyId": "L-9", "playerAddress": to_checksum(&address, None) })
    );
    assert_eq!(session.status().current(), "Game joined.");
}

#[tokio::test]
async fn lobby_roster__reads_players_of_lobby() {
    // given
    let backend = FakeBackend::start(&[(
        "/data/lobby/L-3",
        200,
        r#"{"id":"L-3","players":["0x01","0x02"]}"#,
    )]);
    let session = session_for(&backend);

    // when
    let roster = session.lobby().lobby_roster("L-3").await.unwrap();

    // then
    assert_eq!(roster.id, "L-3");
    assert_eq!(roster.players, vec!["0x01", "0x02"]);
    assert_eq!(backend.requests()[0].method, "GET");
}

#[tokio::test]
async fn lobby_roster__query_and_fragment_characters_stay_in_the_id() {
    // given
    let backend = FakeBackend::start(&[(
        "/data/lobby/a%3Fb=1%23c",
        200,
        r#"{"id":"a?b=1#c","players":[]}"#,
    )]);
    let session = session_for(&backend);

    // when
    let roster = session.lobby().lobby_roster("a?b=1#c").await.unwrap();

    // then
    assert_eq!(roster.id, "a?b=1#c");
    assert_eq!(backend.requests()[0].path, "/data/lobby/a%3Fb=1%23c");
}

#[tokio::test]
async fn lobby_roster__id_cannot_climb_out_of_lobby_route() {
    // given
    let backend = FakeBackend::start(&[("/actions/request-drip", 200, r#"{"ok":true}"#)]);
    let session = session_for(&backend);

    // when
    let result = session
        .lobby()
        .lobby_roster("../../actions/request-drip")
        .await;

    // then
    assert!(matches!(result, Err(Error::Http { status: 404, .. })));
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].path.starts_with("/data/lobby/"));
}

#[tokio::test]
async fn lobby_roster__dot_segment_id_is_rejected_before_sending() {
    // given
    let backend = FakeBackend::start(&[]);
    let session = session_for(&backend);

    // when
    let result = session.lobby().lobby_roster("..").await;

    // then
    assert!(matches!(result, Err(Error::InvalidPathSegment(_))));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn request_drip__sends_checksummed_address_and_reads_outcome() {
    // given
    let backend = FakeBackend::start(&[(
        "/actions/request-drip",
        200,
        r#"{"ok":true,"txHash":"0xbeef"}"#,
    )]);
    let session = session_for(&backend);
    let address = session.identity().signer().unwrap().address();

    // when
    let outcome = session.request_drip(address).await.unwrap();

    // then
    assert!(outcome.ok);
    assert_eq!(outcome.tx_hash.as_deref(), Some("0xbeef"));
    let sent: serde_json::Value = serde_json::from_str(&backend.requests()[0].body).unwrap();
    assert_eq!(sent, json!({ "address": to_checksum(&address, None) }));
}

#[tokio::test]
async fn request_drip__declined_faucet_is_not_an_error() {
    // given
    let backend = FakeBackend::start(&[("/actions/request-drip", 200, r#"{"ok":false}"#)]);
    let session = session_for(&backend);
    let address = session.identity().signer().unwrap().address();

    // when
    let outcome = session.request_drip(address).await.unwrap();

    // then
    assert!(!outcome.ok);
    assert_eq!(outcome.tx_hash, None);
}
