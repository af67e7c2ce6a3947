use std::time::Duration;

use integration_tests::{INITIALIZE_REQUEST, TestServer, test_config};

#[tokio::test]
async fn endpoint_event_hands_out_the_session() {
    let server = TestServer::start(test_config()).await;

    let session = server.open_sse().await;

    assert_eq!(session.messages_path, "/mcp-messages");
    assert!(uuid::Uuid::parse_str(&session.session_id).is_ok());
}

#[tokio::test]
async fn configured_paths_are_honored() {
    let mut config = test_config();
    config.mcp.sse_path = "/events".to_string();
    config.mcp.messages_path = "/submit".to_string();

    let server = TestServer::start(config).await;

    let session = server.open_sse().await;
    assert_eq!(session.messages_path, "/submit");

    let response = server.client.post_message(&session.post_target(), INITIALIZE_REQUEST).await;
    assert_eq!(response.status(), 202);
}

#[tokio::test]
async fn initialize_round_trip_over_the_stream() {
    let server = TestServer::start(test_config()).await;
    let mut session = server.open_sse().await;

    let response = server.client.post_message(&session.post_target(), INITIALIZE_REQUEST).await;
    assert_eq!(response.status(), 202);

    let message = session.next_message().await.expect("no initialize response arrived");

    let name = message.pointer("/result/serverInfo/name").and_then(|name| name.as_str());
    assert_eq!(name, Some("relay"));
}

#[tokio::test]
async fn full_protocol_handshake() {
    let server = TestServer::start(test_config()).await;

    let client = server.mcp_client().await;
    let info = client.server_info();

    insta::assert_snapshot!(info.server_info.name, @"relay");

    let instructions = info.instructions.unwrap_or_default();
    assert!(instructions.contains("SSE transport"));

    client.disconnect().await;
}

#[tokio::test]
async fn server_info_reflects_upstream_scoping() {
    let mut config = test_config();
    config.upstream.project_ref = Some("prj_777".to_string());
    config.upstream.read_only = true;

    let server = TestServer::start(config).await;

    let client = server.mcp_client().await;
    let instructions = client.server_info().instructions.unwrap_or_default();

    assert!(instructions.contains("prj_777"));
    assert!(instructions.contains("read-only"));

    client.disconnect().await;
}

#[tokio::test]
async fn sessions_are_independent() {
    let server = TestServer::start(test_config()).await;

    let mut first = server.open_sse().await;
    let mut second = server.open_sse().await;

    assert_ne!(first.session_id, second.session_id);

    assert_eq!(
        server.client.post_message(&first.post_target(), INITIALIZE_REQUEST).await.status(),
        202
    );
    assert_eq!(
        server.client.post_message(&second.post_target(), INITIALIZE_REQUEST).await.status(),
        202
    );

    assert!(first.next_message().await.is_some());
    assert!(second.next_message().await.is_some());
}

#[tokio::test]
async fn disconnecting_invalidates_the_session() {
    let server = TestServer::start(test_config()).await;

    let session = server.open_sse().await;
    let target = session.post_target();

    assert_eq!(server.client.post_message(&target, INITIALIZE_REQUEST).await.status(), 202);

    drop(session);

    // Deregistration happens when the server notices the stream is gone.
    let mut status = 0;

    for _ in 0..50 {
        status = server.client.post_message(&target, INITIALIZE_REQUEST).await.status().as_u16();

        if status == 404 {
            break;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(status, 404);
}

#[tokio::test]
async fn a_disconnected_peer_does_not_affect_other_sessions() {
    let server = TestServer::start(test_config()).await;

    let mut surviving = server.open_sse().await;
    let doomed = server.open_sse().await;

    drop(doomed);

    assert_eq!(
        server
            .client
            .post_message(&surviving.post_target(), INITIALIZE_REQUEST)
            .await
            .status(),
        202
    );

    assert!(surviving.next_message().await.is_some());
}
