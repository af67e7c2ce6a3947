use config::Config;
use integration_tests::{INITIALIZE_REQUEST, TestServer, test_config};

#[tokio::test]
async fn missing_session_id_is_a_client_error() {
    let server = TestServer::start(test_config()).await;

    let response = server.client.post_message("/mcp-messages", INITIALIZE_REQUEST).await;
    assert_eq!(response.status(), 400);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @"the sessionId query parameter is required");
}

#[tokio::test]
async fn unknown_session_id_is_not_found() {
    let server = TestServer::start(test_config()).await;

    let response = server
        .client
        .post_message("/mcp-messages?sessionId=b4b0c3f0-0000-4000-8000-000000000000", INITIALIZE_REQUEST)
        .await;

    assert_eq!(response.status(), 404);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @"Session not found or already closed");
}

#[tokio::test]
async fn lookup_happens_before_the_body_is_parsed() {
    let server = TestServer::start(test_config()).await;

    // An unknown session wins over a malformed body.
    let response = server
        .client
        .post_message("/mcp-messages?sessionId=unknown", "this is not json")
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let server = TestServer::start(test_config()).await;
    let session = server.open_sse().await;

    let response = server.client.post_message(&session.post_target(), "{").await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unconfigured_server_degrades_to_service_unavailable() {
    // No access token: the protocol server never initializes.
    let server = TestServer::start(Config::default()).await;

    let stream_response = server.client.get("/sse").await;
    assert_eq!(stream_response.status(), 503);

    let message_response = server
        .client
        .post_message("/mcp-messages?sessionId=anything", INITIALIZE_REQUEST)
        .await;

    assert_eq!(message_response.status(), 503);
}
