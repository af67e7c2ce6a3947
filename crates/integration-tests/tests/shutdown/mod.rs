use integration_tests::{INITIALIZE_REQUEST, TestServer, test_config};

#[tokio::test]
async fn shutdown_completes_with_no_sessions() {
    let server = TestServer::start(test_config()).await;

    server.stop().await;
}

#[tokio::test]
async fn graceful_shutdown_ends_open_sessions() {
    let server = TestServer::start(test_config()).await;

    let session = server.open_sse().await;

    assert_eq!(server.client.post_message(&session.post_target(), INITIALIZE_REQUEST).await.status(), 202);

    server.stop().await;

    session.expect_end().await;
}

#[tokio::test]
async fn graceful_shutdown_drains_every_session() {
    let server = TestServer::start(test_config()).await;

    let sessions = [
        server.open_sse().await,
        server.open_sse().await,
        server.open_sse().await,
    ];

    server.stop().await;

    for session in sessions {
        session.expect_end().await;
    }
}

#[tokio::test]
async fn connections_are_refused_after_shutdown() {
    let server = TestServer::start(test_config()).await;
    let client = server.client.clone();

    server.stop().await;

    assert!(client.try_get("/sse").await.is_err());
}
