//! Integration tests for the WebSocket connector.
//!
//! These tests spin up a real WebSocket server on a random local port and
//! dial it with [`WebSocketConnector`], so frames actually cross the
//! network stack.

#[cfg(feature = "websocket")]
mod websocket {
    use desmoche_transport::{
        Connection, Connector, TransportError, WebSocketConnector,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port and returns it with its `ws://` URL.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have addr");
        (listener, format!("ws://{addr}/game/42/Alice"))
    }

    async fn accept(listener: TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_connect_send_and_receive() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(accept(listener));

        let conn = WebSocketConnector
            .connect(&url)
            .await
            .expect("client should connect");
        let mut server_ws = server.await.expect("task should complete");
        assert!(conn.id().into_inner() > 0);

        // --- Client sends, server receives a text frame ---
        conn.send(br#"{"event":"toggle_ready"}"#)
            .await
            .expect("send should succeed");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON commands go out as text frames");
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"toggle_ready"}"#);

        // --- Server sends, client receives ---
        server_ws
            .send(Message::Text(r#"{"event":"player_joined"}"#.into()))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"event":"player_joined"}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_server_closes() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(accept(listener));

        let conn = WebSocketConnector.connect(&url).await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_rejects_non_websocket_scheme() {
        let result = WebSocketConnector.connect("http://127.0.0.1:1/game").await;
        assert!(matches!(result, Err(TransportError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_rejects_unparsable_endpoint() {
        let result = WebSocketConnector.connect("ws://").await;
        assert!(matches!(result, Err(TransportError::InvalidEndpoint(_))));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port nobody is listening on.
        let (listener, url) = listen().await;
        drop(listener);

        let result = WebSocketConnector.connect(&url).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}
