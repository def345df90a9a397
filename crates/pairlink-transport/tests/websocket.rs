//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use pairlink_transport::{
        Connection, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_text_and_recv() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        // --- Server sends text, client receives a text frame ---
        conn.send_text(r#"{"requestId":1}"#.to_string())
            .await
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"requestId":1}"#);

        // --- Client sends text, server receives payload bytes ---
        client
            .send(Message::Text(r#"{"id":1}"#.into()))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"id":1}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_are_accepted() {
        let (conn, mut client) = connected_pair().await;

        client
            .send(Message::Binary(b"raw".to_vec().into()))
            .await
            .unwrap();
        let received = conn.recv().await.unwrap().unwrap();

        assert_eq!(received, b"raw");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        // One task parked in recv() must not stop another from sending.
        let (conn, mut client) = connected_pair().await;
        let conn = Arc::new(conn);

        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(
            Duration::from_secs(2),
            conn.send_text("while reading".to_string()),
        )
        .await
        .expect("send must not wait for the reader")
        .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "while reading");

        client.send(Message::Text("done".into())).await.unwrap();
        let got = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(got, b"done");
    }

    #[tokio::test]
    async fn test_websocket_recv_skips_ping_frames() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
        client.send(Message::Text("after ping".into())).await.unwrap();

        let got = conn.recv().await.unwrap().unwrap();
        assert_eq!(got, b"after ping");
    }
}
