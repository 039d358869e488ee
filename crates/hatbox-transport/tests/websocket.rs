//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a real `tokio-tungstenite` client so
//! frames actually cross a socket. Every test binds to `127.0.0.1:0` and
//! reads the assigned port back through `local_addr`, so suites can run in
//! parallel without port clashes.

#[cfg(feature = "websocket")]
mod websocket {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    use hatbox_transport::{Connection, Transport, WebSocketTransport};

    type ClientWs =
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >;

    /// Helper: connects a tokio-tungstenite client to the given address.
    async fn connect_client(addr: SocketAddr) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_text_frames_round_trip() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr();

        let client = tokio::spawn(async move {
            let mut ws = connect_client(addr).await;
            ws.send(Message::text("hello")).await.unwrap();
            let reply = ws.next().await.unwrap().unwrap();
            assert_eq!(reply.into_text().unwrap().as_str(), "echo");
            ws.close(None).await.unwrap();
        });

        let conn = transport.accept().await.expect("should accept");
        assert!(conn.id().into_inner() > 0);

        let got = conn.recv().await.unwrap().expect("should have data");
        assert_eq!(got, b"hello");
        conn.send(b"echo").await.expect("send should succeed");

        // Clean close from the peer surfaces as None.
        assert!(conn.recv().await.unwrap().is_none());
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_binary_frames_are_accepted_inbound() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr();

        let client = tokio::spawn(async move {
            let mut ws = connect_client(addr).await;
            ws.send(Message::Binary(b"raw".to_vec().into())).await.unwrap();
        });

        let conn = transport.accept().await.expect("should accept");
        let got = conn.recv().await.unwrap().expect("should have data");
        assert_eq!(got, b"raw");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_while_recv_is_parked() {
        // A clone blocked in recv must not hold up a send on the same
        // connection — the writer task and the reader loop share one
        // connection in the server, so the halves have to be independent.
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr();

        let client = tokio::spawn(async move {
            let mut ws = connect_client(addr).await;
            let pushed = ws.next().await.unwrap().unwrap();
            assert_eq!(pushed.into_text().unwrap().as_str(), "pushed");
            ws.send(Message::text("reply")).await.unwrap();
        });

        let conn = transport.accept().await.expect("should accept");
        let reader = conn.clone();
        let pending = tokio::spawn(async move { reader.recv().await.unwrap() });

        // Give the reader task time to park on the socket.
        tokio::time::sleep(Duration::from_millis(10)).await;
        conn.send(b"pushed").await.expect("send must not block");

        let got = pending.await.unwrap().expect("should have data");
        assert_eq!(got, b"reply");
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr();

        let clients = tokio::spawn(async move {
            let _a = connect_client(addr).await;
            let _b = connect_client(addr).await;
            // Keep both sockets open until the server has accepted them.
            tokio::time::sleep(Duration::from_millis(50)).await;
        });

        let a = transport.accept().await.expect("should accept");
        let b = transport.accept().await.expect("should accept");
        assert_ne!(a.id(), b.id());
        clients.await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr();

        let client = tokio::spawn(async move {
            let mut ws = connect_client(addr).await;
            ws.send(Message::Close(None)).await.unwrap();
        });

        let conn = transport.accept().await.expect("should accept");
        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
        client.await.unwrap();
    }
}
