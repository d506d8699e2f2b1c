fn main() {
    println!("Run `cargo test -p liveness-e2e` to exercise the client against live feeds.");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    use pulse_client::{ClientConfig, LivenessClient, LivenessState};
    use pulse_feed::{FeedConfig, StatusFeed};
    use pulse_protocol::StatusMessage;

    const WAIT: Duration = Duration::from_secs(10);

    /// A client with a short reconnect delay so tests stay fast. The 2000 ms
    /// production default is asserted in the client's unit tests.
    fn quick_client() -> LivenessClient {
        LivenessClient::new(ClientConfig {
            reconnect_delay: Duration::from_millis(50),
            ..ClientConfig::default()
        })
    }

    async fn start_feed(port: u16) -> (Arc<StatusFeed>, u16, JoinHandle<()>) {
        let feed = StatusFeed::new(FeedConfig {
            port,
            push_interval: Duration::from_millis(20),
        });
        let runner = feed.clone();
        let handle = tokio::spawn(async move {
            let _ = runner.run().await;
        });

        let bound = tokio::time::timeout(WAIT, async {
            loop {
                if let Some(addr) = feed.local_addr().await {
                    return addr.port();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("feed did not bind in time");

        (feed, bound, handle)
    }

    /// Binds a one-shot WebSocket server on an OS-assigned port and hands
    /// the upgraded connection to `script`.
    async fn scripted_feed<F, Fut>(script: F) -> (u16, JoinHandle<()>)
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await
                && let Ok(ws) = tokio_tungstenite::accept_async(stream).await
            {
                script(ws).await;
            }
        });
        (port, handle)
    }

    async fn wait_state<F>(
        rx: &mut tokio::sync::watch::Receiver<LivenessState>,
        what: &str,
        pred: F,
    ) -> LivenessState
    where
        F: FnMut(&LivenessState) -> bool,
    {
        tokio::time::timeout(WAIT, rx.wait_for(pred))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .expect("client dropped the state channel")
            .clone()
    }

    #[tokio::test]
    async fn goes_online_then_reconnects_after_feed_restart() {
        let (feed, port, feed_task) = start_feed(0).await;

        let client = quick_client();
        let mut state = client.subscribe();
        client.start(&format!("http://127.0.0.1:{port}")).await.unwrap();

        let online = wait_state(&mut state, "online", |s| s.is_online).await;
        wait_state(&mut state, "timestamp", |s| s.last_timestamp.is_some()).await;
        assert!(online.is_online);

        // Kill the feed — the client must degrade to offline.
        feed.shutdown();
        let _ = feed_task.await;
        wait_state(&mut state, "offline after feed death", |s| !s.is_online).await;

        // Revive the feed on the same port — the client must come back on
        // its own, with no intervention.
        let (feed2, _, feed2_task) = start_feed(port).await;
        wait_state(&mut state, "online after feed rebirth", |s| s.is_online).await;

        client.stop().await;
        feed2.shutdown();
        let _ = feed2_task.await;
    }

    #[tokio::test]
    async fn malformed_payload_degrades_but_keeps_timestamp() {
        let (port, feed_task) = scripted_feed(|mut ws| async move {
            let ok = serde_json::to_string(&StatusMessage::online("2024-01-01T00:00:00Z", 1.0))
                .unwrap();
            ws.send(tungstenite::Message::Text(ok.into())).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            ws.send(tungstenite::Message::Text("not json".into()))
                .await
                .unwrap();
            // Keep the connection open; the malformed payload alone must
            // not close it.
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;

        let client = quick_client();
        let mut state = client.subscribe();
        client.start(&format!("http://127.0.0.1:{port}")).await.unwrap();

        wait_state(&mut state, "online with timestamp", |s| {
            s.is_online && s.last_timestamp.as_deref() == Some("2024-01-01T00:00:00Z")
        })
        .await;

        let degraded = wait_state(&mut state, "offline after garbage", |s| !s.is_online).await;
        assert_eq!(
            degraded.last_timestamp.as_deref(),
            Some("2024-01-01T00:00:00Z"),
            "parse failure must leave the timestamp untouched"
        );

        client.stop().await;
        feed_task.abort();
    }

    #[tokio::test]
    async fn non_ok_status_reports_offline() {
        let (port, feed_task) = scripted_feed(|mut ws| async move {
            ws.send(tungstenite::Message::Text(
                r#"{"status":"maintenance","datetime_utc":"2024-02-02T00:00:00Z"}"#.into(),
            ))
            .await
            .unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;

        let client = quick_client();
        let mut state = client.subscribe();
        client.start(&format!("http://127.0.0.1:{port}")).await.unwrap();

        let state = wait_state(&mut state, "offline with timestamp", |s| {
            !s.is_online && s.last_timestamp.is_some()
        })
        .await;
        assert_eq!(
            state.last_timestamp.as_deref(),
            Some("2024-02-02T00:00:00Z")
        );

        client.stop().await;
        feed_task.abort();
    }

    #[tokio::test]
    async fn stop_sends_normal_closure_with_reason() {
        let (sent_tx, sent_rx) = tokio::sync::oneshot::channel();
        let (port, feed_task) = scripted_feed(|mut ws| async move {
            let ok = serde_json::to_string(&StatusMessage::online("2024-03-03T00:00:00Z", 1.0))
                .unwrap();
            ws.send(tungstenite::Message::Text(ok.into())).await.unwrap();
            let _ = sent_tx.send(());

            // Wait for the client's close frame.
            while let Some(frame) = ws.next().await {
                if let Ok(tungstenite::Message::Close(Some(f))) = frame {
                    assert_eq!(f.code, CloseCode::Normal);
                    assert_eq!(f.reason.as_str(), "client shutdown");
                    return;
                }
            }
            panic!("connection ended without a close frame");
        })
        .await;

        let client = quick_client();
        let mut state = client.subscribe();
        client.start(&format!("http://127.0.0.1:{port}")).await.unwrap();

        wait_state(&mut state, "online", |s| s.is_online).await;
        sent_rx.await.unwrap();
        client.stop().await;

        // The scripted feed asserts on the close frame; a panic surfaces here.
        tokio::time::timeout(WAIT, feed_task)
            .await
            .expect("scripted feed did not observe the close frame")
            .unwrap();
    }

    #[tokio::test]
    async fn stop_before_open_never_reconnects() {
        // A listener that accepts TCP but never answers the WebSocket
        // handshake, so the open event cannot arrive.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = quick_client();
        let mut phases = client.watch_phase();
        client.start(&format!("http://127.0.0.1:{port}")).await.unwrap();
        client.stop().await;

        assert_eq!(client.phase(), pulse_client::Phase::Shutdown);
        assert!(!client.current().is_online);

        // Well past the reconnect delay: still silent.
        tokio::time::sleep(Duration::from_millis(200)).await;
        phases.mark_unchanged();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!phases.has_changed().unwrap());
        drop(listener);
    }
}
