//! End-to-end relay tests against a scripted ICY upstream.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{client, eventually, refused_addr, start_relay, start_upstream, BodyPlan, UpstreamPlan};
use radio_relay::config::RelayConfig;

#[tokio::test]
async fn relays_allowlisted_headers_and_body() {
    let upstream = start_upstream(UpstreamPlan {
        probe_headers: vec![
            ("icy-br", "128"),
            ("icy-name", "Jazz FM"),
            ("Content-Type", "audio/aacp"),
            ("Server", "Icecast 2.4"),
        ],
        stream_headers: vec![("Content-Type", "audio/mpeg"), ("icy-genre", "Jazz")],
        body: BodyPlan::Fixed(b"ID3\x03\x00frames".to_vec()),
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/live"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let headers = resp.headers().clone();
    assert_eq!(headers["icy-br"], "128");
    assert_eq!(headers["icy-name"], "Jazz FM");
    // Content type comes from the stream response, not the probe.
    assert_eq!(headers["content-type"], "audio/mpeg");
    // Only probe headers are forwarded, and only allowlisted ones.
    assert!(headers.get("icy-genre").is_none());
    assert!(headers.get("server").is_none());
    assert!(headers.get("icy-metaint").is_none());

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"ID3\x03\x00frames");

    assert_eq!(upstream.stats.heads.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.stats.gets.load(Ordering::SeqCst), 1);
    let icy = upstream.stats.icy_metadata.lock().unwrap().clone();
    assert_eq!(icy, vec![Some("1".to_string()), Some("1".to_string())]);

    assert!(eventually(Duration::from_secs(2), || relay.sessions.active_count() == 0).await);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn streams_without_any_icy_headers() {
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let upstream = start_upstream(UpstreamPlan {
        body: BodyPlan::Fixed(payload.clone()),
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/stream"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.headers().keys().all(|k| !k.as_str().starts_with("icy-")));
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), payload.len());
    assert_eq!(&body[..], &payload[..]);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client().get(relay.endpoint("/proxy/radio")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "required 'url' parameter not found");
    assert_eq!(relay.sessions.active_count(), 0);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn invalid_url_is_bad_request_without_upstream_contact() {
    let upstream = start_upstream(UpstreamPlan::default()).await;
    let relay = start_relay(RelayConfig::default()).await;

    for bad in ["not a url", "ftp://127.0.0.1/live", ""] {
        let resp = client()
            .get(relay.endpoint("/proxy/radio"))
            .query(&[("url", bad)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "url {:?}", bad);
    }
    assert_eq!(upstream.stats.connections.load(Ordering::SeqCst), 0);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_is_server_error() {
    let relay = start_relay(RelayConfig::default()).await;
    let url = format!("http://{}/live", refused_addr());

    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", url)])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert!(resp.text().await.unwrap().contains("error fetching stream"));
    assert_eq!(relay.sessions.active_count(), 0);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn failed_probe_never_opens_the_stream() {
    let upstream = start_upstream(UpstreamPlan {
        probe_status: 404,
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/gone"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert_eq!(upstream.stats.heads.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.stats.gets.load(Ordering::SeqCst), 0);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn failed_stream_get_after_head_is_server_error() {
    let upstream = start_upstream(UpstreamPlan {
        probe_headers: vec![("icy-br", "128"), ("icy-name", "Jazz FM")],
        stream_status: 503,
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/live"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert!(resp.headers().get("icy-br").is_none());
    assert!(resp.headers().get("icy-name").is_none());
    assert!(resp.text().await.unwrap().contains("503"));
    assert_eq!(upstream.stats.heads.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.stats.gets.load(Ordering::SeqCst), 1);
    assert!(eventually(Duration::from_secs(2), || relay.sessions.active_count() == 0).await);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn silent_stream_head_is_server_error() {
    let upstream = start_upstream(UpstreamPlan {
        probe_headers: vec![("icy-br", "128")],
        stall_stream_head: true,
        ..Default::default()
    })
    .await;
    let mut config = RelayConfig::default();
    // Shorter than the upstream deadline: must not apply to the proxy routes.
    config.timeouts.request_secs = 1;
    config.upstream.open_timeout_secs = 2;
    let relay = start_relay(config).await;

    let started = std::time::Instant::now();
    let resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/live"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert!(resp.headers().get("icy-br").is_none());
    let body = resp.text().await.unwrap();
    assert!(body.contains("error fetching stream"), "body: {}", body);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(eventually(Duration::from_secs(2), || relay.sessions.active_count() == 0).await);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn caller_disconnect_closes_upstream() {
    let upstream = start_upstream(UpstreamPlan {
        body: BodyPlan::Endless {
            chunk: 4096,
            interval: Duration::from_millis(10),
        },
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let mut resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/endless"))])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mut received = 0;
    for _ in 0..3 {
        let chunk = resp.chunk().await.unwrap().unwrap();
        assert!(chunk.len() <= 8 * 1024);
        received += chunk.len();
    }
    assert!(received > 0);
    assert_eq!(relay.sessions.active_count(), 1);

    drop(resp);

    let stats = upstream.stats.clone();
    assert!(
        eventually(Duration::from_secs(5), || stats.stream_closed.load(Ordering::SeqCst)).await,
        "upstream connection still open after caller left"
    );
    assert!(eventually(Duration::from_secs(5), || relay.sessions.active_count() == 0).await);
    relay.shutdown.trigger();
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let upstream = start_upstream(UpstreamPlan {
        body: BodyPlan::Endless {
            chunk: 1024,
            interval: Duration::from_millis(10),
        },
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;
    let client = client();

    let mut first = client
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/a"))])
        .send()
        .await
        .unwrap();
    let mut second = client
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/b"))])
        .send()
        .await
        .unwrap();
    assert!(first.chunk().await.unwrap().is_some());
    assert!(second.chunk().await.unwrap().is_some());
    assert_eq!(relay.sessions.active_count(), 2);

    drop(first);
    assert!(eventually(Duration::from_secs(5), || relay.sessions.active_count() == 1).await);

    // The remaining session keeps streaming.
    assert!(second.chunk().await.unwrap().is_some());
    relay.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_ends_running_streams() {
    let upstream = start_upstream(UpstreamPlan {
        body: BodyPlan::Endless {
            chunk: 2048,
            interval: Duration::from_millis(20),
        },
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let mut resp = client()
        .get(relay.endpoint("/proxy/radio"))
        .query(&[("url", upstream.url("/live"))])
        .send()
        .await
        .unwrap();
    assert!(resp.chunk().await.unwrap().is_some());

    relay.shutdown.trigger();

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Ok(Some(_)) = resp.chunk().await {}
    })
    .await;
    assert!(drained.is_ok(), "stream kept running after shutdown");

    let joined = tokio::time::timeout(Duration::from_secs(5), relay.handle).await;
    assert!(joined.is_ok(), "server did not stop");
    assert!(eventually(Duration::from_secs(2), || relay.sessions.active_count() == 0).await);
}

#[tokio::test]
async fn icon_proxy_streams_image() {
    let upstream = start_upstream(UpstreamPlan {
        stream_headers: vec![("Content-Type", "image/png")],
        body: BodyPlan::Fixed(b"\x89PNG\r\n\x1a\nicon".to_vec()),
        ..Default::default()
    })
    .await;
    let relay = start_relay(RelayConfig::default()).await;

    let resp = client()
        .get(relay.endpoint("/proxy/icon"))
        .query(&[("url", upstream.url("/favicon.png"))])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"\x89PNG\r\n\x1a\nicon");
    assert_eq!(upstream.stats.heads.load(Ordering::SeqCst), 0);
    relay.shutdown.trigger();
}
