//! At most one engine exchange is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use harbourmaster_core::server::{ProxyState, router};
use harbourmaster_core::{
    EngineMethod, Proxy, SocketEndpoint, TargetSuffix, Translator, UpstreamClient,
};
use harbourmaster_test_utils::config::TestConfigBuilder;
use harbourmaster_test_utils::engine::StubEngine;
use harbourmaster_test_utils::transport::SpyTransport;
use pretty_assertions::assert_eq;

fn endpoint() -> Arc<SocketEndpoint> {
    Arc::new(SocketEndpoint::new("/var/run/engine.sock"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_forwards_never_overlap() {
    let spy = Arc::new(SpyTransport::replying(200, "{}").with_delay(Duration::from_millis(20)));
    let client = Arc::new(UpstreamClient::new(spy.clone()));
    let ep = endpoint();

    let mut tasks = Vec::new();
    for (i, method) in [EngineMethod::Get, EngineMethod::Post, EngineMethod::Delete]
        .into_iter()
        .cycle()
        .take(12)
        .enumerate()
    {
        let client = Arc::clone(&client);
        let address = ep.address(&TargetSuffix::new(format!("/containers/c{i}")).unwrap());
        tasks.push(tokio::spawn(async move {
            client.forward(method, &address, None).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(spy.calls(), 12);
    assert_eq!(spy.max_in_flight(), 1);
}

#[tokio::test]
async fn unserialized_spy_would_overlap() {
    // Sanity check of the instrument itself: calling the transport directly,
    // bypassing the gate, lets exchanges overlap.
    use harbourmaster_core::EngineTransport;
    use http_body_util::Full;
    use hyper::body::Bytes;

    let spy = SpyTransport::replying(200, "{}").with_delay(Duration::from_millis(20));
    let socket = std::path::Path::new("/var/run/engine.sock");
    let request = || {
        hyper::Request::get("/info")
            .body(Full::new(Bytes::new()))
            .unwrap()
    };

    let (a, b) = tokio::join!(spy.send(socket, request()), spy.send(socket, request()));
    a.unwrap();
    b.unwrap();

    assert_eq!(spy.max_in_flight(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_http_requests_are_serialized() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let spy = Arc::new(SpyTransport::replying(200, "[]").with_delay(Duration::from_millis(20)));
    let app = router(Arc::new(ProxyState {
        translator: Translator::new(endpoint()),
        client: UpstreamClient::new(spy.clone()),
    }));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let req = Request::get(format!("/docker-engine/?url=/containers/c{i}/json"))
                .body(Body::empty())
                .unwrap();
            app.oneshot(req).await.unwrap().status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(spy.calls(), 8);
    assert_eq!(spy.max_in_flight(), 1);
    let mut targets = spy.targets();
    targets.sort();
    assert_eq!(targets.len(), 8);
    assert_eq!(targets[0], "/containers/c0/json");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stub_engine_sees_one_request_at_a_time() {
    let engine = StubEngine::builder()
        .route("GET", "/info", 200, r#"{"Containers":0}"#)
        .delay(Duration::from_millis(20))
        .start()
        .await;
    let config = TestConfigBuilder::new()
        .listen_port(0)
        .socket_path(engine.socket_path())
        .build();
    let proxy = Arc::new(Proxy::new(config));
    let listener = proxy.bind().await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let serving = Arc::clone(&proxy);
    tokio::spawn(async move { serving.serve(listener).await.unwrap() });

    let http = reqwest::Client::new();
    let mut tasks = Vec::new();
    for _ in 0..6 {
        let http = http.clone();
        let url = format!("{base}/docker-engine/?url=/info");
        tasks.push(tokio::spawn(async move {
            http.get(url).send().await.unwrap().status().as_u16()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    assert_eq!(engine.requests().len(), 6);
    assert_eq!(engine.max_in_flight(), 1);
    proxy.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_forward_still_blocks_the_next_call() {
    let engine = StubEngine::builder()
        .route("POST", "/containers/create", 201, "")
        .route("GET", "/info", 200, r#"{"Containers":0}"#)
        .delay(Duration::from_millis(300))
        .start()
        .await;
    let ep = Arc::new(SocketEndpoint::new(engine.socket_path()));
    let client = UpstreamClient::unix();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        client.forward_post(&ep.address(&TargetSuffix::new("/containers/create").unwrap()), None),
    )
    .await;
    assert!(abandoned.is_err());

    client
        .forward_get(&ep.address(&TargetSuffix::new("/info").unwrap()))
        .await
        .unwrap();

    assert_eq!(engine.requests().len(), 2);
    assert_eq!(engine.max_in_flight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn client_hanging_up_mid_request_keeps_engine_serialized() {
    use tokio::io::AsyncWriteExt;

    let engine = StubEngine::builder()
        .route("POST", "/containers/create", 201, "")
        .route("GET", "/info", 200, r#"{"Containers":0}"#)
        .delay(Duration::from_millis(300))
        .start()
        .await;
    let config = TestConfigBuilder::new()
        .listen_port(0)
        .socket_path(engine.socket_path())
        .build();
    let proxy = Arc::new(Proxy::new(config));
    let listener = proxy.bind().await.unwrap();
    let local = listener.local_addr().unwrap();
    let serving = Arc::clone(&proxy);
    tokio::spawn(async move { serving.serve(listener).await.unwrap() });

    let mut raw = tokio::net::TcpStream::connect(local).await.unwrap();
    raw.write_all(
        b"POST /docker-engine/?url=/containers/create HTTP/1.1\r\n\
          Host: localhost\r\n\
          Content-Length: 0\r\n\r\n",
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(raw);

    let resp = reqwest::get(format!("http://{local}/docker-engine/?url=/info"))
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(engine.requests().len(), 2);
    assert_eq!(engine.max_in_flight(), 1);
    proxy.shutdown();
}
