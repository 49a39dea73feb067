//! End-to-end tests of the reqwest transport and the client against a mock
//! Atelier server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use atelier::{
    AtelierClient, AtelierError, BasicAuth, ConnectionConfig, ConsoleSink, DocNamesQuery,
    DocumentContent, DocumentName, Method, ResponseEnvelope, StaticConfig, Transport,
    TransportError, WireRequest,
};
use atelier_http::{connect, ReqwestTransport, Scheme, SettingsFileConfig, TransportSettings};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingConsole {
    calls: Mutex<Vec<Vec<String>>>,
}

impl ConsoleSink for RecordingConsole {
    fn output(&self, lines: &[String]) {
        self.calls.lock().unwrap().push(lines.to_vec());
    }
}

fn config_for(server: &MockServer) -> ConnectionConfig {
    ConnectionConfig {
        host: server.address().ip().to_string(),
        port: server.address().port(),
        username: "dev".to_string(),
        password: "secret".to_string(),
        ns: "USER".to_string(),
        https: false,
    }
}

fn client_for(server: &MockServer, console: Arc<RecordingConsole>) -> AtelierClient {
    connect(
        Arc::new(StaticConfig::new(config_for(server))),
        console,
        &TransportSettings::default(),
    )
    .unwrap()
}

fn get(server: &MockServer, path: &str) -> WireRequest {
    wire_get(
        &server.address().ip().to_string(),
        server.address().port(),
        path,
    )
}

fn wire_get(host: &str, port: u16, path: &str) -> WireRequest {
    WireRequest {
        method: Method::Get,
        host: host.to_string(),
        port,
        path: path.to_string(),
        headers: vec![("Accept".to_string(), "application/json".to_string())],
        auth: BasicAuth {
            username: "dev".to_string(),
            password: "secret".to_string(),
        },
        body: None,
    }
}

fn doc(name: &str) -> DocumentName {
    DocumentName::new(name).unwrap()
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_sends_credentials_and_returns_every_set_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/"))
        .and(basic_auth("dev", "secret"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "CSPSESSIONID=abc; path=/")
                .append_header("set-cookie", "CSPWSERVERID=xyz")
                .set_body_string("ok"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Scheme::Plain, &TransportSettings::default()).unwrap();
    let response = transport
        .send(get(&server, "/api/atelier/?"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        response.headers_all("set-cookie").collect::<Vec<_>>(),
        ["CSPSESSIONID=abc; path=/", "CSPWSERVERID=xyz"]
    );
    assert_eq!(response.body, b"ok");
}

#[tokio::test]
async fn transport_reports_error_statuses_as_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Scheme::Plain, &TransportSettings::default()).unwrap();
    let response = transport
        .send(get(&server, "/api/atelier/?"))
        .await
        .unwrap();

    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn transport_connection_refused_is_a_connect_error() {
    // Bind then drop a listener to obtain a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let request = wire_get("127.0.0.1", port, "/api/atelier/?");

    let transport = ReqwestTransport::new(Scheme::Plain, &TransportSettings::default()).unwrap();
    let err = transport.send(request).await.unwrap_err();

    assert!(matches!(err, TransportError::Connect { .. }), "got {err:?}");
}

#[tokio::test]
async fn transport_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    let settings = TransportSettings {
        timeout: Some(Duration::from_millis(50)),
        ..TransportSettings::default()
    };

    let transport = ReqwestTransport::new(Scheme::Plain, &settings).unwrap();
    let err = transport
        .send(get(&server, "/api/atelier/?"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Client over the real transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_doc_returns_parsed_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/v2/USER/doc/Test.cls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"errors": []},
            "console": [],
            "result": {"name": "Test.cls", "content": ["Class Test", "{", "}"]}
        })))
        .mount(&server)
        .await;
    let console = Arc::new(RecordingConsole::default());
    let client = client_for(&server, console.clone());

    let envelope = client.get_doc(&doc("Test.cls"), None).await.unwrap();

    assert_eq!(envelope.as_json().unwrap()["result"]["name"], "Test.cls");
    assert_eq!(console.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn get_missing_doc_rejects_with_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/v2/USER/doc/Missing.cls"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": {"errors": [{"error": "ERROR #16005: Document 'Missing.cls' does NOT exist"}]},
            "console": [],
            "result": {}
        })))
        .mount(&server)
        .await;
    let client = client_for(&server, Arc::new(RecordingConsole::default()));

    let err = client.get_doc(&doc("Missing.cls"), None).await.unwrap_err();

    match err {
        AtelierError::HttpStatus { path, status } => {
            assert_eq!(status, 404);
            assert_eq!(path, "/api/atelier/v2/USER/doc/Missing.cls?");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_response_is_returned_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw"))
        .mount(&server)
        .await;
    let console = Arc::new(RecordingConsole::default());
    let client = client_for(&server, console.clone());

    let envelope = client.server_info().await.unwrap();

    assert_eq!(envelope, ResponseEnvelope::Text("raw".to_string()));
    assert!(console.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_cookie_is_replayed_and_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/"))
        .and(header("cookie", "session=abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "session=def")
                .set_body_json(json!({"result": "second"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/"))
        .and(header("cookie", "session=def"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "third"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "session=abc; path=/; HttpOnly")
                .set_body_json(json!({"result": "first"})),
        )
        .with_priority(10)
        .mount(&server)
        .await;
    let client = client_for(&server, Arc::new(RecordingConsole::default()));

    let mut results = Vec::new();
    for _ in 0..3 {
        let envelope = client.server_info().await.unwrap();
        results.push(envelope.as_json().unwrap()["result"].clone());
    }

    assert_eq!(results, [json!("first"), json!("second"), json!("third")]);
    assert_eq!(client.cookies().read(), ["session=def"]);
}

#[tokio::test]
async fn doc_names_query_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/v2/USER/docnames/CLS/*"))
        .and(query_param("generated", "0"))
        .and(query_param("filter", "Demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"content": []}})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, Arc::new(RecordingConsole::default()));
    let query = DocNamesQuery {
        category: "CLS".to_string(),
        filter: "Demo".to_string(),
        ..DocNamesQuery::default()
    };

    client.get_doc_names(&query).await.unwrap();
}

#[tokio::test]
async fn put_doc_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/atelier/v2/USER/doc/Test.cls"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"enc": false, "content": ["Class Test", "{", "}"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": {}})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, Arc::new(RecordingConsole::default()));

    client
        .put_doc(
            &doc("Test.cls"),
            &DocumentContent::from_lines(["Class Test", "{", "}"]),
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn compile_forwards_console_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/atelier/v2/USER/action/compile"))
        .and(query_param("flags", "cuk"))
        .and(body_json(json!(["Test.cls"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "console": ["Compiling class Test", "Compilation finished successfully"],
            "result": {"content": []}
        })))
        .mount(&server)
        .await;
    let console = Arc::new(RecordingConsole::default());
    let client = client_for(&server, console.clone());

    client
        .action_compile(&[doc("Test.cls")], Some("cuk"), false)
        .await
        .unwrap();

    assert_eq!(
        *console.calls.lock().unwrap(),
        vec![vec![
            "Compiling class Test".to_string(),
            "Compilation finished successfully".to_string()
        ]]
    );
}

// ---------------------------------------------------------------------------
// Connection limits and keep-alive
// ---------------------------------------------------------------------------

/// Counters kept by [`spawn_slow_server`].
#[derive(Default)]
struct ServerStats {
    connections: AtomicUsize,
    served: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Starts a bare HTTP/1.1 server that holds every request for `delay` before
/// answering `200 ok`, keeping connections open between requests.
async fn spawn_slow_server(delay: Duration) -> (SocketAddr, Arc<ServerStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(ServerStats::default());

    let accept_stats = stats.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accept_stats.connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_connection(stream, accept_stats.clone(), delay));
        }
    });
    (addr, stats)
}

async fn serve_connection(mut stream: TcpStream, stats: Arc<ServerStats>, delay: Duration) {
    const REPLY: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok";

    let mut pending = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        // Bodiless GETs: the blank line ends each request.
        let end = loop {
            if let Some(pos) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => pending.extend_from_slice(&chunk[..n]),
            }
        };
        pending.drain(..end);

        let current = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        stats.served.fetch_add(1, Ordering::SeqCst);

        if stream.write_all(REPLY).await.is_err() {
            return;
        }
    }
}

fn client_at(addr: SocketAddr) -> AtelierClient {
    let config = ConnectionConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        ..ConnectionConfig::default()
    };
    connect(
        Arc::new(StaticConfig::new(config)),
        Arc::new(RecordingConsole::default()),
        &TransportSettings::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn excess_concurrent_calls_queue_behind_ten_exchanges() {
    let delay = Duration::from_millis(100);
    let (addr, stats) = spawn_slow_server(delay).await;
    let client = Arc::new(client_at(addr));

    let started = Instant::now();
    let mut calls = JoinSet::new();
    for _ in 0..30 {
        let client = client.clone();
        calls.spawn(async move { client.server_info().await });
    }
    while let Some(result) = calls.join_next().await {
        let envelope = result.unwrap().unwrap();
        assert_eq!(envelope, ResponseEnvelope::Text("ok".to_string()));
    }

    let max_in_flight = stats.max_in_flight.load(Ordering::SeqCst);
    assert!(max_in_flight <= 10, "{max_in_flight} exchanges in flight");
    assert!(max_in_flight > 1, "calls were serialised");
    // 30 calls, at most 10 at a time, each held for `delay`.
    assert!(started.elapsed() >= delay * 3, "took {:?}", started.elapsed());
    assert_eq!(stats.served.load(Ordering::SeqCst), 30);
}

#[tokio::test]
async fn sequential_calls_reuse_a_kept_alive_connection() {
    let (addr, stats) = spawn_slow_server(Duration::ZERO).await;
    let client = client_at(addr);

    client.server_info().await.unwrap();
    let opened = stats.connections.load(Ordering::SeqCst);
    assert_eq!(opened, 1);

    for _ in 0..5 {
        // Let the pool take the connection back before the next call.
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.server_info().await.unwrap();
    }

    assert_eq!(stats.served.load(Ordering::SeqCst), 6);
    assert_eq!(stats.connections.load(Ordering::SeqCst), opened);
}

// ---------------------------------------------------------------------------
// Settings file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_file_is_reread_on_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/v2/FIRST/doc/A.cls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/atelier/v2/SECOND/doc/A.cls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("settings.json");
    let write_ns = |ns: &str| {
        let conn = ConnectionConfig {
            ns: ns.to_string(),
            ..config_for(&server)
        };
        std::fs::write(&file, json!({ "objectscript.conn": conn }).to_string()).unwrap();
    };

    write_ns("FIRST");
    let client = connect(
        Arc::new(SettingsFileConfig::new(&file)),
        Arc::new(RecordingConsole::default()),
        &TransportSettings::default(),
    )
    .unwrap();
    client.get_doc(&doc("A.cls"), None).await.unwrap();

    write_ns("SECOND");
    client.get_doc(&doc("A.cls"), None).await.unwrap();
}
