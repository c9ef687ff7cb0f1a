//! Tests de integración para el servidor de archivos estáticos
//! tests/integration_test.rs
//!
//! Cada test levanta un servidor en proceso sobre un puerto efímero con un
//! document root temporal, y habla con él por TCP.

#![cfg(unix)]

use static_server::config::{Config, FullQueuePolicy};
use static_server::metrics::MetricsCollector;
use static_server::server::{Server, ShutdownHandle};
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// Servidor corriendo en background, se detiene al salir de scope
struct TestServer {
    addr: SocketAddr,
    handle: ShutdownHandle,
    metrics: MetricsCollector,
    runner: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(|_| {})
    }

    fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = document_root();
        let mut config = Config {
            port: 0,
            doc_root: dir.path().join("www"),
            workers: 4,
            queue_capacity: 16,
            recv_timeout_ms: 2_000,
            shutdown_timeout_ms: 3_000,
            ..Config::default()
        };
        tweak(&mut config);

        let server = Server::new(config).expect("server should start");
        let addr = server.local_addr();
        let handle = server.shutdown_handle();
        let metrics = server.metrics();
        let runner = thread::spawn(move || server.run().expect("server run"));

        Self {
            addr,
            handle,
            metrics,
            runner: Some(runner),
            _dir: dir,
        }
    }

    fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(runner) = self.runner.take() {
            runner.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn write_file(path: &Path, contents: &[u8], mode: u32) {
    fs::write(path, contents).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// tmp/
///   secret.txt          (fuera del root)
///   www/
///     index.html
///     logo.png
///     private.html      (0600)
///     docs/readme.txt
fn document_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let www = dir.path().join("www");
    fs::create_dir_all(www.join("docs")).unwrap();

    write_file(&dir.path().join("secret.txt"), b"top secret", 0o644);
    write_file(&www.join("index.html"), b"<h1>Hello</h1>", 0o644);
    write_file(&www.join("logo.png"), PNG_BYTES, 0o644);
    write_file(&www.join("private.html"), b"nope", 0o600);
    write_file(&www.join("docs").join("readme.txt"), b"read me", 0o644);
    dir
}

/// Helper: envía bytes crudos y retorna la response completa
fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.set_write_timeout(Some(Duration::from_secs(5))).unwrap();

    stream.write_all(request).unwrap();
    stream.flush().unwrap();

    // El servidor puede cerrar con bytes sin leer (400/503): un reset
    // después de recibir la respuesta no es un error del test
    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e) if !response.is_empty() => {
                eprintln!("read ended with {} after {} bytes", e, response.len());
                break;
            }
            Err(e) => panic!("read failed: {}", e),
        }
    }
    response
}

/// Helper: GET con Host y retorna la response como texto
fn get(addr: SocketAddr, path: &str) -> String {
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    String::from_utf8_lossy(&send_raw(addr, request.as_bytes())).into_owned()
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &[u8]) -> &[u8] {
    match response.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => &[],
    }
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or("")
}

#[test]
fn test_root_serves_index() {
    let server = TestServer::start();
    let response = get(server.addr, "/");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(response.contains("Content-Type: text/html\r\n"));
    assert!(response.contains("Content-Length: 14\r\n"));
    assert!(response.contains("Last-Modified: "));
    assert!(response.ends_with("<h1>Hello</h1>"));
}

#[test]
fn test_binary_file() {
    let server = TestServer::start();
    let raw = send_raw(server.addr, b"GET /logo.png HTTP/1.1\r\nHost: x\r\n\r\n");
    let text = String::from_utf8_lossy(&raw);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Type: image/png\r\n"));
    assert_eq!(extract_body(&raw), PNG_BYTES);
}

#[test]
fn test_unknown_extension_is_octet_stream() {
    let server = TestServer::start();
    let response = get(server.addr, "/docs/readme.txt");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(response.contains("Content-Type: application/octet-stream\r\n"));
    assert!(response.ends_with("read me"));
}

#[test]
fn test_not_found() {
    let server = TestServer::start();
    let response = get(server.addr, "/missing.html");

    assert_eq!(status_line(&response), "HTTP/1.1 404 Not Found");
    assert!(!response.contains("Last-Modified"));
}

#[test]
fn test_path_traversal_is_not_found() {
    let server = TestServer::start();

    let response = get(server.addr, "/../secret.txt");
    assert_eq!(status_line(&response), "HTTP/1.1 404 Not Found");
    assert!(!response.contains("top secret"));

    let response = get(server.addr, "/../../etc/passwd");
    assert_eq!(status_line(&response), "HTTP/1.1 404 Not Found");
}

#[test]
fn test_forbidden() {
    let server = TestServer::start();

    let response = get(server.addr, "/private.html");
    assert_eq!(status_line(&response), "HTTP/1.1 403 Forbidden");

    let response = get(server.addr, "/docs");
    assert_eq!(status_line(&response), "HTTP/1.1 403 Forbidden");
}

#[test]
fn test_query_string_is_ignored() {
    let server = TestServer::start();
    let response = get(server.addr, "/index.html?v=2#top");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(response.ends_with("<h1>Hello</h1>"));
}

#[test]
fn test_head_request() {
    let server = TestServer::start();
    let response = send_raw(server.addr, b"HEAD /index.html HTTP/1.1\r\nHost: x\r\n\r\n");
    let text = String::from_utf8_lossy(&response);

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 14\r\n"));
    assert!(extract_body(&response).is_empty());
}

#[test]
fn test_missing_host_is_bad_request() {
    let server = TestServer::start();
    let response = send_raw(server.addr, b"GET / HTTP/1.1\r\n\r\n");
    let text = String::from_utf8_lossy(&response);

    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(text.contains("Connection: close\r\n"));
}

#[test]
fn test_malformed_request_line() {
    let server = TestServer::start();
    let response = send_raw(server.addr, b"GARBAGE\r\nHost: x\r\n\r\n");

    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn test_request_too_large() {
    let server = TestServer::start_with(|config| config.max_request_size = 256);

    let mut request = b"GET / HTTP/1.1\r\nHost: x\r\n".to_vec();
    request.extend_from_slice(format!("X-Padding: {}\r\n\r\n", "a".repeat(400)).as_bytes());
    let response = send_raw(server.addr, &request);

    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}

#[test]
fn test_body_with_content_length() {
    let server = TestServer::start();
    let response = send_raw(
        server.addr,
        b"POST /index.html HTTP/1.1\r\nHost: x\r\nContent-Length: 11\r\n\r\nhello world",
    );

    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_connection_close_is_echoed() {
    let server = TestServer::start();
    let response = send_raw(
        server.addr,
        b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
    );
    let text = String::from_utf8_lossy(&response);

    assert!(text.contains("Connection: close\r\n"));
}

#[test]
fn test_concurrent_requests() {
    let server = TestServer::start();
    let addr = server.addr;

    let clients: Vec<_> = (0..32)
        .map(|i| {
            thread::spawn(move || {
                let path = if i % 2 == 0 { "/" } else { "/missing" };
                get(addr, path)
            })
        })
        .collect();

    let mut ok = 0;
    let mut not_found = 0;
    for client in clients {
        let response = client.join().unwrap();
        match status_line(&response) {
            "HTTP/1.1 200 OK" => ok += 1,
            "HTTP/1.1 404 Not Found" => not_found += 1,
            other => panic!("unexpected status line: {}", other),
        }
    }

    assert_eq!(ok, 16);
    assert_eq!(not_found, 16);

    let snapshot = server.metrics.snapshot();
    assert_eq!(snapshot.count_for(200), 16);
    assert_eq!(snapshot.count_for(404), 16);
}

#[test]
fn test_reject_policy_answers_503() {
    let server = TestServer::start_with(|config| {
        config.workers = 1;
        config.queue_capacity = 1;
        config.on_full = FullQueuePolicy::Reject;
    });

    // Ocupa al único worker: conecta y no envía nada
    let _busy = TcpStream::connect(server.addr).unwrap();
    thread::sleep(Duration::from_millis(200));

    // Ocupa el único slot de la cola
    let _queued = TcpStream::connect(server.addr).unwrap();
    thread::sleep(Duration::from_millis(200));

    let response = send_raw(server.addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    assert!(response.starts_with(b"HTTP/1.1 503 Service Unavailable\r\n"));
    assert_eq!(server.metrics.snapshot().rejected_connections, 1);
}

#[test]
fn test_shutdown_with_idle_workers() {
    let mut server = TestServer::start_with(|config| config.workers = 8);
    assert!(get(server.addr, "/").starts_with("HTTP/1.1 200 OK"));

    let started = Instant::now();
    server.stop();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(TcpStream::connect(server.addr).is_err());
}
