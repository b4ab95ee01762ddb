//! HTTP client against a one-shot local stub server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use stepwise_client::{ClientConfig, ClientError, HttpTraceClient, TraceRequest, TraceSource};
use stepwise_core::store::{LoadError, UNPARSEABLE_ERROR_BODY};

struct Captured {
    request_line: String,
    body: String,
}

/// Serve exactly one request with `status` and `body`, returning what the
/// client sent.
fn serve_once(status: &'static str, body: String) -> (ClientConfig, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

        let mut request_line = String::new();
        reader.read_line(&mut request_line).expect("request line");
        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).expect("header");
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().expect("content length");
            }
        }
        let mut raw = vec![0u8; content_length];
        reader.read_exact(&mut raw).expect("body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write response");
        stream.flush().expect("flush");

        Captured {
            request_line: request_line.trim_end().to_owned(),
            body: String::from_utf8(raw).expect("utf8 body"),
        }
    });
    (ClientConfig::new(format!("http://{addr}/api")), handle)
}

fn client(config: ClientConfig) -> HttpTraceClient {
    HttpTraceClient::new(config).expect("client")
}

#[test]
fn unified_trace_request_round_trip() {
    let trace = json!({
        "result": {"count": 1},
        "trace": {"steps": [
            {"type": "INITIAL_STATE", "description": "start", "data": {}},
            {"type": "ALGORITHM_COMPLETE", "description": "done", "data": {}}
        ], "total_steps": 2, "duration": 0.01},
        "metadata": {"algorithm": "binary-search", "display_name": "Binary Search"}
    });
    let (config, server) = serve_once("200 OK", trace.to_string());

    let request = TraceRequest::unified("binary-search", json!({"array": [1, 2, 3], "target": 2}));
    let doc = client(config).fetch_trace(&request).expect("trace");
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.title(), "Binary Search");

    let captured = server.join().expect("server thread");
    assert_eq!(captured.request_line, "POST /api/trace/unified HTTP/1.1");
    let sent: Value = serde_json::from_str(&captured.body).expect("json body");
    assert_eq!(
        sent,
        json!({"algorithm": "binary-search", "input": {"array": [1, 2, 3], "target": 2}})
    );
}

#[test]
fn error_body_message_is_surfaced() {
    let (config, server) = serve_once(
        "400 Bad Request",
        json!({"error": "intervals must not be empty"}).to_string(),
    );
    let request = TraceRequest::Intervals { intervals: vec![] };
    let err = client(config).fetch_trace(&request).unwrap_err();
    server.join().expect("server thread");

    assert_eq!(
        err,
        ClientError::Status {
            status: 400,
            message: Some("intervals must not be empty".into())
        }
    );
    let load = LoadError::from(err);
    assert_eq!(load.to_string(), "backend returned 400: intervals must not be empty");
}

#[test]
fn unparseable_error_body_falls_back() {
    let (config, server) = serve_once("500 Internal Server Error", "<html>oops</html>".into());
    let err = client(config)
        .fetch_trace(&TraceRequest::Intervals { intervals: vec![] })
        .unwrap_err();
    server.join().expect("server thread");
    assert_eq!(LoadError::from(err).message, UNPARSEABLE_ERROR_BODY);
}

#[test]
fn success_with_bad_body_is_a_decode_error() {
    let (config, server) = serve_once("200 OK", json!({"trace": 7}).to_string());
    let err = client(config)
        .fetch_trace(&TraceRequest::Intervals { intervals: vec![] })
        .unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, ClientError::Decode { status: 200, .. }), "{err:?}");
}

#[test]
fn algorithm_registry_and_info() {
    let (config, server) = serve_once(
        "200 OK",
        json!([{"name": "two-pointer", "display_name": "Two Pointer",
                "example_inputs": [{"name": "basic", "input": {"array": [1, 1, 2]}}]}])
        .to_string(),
    );
    let list = client(config).list_algorithms().expect("list");
    assert_eq!(server.join().expect("server").request_line, "GET /api/algorithms HTTP/1.1");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].example_inputs[0].name.as_deref(), Some("basic"));

    let (config, server) = serve_once(
        "200 OK",
        json!({"algorithm": "two-pointer", "info": "# Two Pointer"}).to_string(),
    );
    let info = client(config).algorithm_info("two-pointer").expect("info");
    assert_eq!(
        server.join().expect("server").request_line,
        "GET /api/algorithms/two-pointer/info HTTP/1.1"
    );
    assert_eq!(info.info, "# Two Pointer");
}

#[test]
fn unreachable_backend_is_a_transport_error() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("reserve port");
    let err = client(ClientConfig::new(format!("http://{addr}/api")))
        .list_algorithms()
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "{err:?}");
    assert_eq!(err.status(), None);
}
