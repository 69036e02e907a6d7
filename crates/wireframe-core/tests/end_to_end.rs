use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use wireframe_core::client::ComposedAwaitable;
use wireframe_core::config::{ServerConfig, StaticFileConfig};
use wireframe_core::io::{ReadOutcome, Reader};
use wireframe_core::message::{encode_request, HeaderMap, Method, Request, Response, Version};
use wireframe_core::router::Router;
use wireframe_core::server::serve_connection;
use wireframe_core::ws::{self, CloseCode, Role, WsEvent, WsReader, WsWriter};

async fn echo_path_handler(req: Request) -> Result<Response, wireframe_core::error::WireError> {
    Ok(Response::new(200).with_body(req.path().as_bytes().to_vec()))
}

#[tokio::test]
async fn client_get_against_a_registered_route() {
    let mut router = Router::new();
    router.add(&[Method::Get], "/ping", echo_path_handler).unwrap();
    let router = Arc::new(router);
    let config = Arc::new(ServerConfig::default().with_port(1).build().unwrap());

    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve_connection(server_side, router, config, None));

    let mut client = ComposedAwaitable::new(client_side);
    let resp = client.get("example.test", "/ping").await.unwrap();
    assert_eq!(resp.status.0, 200);
    assert_eq!(resp.body.as_slice(), b"/ping");
}

#[tokio::test]
async fn client_get_times_out_when_server_never_responds() {
    // Nothing is listening on the server half, so the request is sent but
    // no response ever arrives.
    let (_server_side, client_side) = tokio::io::duplex(64 * 1024);
    let mut client = ComposedAwaitable::new(client_side);
    let result = client
        .get_with_timeout("example.test", "/slow", Duration::from_millis(50))
        .await;
    assert_eq!(
        result.unwrap_err().code(),
        wireframe_core::error::codes::TIMEOUT
    );
}

#[tokio::test]
async fn static_file_serving_with_etag_and_conditional_get() {
    let dir = tempdir("etag");
    std::fs::write(dir.join("hello.txt"), b"hello world").unwrap();

    let mut router = Router::new();
    router.mount("/static", dir.clone(), StaticFileConfig::default()).unwrap();
    let router = Arc::new(router);
    let config = Arc::new(ServerConfig::default().with_port(1).build().unwrap());

    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve_connection(server_side, router, config, None));

    let mut client = ComposedAwaitable::new(client_side);
    let resp = client.get("example.test", "/static/hello.txt").await.unwrap();
    assert_eq!(resp.status.0, 200);
    assert_eq!(resp.body.as_slice(), b"hello world");
    let etag = resp.headers.get("ETag").unwrap().to_string();

    let mut headers = HeaderMap::new();
    headers.insert("Host", "example.test".to_string());
    headers.insert("Connection", "keep-alive");
    headers.insert("If-None-Match", etag);
    let req = Request::new(Method::Get, "/static/hello.txt".to_string(), Version::Http11, headers);
    let resp = client.request(req).await.unwrap();
    assert_eq!(resp.status.0, 304);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let dir = tempdir("range");
    let body: Vec<u8> = (0..1024u32).map(|b| (b % 256) as u8).collect();
    std::fs::write(dir.join("blob.bin"), &body).unwrap();

    let mut router = Router::new();
    router.mount("/static", dir.clone(), StaticFileConfig::default()).unwrap();
    let router = Arc::new(router);
    let config = Arc::new(ServerConfig::default().with_port(1).build().unwrap());

    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve_connection(server_side, router, config, None));

    let mut client = ComposedAwaitable::new(client_side);
    let mut headers = HeaderMap::new();
    headers.insert("Host", "example.test".to_string());
    headers.insert("Connection", "keep-alive");
    headers.insert("Range", "bytes=0-9");
    let req = Request::new(Method::Get, "/static/blob.bin".to_string(), Version::Http11, headers);
    let resp = client.request(req).await.unwrap();
    assert_eq!(resp.status.0, 206);
    assert_eq!(resp.body.len(), 10);
    assert_eq!(resp.body.as_slice(), &body[0..10]);
    assert_eq!(resp.headers.get("Content-Range"), Some("bytes 0-9/1024"));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn websocket_echo_round_trip() {
    let router = Arc::new(Router::new());
    let config = Arc::new(ServerConfig::default().with_port(1).build().unwrap());

    let ws_handler = Arc::new(
        |mut reader: wireframe_core::server::BoxedWsReader, writer: wireframe_core::server::BoxedWsWriter| async move {
            loop {
                match reader.recv_event().await {
                    Ok(WsEvent::Message(msg)) => {
                        let text = String::from_utf8(msg.payload).unwrap();
                        if writer.send_text(&text).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) => continue,
                    Err(_) => return,
                }
            }
        },
    );

    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve_connection(server_side, router, config, Some(ws_handler)));

    let (mut read_half, mut write_half) = tokio::io::split(client_side);

    let key = ws::generate_client_key();
    let req = ws::build_upgrade_request("example.test", "/chat", &key);
    write_half.write_all(&encode_request(&req)).await.unwrap();

    let mut raw_reader = Reader::new(&mut read_half);
    let resp = loop {
        match raw_reader.get_response().await.unwrap() {
            ReadOutcome::Complete(resp) => break resp,
            ReadOutcome::Pending => continue,
        }
    };
    ws::verify_accept_response(&key, &resp).unwrap();

    let ws_writer = WsWriter::new(write_half, Role::Client);
    let (mut ws_reader, ws_handle) = WsReader::new(read_half, ws_writer);

    ws_handle.send_text("hello over the wire").await.unwrap();
    match ws_reader.recv_event().await.unwrap() {
        WsEvent::Message(msg) => {
            assert_eq!(String::from_utf8(msg.payload).unwrap(), "hello over the wire");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn websocket_ping_is_auto_ponged_and_close_is_handshaked() {
    let router = Arc::new(Router::new());
    let config = Arc::new(ServerConfig::default().with_port(1).build().unwrap());

    // A handler that never sends anything itself: every control-frame
    // obligation below is satisfied by WsReader::recv_event alone.
    let ws_handler = Arc::new(
        |mut reader: wireframe_core::server::BoxedWsReader, _writer: wireframe_core::server::BoxedWsWriter| async move {
            loop {
                if reader.recv_event().await.is_err() {
                    return;
                }
            }
        },
    );

    let (server_side, client_side) = tokio::io::duplex(64 * 1024);
    tokio::spawn(serve_connection(server_side, router, config, Some(ws_handler)));

    let (mut read_half, mut write_half) = tokio::io::split(client_side);

    let key = ws::generate_client_key();
    let req = ws::build_upgrade_request("example.test", "/chat", &key);
    write_half.write_all(&encode_request(&req)).await.unwrap();

    let mut raw_reader = Reader::new(&mut read_half);
    let resp = loop {
        match raw_reader.get_response().await.unwrap() {
            ReadOutcome::Complete(resp) => break resp,
            ReadOutcome::Pending => continue,
        }
    };
    ws::verify_accept_response(&key, &resp).unwrap();

    let ws_writer = WsWriter::new(write_half, Role::Client);
    let (mut ws_reader, ws_handle) = WsReader::new(read_half, ws_writer);

    ws_handle.send_ping(b"are you there").await.unwrap();
    match ws_reader.recv_event().await.unwrap() {
        WsEvent::Pong(payload) => assert_eq!(payload, b"are you there"),
        other => panic!("unexpected event: {other:?}"),
    }

    ws_handle.send_close(CloseCode::Normal, "done").await.unwrap();
    match ws_reader.recv_event().await.unwrap() {
        WsEvent::Close { .. } => {}
        other => panic!("unexpected event: {other:?}"),
    }
}

fn tempdir(label: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("wireframe-core-test-{label}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}
