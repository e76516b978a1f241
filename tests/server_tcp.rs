// SPDX-License-Identifier: MIT OR Apache-2.0
//! Banner and request round-trips over a live listener.

use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use uiprobe::backend::BackendRegistry;
use uiprobe::backend_mock::MockBackend;
use uiprobe::daemon::serve;
use uiprobe::protocol::{names, Envelope, ExtensionRegistry, JsonlCodec, MsgType, Target};

async fn start_server() -> std::net::SocketAddr {
    let mut builder = BackendRegistry::builder();
    builder.register(Box::new(MockBackend::sample()));
    let registry = Arc::new(builder.build());
    let extensions = Arc::new(ExtensionRegistry::new());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(listener, registry, extensions).await;
    });
    addr
}

#[tokio::test]
async fn banner_arrives_before_any_request() {
    let addr = start_server().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let banner_line = lines.next_line().await.unwrap().unwrap();
    let banner = JsonlCodec::decode(&banner_line).unwrap();
    assert_eq!(banner.kind, MsgType::Response);
    assert_eq!(banner.target, Target::System);
    assert_eq!(banner.name, names::INFO);
    assert_eq!(banner.params["status"], json!(true));
    assert_eq!(banner.params["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(banner.params["extensions"], json!([]));
    assert!(banner.params.contains_key("locale"));
}

#[tokio::test]
async fn get_round_trip_over_tcp() {
    let addr = start_server().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Swallow the banner.
    lines.next_line().await.unwrap().unwrap();

    let request = Envelope::request(
        Target::Accessibility,
        names::GET,
        [
            ("path".to_owned(), json!([])),
            ("depth".to_owned(), json!(1)),
            ("include".to_owned(), json!(["name", "count"])),
        ]
        .into_iter()
        .collect(),
    );
    writer
        .write_all(JsonlCodec::encode(&request).unwrap().as_bytes())
        .await
        .unwrap();

    let response_line = lines.next_line().await.unwrap().unwrap();
    let response = JsonlCodec::decode(&response_line).unwrap();
    assert_eq!(response.kind, MsgType::Response);
    assert_eq!(response.target, Target::Accessibility);
    assert_eq!(response.params["status"], json!(true));
    assert_eq!(response.params["accessible"]["count"], json!(1));
    assert_eq!(
        response.params["accessible"]["children"][0]["name"],
        json!("mock")
    );
}

#[tokio::test]
async fn unsupported_requests_get_a_structured_error() {
    let addr = start_server().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    lines.next_line().await.unwrap().unwrap();

    let request = Envelope::request(Target::Accessibility, names::PUT, Default::default());
    writer
        .write_all(JsonlCodec::encode(&request).unwrap().as_bytes())
        .await
        .unwrap();

    let response = JsonlCodec::decode(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response.params["status"], json!(false));
    assert!(
        response.params["error"]
            .as_str()
            .unwrap()
            .contains("unsupported message")
    );
}

#[tokio::test]
async fn requests_on_one_connection_are_answered_in_order() {
    let addr = start_server().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    lines.next_line().await.unwrap().unwrap();

    let mut batch = String::new();
    for depth in [0i64, 1, 0] {
        let request = Envelope::request(
            Target::Accessibility,
            names::GET,
            [
                ("path".to_owned(), json!([])),
                ("depth".to_owned(), json!(depth)),
                ("include".to_owned(), json!(["count"])),
            ]
            .into_iter()
            .collect(),
        );
        batch.push_str(&JsonlCodec::encode(&request).unwrap());
    }
    writer.write_all(batch.as_bytes()).await.unwrap();

    let first = JsonlCodec::decode(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert!(first.params["accessible"].get("children").is_none());
    let second = JsonlCodec::decode(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert!(second.params["accessible"].get("children").is_some());
    let third = JsonlCodec::decode(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert!(third.params["accessible"].get("children").is_none());
}
