use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use esp_stream_recorder::RecorderServer;
use esp_stream_recorder::audio::{
    AtomicSequence, AudioFormatParams, RecordingFactory, decode_header,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};

async fn start_server(dir: &Path) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let factory = RecordingFactory::new(
        dir,
        AudioFormatParams::default(),
        Arc::new(AtomicSequence::new()),
    );
    let server = RecorderServer::with_factory(listener, factory);
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn recording(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("audio_stream_8000_2_32_{index}.wav"))
}

async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Send frames, close cleanly and wait for the server's close reply
async fn stream_and_close(addr: SocketAddr, frames: Vec<Message>) {
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    for frame in frames {
        ws.send(frame).await.unwrap();
    }
    ws.close(None).await.unwrap();
    while let Some(msg) = ws.next().await {
        if msg.is_err() {
            break;
        }
    }
}

fn payload_field(path: &Path) -> Option<u32> {
    let bytes = fs::read(path).ok()?;
    decode_header(&bytes).ok().map(|h| h.payload_len)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_three_frames_produce_finalized_wav() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    let frames = (0..3u8)
        .map(|i| Message::Binary(vec![i + 1; 1000].into()))
        .collect();
    stream_and_close(addr, frames).await;

    let path = recording(dir.path(), 0);
    wait_until("finalized header", || payload_field(&path) == Some(3000)).await;

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 3044);
    assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 3000);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 3036);
    // arrival order preserved
    assert!(bytes[44..1044].iter().all(|&b| b == 1));
    assert!(bytes[1044..2044].iter().all(|&b| b == 2));
    assert!(bytes[2044..].iter().all(|&b| b == 3));

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 8000);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.len(), 750);
}

#[tokio::test]
async fn test_close_without_frames_leaves_bare_header() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    stream_and_close(addr, Vec::new()).await;

    let path = recording(dir.path(), 0);
    wait_until("recording file", || path.exists()).await;
    assert_eq!(fs::metadata(&path).unwrap().len(), 44);
    assert_eq!(payload_field(&path), Some(0));
}

#[tokio::test]
async fn test_text_frames_are_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    stream_and_close(
        addr,
        vec![
            Message::Binary(vec![0xAAu8; 10].into()),
            Message::text("status: ok"),
            Message::Binary(vec![0xBBu8; 10].into()),
        ],
    )
    .await;

    let path = recording(dir.path(), 0);
    wait_until("finalized header", || payload_field(&path) == Some(20)).await;
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 64);
    assert_eq!(&bytes[44..54], &[0xAAu8; 10]);
    assert_eq!(&bytes[54..], &[0xBBu8; 10]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_devices_get_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    let (mut first, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    let (mut second, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    first.send(Message::Binary(vec![1u8; 100].into())).await.unwrap();
    second.send(Message::Binary(vec![2u8; 200].into())).await.unwrap();
    first.send(Message::Binary(vec![1u8; 100].into())).await.unwrap();

    for mut ws in [first, second] {
        ws.close(None).await.unwrap();
        while let Some(msg) = ws.next().await {
            if msg.is_err() {
                break;
            }
        }
    }

    let (a, b) = (recording(dir.path(), 0), recording(dir.path(), 1));
    wait_until("both headers", || {
        payload_field(&a).is_some_and(|n| n > 0) && payload_field(&b).is_some_and(|n| n > 0)
    })
    .await;

    let mut sizes = [payload_field(&a).unwrap(), payload_field(&b).unwrap()];
    sizes.sort();
    assert_eq!(sizes, [200, 200]);
    // each file holds exactly one device's bytes
    for path in [&a, &b] {
        let bytes = fs::read(path).unwrap();
        let first = bytes[44];
        assert!(bytes[44..].iter().all(|&b| b == first));
    }
}

#[tokio::test]
async fn test_dropped_socket_still_finalizes_header() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws.send(Message::Binary(vec![7u8; 100].into())).await.unwrap();
    let path = recording(dir.path(), 0);
    wait_until("appended bytes", || {
        fs::metadata(&path).map(|m| m.len() == 144).unwrap_or(false)
    })
    .await;

    // drop the socket without a close handshake
    drop(ws);

    wait_until("finalized header", || payload_field(&path) == Some(100)).await;
    assert_eq!(fs::metadata(&path).unwrap().len(), 144);
    assert_eq!(&fs::read(&path).unwrap()[44..], &[7u8; 100]);
}

#[tokio::test]
async fn test_invalid_utf8_frame_finalizes_what_came_before() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_server(dir.path()).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    ws.send(Message::Binary(vec![5u8; 100].into())).await.unwrap();
    let bad_text = Frame::message(vec![0xFFu8, 0xFE], OpCode::Data(Data::Text), true);
    ws.send(Message::Frame(bad_text)).await.unwrap();
    // the server may already be closing, later sends are allowed to fail
    let _ = ws.send(Message::Binary(vec![6u8; 100].into())).await;
    let _ = ws.close(None).await;
    while let Some(msg) = ws.next().await {
        if msg.is_err() {
            break;
        }
    }

    let path = recording(dir.path(), 0);
    wait_until("finalized header", || payload_field(&path) == Some(100)).await;
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 144);
    assert!(bytes[44..].iter().all(|&b| b == 5));
}
