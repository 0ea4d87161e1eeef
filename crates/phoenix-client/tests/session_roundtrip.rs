//! Session request/reply over the in-memory transport.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use serde_json::{json, Map};
use tracing_subscriber::{fmt, EnvFilter};

use phoenix_client::config::{self, SocketSettings};
use phoenix_client::transport::{Frame, MemoryFactory, MemoryPeer, WebsocketState};
use phoenix_client::Session;
use phoenix_core::protocol::ReplyStatus;
use phoenix_core::{JsonSerializer, Message, MessageSerializer, Reply};

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn settings(yaml: &str) -> SocketSettings {
    config::load_from_str(yaml).unwrap().socket
}

fn decode(frame: Frame) -> Message {
    match frame {
        Frame::Text(s) => JsonSerializer.deserialize(&s).unwrap(),
        Frame::Binary(b) => JsonSerializer.deserialize_bytes(&b).unwrap(),
    }
}

async fn answer(
    peer: &mut MemoryPeer,
    status: ReplyStatus,
    response: serde_json::Value,
) -> Message {
    let req = decode(peer.recv().await.expect("request frame"));
    let response = response.as_object().cloned().unwrap_or_else(Map::new);
    let reply = Message::reply(
        req.topic().unwrap(),
        req.r#ref().unwrap(),
        req.join_ref().map(str::to_owned),
        &Reply::new(status, response),
    );
    peer.send_text(JsonSerializer.serialize(&reply).unwrap()).await.unwrap();
    req
}

#[tokio::test]
async fn request_gets_correlated_reply() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let (session, _inbound) = Session::connect(&factory, SocketSettings::default()).await.unwrap();
    let mut peer = peers.recv().await.unwrap();
    assert_eq!(session.state(), WebsocketState::Open);

    let server = tokio::spawn(async move {
        let req = answer(&mut peer, ReplyStatus::Ok, json!({"joined": true})).await;
        (req, peer)
    });

    let reply = session
        .request("room:lobby", "phx_join", json!({"token": "abc"}), Some("1"))
        .await
        .unwrap();
    assert_eq!(reply.status(), ReplyStatus::Ok);
    assert_eq!(reply.response()["joined"], json!(true));
    assert_eq!(session.pending_replies(), 0);

    let (req, _peer) = server.await.unwrap();
    assert_eq!(req.topic(), Some("room:lobby"));
    assert_eq!(req.event(), Some("phx_join"));
    assert_eq!(req.r#ref(), Some("1"));
    assert_eq!(req.join_ref(), Some("1"));
    assert_eq!(req.payload().unwrap()["token"], json!("abc"));
}

#[tokio::test]
async fn non_reply_messages_reach_the_app_and_garbage_is_dropped() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let (_session, mut inbound) = Session::connect(&factory, SocketSettings::default())
        .await
        .unwrap();
    let peer = peers.recv().await.unwrap();

    peer.send_text("not a frame").await.unwrap();
    peer.send_text(r#"{"topic":"room:lobby"}"#).await.unwrap();
    peer.send_text(r#"[null,null,"room:lobby","new_msg",{"body":"hi"}]"#).await.unwrap();
    // Reply for a ref nobody waits on is handed to the app untouched.
    peer.send_text(r#"[null,"99","room:lobby","phx_reply",{"status":"ok"}]"#).await.unwrap();

    let msg = inbound.recv().await.unwrap();
    assert_eq!(msg.event(), Some("new_msg"));
    assert_eq!(msg.payload().unwrap()["body"], json!("hi"));

    let msg = inbound.recv().await.unwrap();
    assert_eq!(msg.event(), Some("phx_reply"));
    assert_eq!(msg.r#ref(), Some("99"));
}

#[tokio::test]
async fn binary_mode_sends_binary_frames() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let s = settings("version: 1\nsocket:\n  binary_mode: true\n");
    let (session, _inbound) = Session::connect(&factory, s).await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    let pending = session
        .push("room:lobby", "new_msg", json!({"body": "x"}), None)
        .await
        .unwrap();
    assert_eq!(pending.msg_ref(), "1");

    let frame = peer.recv().await.unwrap();
    assert!(matches!(frame, Frame::Binary(_)));
    let req = decode(frame);
    assert_eq!(req.event(), Some("new_msg"));
    assert!(req.join_ref().is_none());

    // Replies may come back as binary too.
    let error = Reply::new(ReplyStatus::Error, Map::new());
    let reply = Message::reply("room:lobby", "1", None, &error);
    peer.send_binary(JsonSerializer.serialize_bytes(&reply).unwrap()).await.unwrap();

    let msg = pending.wait(Duration::from_secs(1)).await.unwrap();
    assert_eq!(msg.event(), Some("chan_reply_1"));
    assert_eq!(msg.parse_reply().unwrap().unwrap().status(), ReplyStatus::Error);
}

#[tokio::test]
async fn request_times_out() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let s = settings("version: 1\nsocket:\n  reply_timeout_ms: 100\n");
    let (session, _inbound) = Session::connect(&factory, s).await.unwrap();
    let _peer = peers.recv().await.unwrap();

    let err = session
        .request("room:lobby", "ping", json!({}), None)
        .await
        .expect_err("nobody answers");
    assert_eq!(err.code().as_str(), "TIMEOUT");
    assert_eq!(session.pending_replies(), 0);
}

#[tokio::test]
async fn close_fails_pending_and_rejects_sends() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let (session, _inbound) = Session::connect(&factory, SocketSettings::default()).await.unwrap();
    let _peer = peers.recv().await.unwrap();

    let pending = session
        .push("room:lobby", "ping", json!({}), None)
        .await
        .unwrap();
    session.close().await.unwrap();
    assert_eq!(session.state(), WebsocketState::Closed);

    let err = pending.wait(Duration::from_secs(1)).await.expect_err("closed");
    assert_eq!(err.code().as_str(), "TRANSPORT");

    let err = session
        .push("room:lobby", "ping", json!({}), None)
        .await
        .expect_err("closed transport");
    assert_eq!(err.code().as_str(), "INVALID_STATE");
    assert_eq!(session.pending_replies(), 0);
}

#[tokio::test]
async fn dropped_pushes_do_not_stay_registered() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let (session, mut inbound) = Session::connect(&factory, SocketSettings::default())
        .await
        .unwrap();
    let mut peer = peers.recv().await.unwrap();

    for _ in 0..100 {
        let pending = session
            .push("room:lobby", "new_msg", json!({"body": "fire"}), None)
            .await
            .unwrap();
        drop(pending);
    }
    assert_eq!(session.pending_replies(), 0);

    // A late reply to one of them is handed to the app as a plain phx_reply.
    let req = answer(&mut peer, ReplyStatus::Ok, json!({})).await;
    let msg = inbound.recv().await.unwrap();
    assert_eq!(msg.event(), Some("phx_reply"));
    assert_eq!(msg.r#ref(), req.r#ref());
}

#[tokio::test]
async fn dropping_session_releases_transport() {
    init_tracing();
    let (factory, mut peers) = MemoryFactory::channel();
    let (session, inbound) = Session::connect(&factory, SocketSettings::default()).await.unwrap();
    let mut peer = peers.recv().await.unwrap();

    let pending = session
        .push("room:lobby", "ping", json!({}), None)
        .await
        .unwrap();
    drop(session);
    drop(inbound);

    let err = pending.wait(Duration::from_secs(1)).await.expect_err("session dropped");
    assert_eq!(err.code().as_str(), "TRANSPORT");

    assert!(peer.recv().await.is_some());
    assert!(peer.recv().await.is_none());
    let mut gone = false;
    for _ in 0..50 {
        if peer.send_text("late").await.is_err() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(gone, "reader outlived the session");
}
