use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tether_protocol::{Envelope, ids};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::*;
use crate::error::Error;

type AgentSocket = WebSocketStream<TcpStream>;

/// Starts a one-connection agent running `script` and returns its URL.
async fn spawn_agent<F, Fut>(script: F) -> String
where
	F: FnOnce(AgentSocket) -> Fut + Send + 'static,
	Fut: Future<Output = ()> + Send + 'static,
{
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let (tcp, _) = listener.accept().await.unwrap();
		let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
		script(ws).await;
	});
	format!("ws://{addr}")
}

async fn next_envelope(ws: &mut AgentSocket) -> Envelope {
	loop {
		match ws.next().await.expect("client hung up").unwrap() {
			WsMessage::Text(text) => return Envelope::parse(&text).unwrap(),
			_ => continue,
		}
	}
}

async fn push(ws: &mut AgentSocket, frame: Value) {
	ws.send(WsMessage::Text(frame.to_string())).await.unwrap();
}

async fn drain(mut ws: AgentSocket) {
	while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test]
async fn test_replies_routed_by_message_id() {
	let url = spawn_agent(|mut ws| async move {
		let a = next_envelope(&mut ws).await;
		let b = next_envelope(&mut ws).await;
		// Answer out of order.
		for req in [b, a] {
			push(
				&mut ws,
				json!({"type": "invokeResult", "params": req.params, "messageId": req.message_id}),
			)
			.await;
		}
		drain(ws).await;
	})
	.await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();
	assert!(transport.is_open());

	let first = transport.send(Envelope::new("invoke", json!({"n": "a"}), transport.next_message_id()));
	let second = transport.send(Envelope::new("invoke", json!({"n": "b"}), transport.next_message_id()));
	let (ra, rb) = tokio::join!(first, second);

	assert_eq!(Envelope::parse(&ra.unwrap()).unwrap().params["n"], "a");
	assert_eq!(Envelope::parse(&rb.unwrap()).unwrap().params["n"], "b");
	assert!(transport.in_flight().is_empty());

	transport.close().await.unwrap();
}

#[tokio::test]
async fn test_event_frames_reach_callback() {
	let url = spawn_agent(|mut ws| async move {
		push(
			&mut ws,
			json!({"type": "AppWillTerminateWithError", "params": {"errorDetails": "boom"}, "messageId": ids::APP_WILL_TERMINATE}),
		)
		.await;
		drain(ws).await;
	})
	.await;

	let (tx, mut rx) = mpsc::unbounded_channel();
	let transport = WebSocketTransport::new(url);
	transport.set_event_callback(
		ids::APP_WILL_TERMINATE,
		Arc::new(move |raw| {
			let _ = tx.send(raw);
		}),
	);
	transport.open().await.unwrap();

	let raw = tokio::time::timeout(Duration::from_secs(5), rx.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(Envelope::parse(&raw).unwrap().params["errorDetails"], "boom");
}

#[tokio::test]
async fn test_unexpected_frame_does_not_disturb_pending_reply() {
	let url = spawn_agent(|mut ws| async move {
		let req = next_envelope(&mut ws).await;
		push(&mut ws, json!({"type": "stray", "messageId": 999})).await;
		push(&mut ws, json!({"type": "loginSuccess", "messageId": req.message_id})).await;
		drain(ws).await;
	})
	.await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();

	let raw = transport
		.send(Envelope::new("login", json!({}), transport.next_message_id()))
		.await
		.unwrap();
	assert_eq!(Envelope::parse(&raw).unwrap().kind, "loginSuccess");
}

#[tokio::test]
async fn test_peer_close_fails_pending_request() {
	let url = spawn_agent(|mut ws| async move {
		let _ = next_envelope(&mut ws).await;
		let _ = ws.close(None).await;
		drain(ws).await;
	})
	.await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();

	let result = transport
		.send(Envelope::new("invoke", json!({}), transport.next_message_id()))
		.await;
	assert!(matches!(result, Err(Error::ChannelClosed)), "got {result:?}");
	assert!(!transport.is_open());
	assert!(transport.in_flight().is_empty());
}

#[tokio::test]
async fn test_reject_all_fails_pending_send() {
	let url = spawn_agent(|mut ws| async move {
		let _ = next_envelope(&mut ws).await;
		drain(ws).await;
	})
	.await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();

	let send = transport.send(Envelope::new("invoke", json!({}), transport.next_message_id()));
	let crash = async {
		while transport.in_flight().is_empty() {
			tokio::task::yield_now().await;
		}
		transport.reject_all("EXC_BAD_ACCESS");
	};
	let (result, ()) = tokio::join!(send, crash);

	let err = result.unwrap_err();
	assert!(err.is_app_crash());
	assert_eq!(err.details(), Some("EXC_BAD_ACCESS"));
	assert!(transport.is_open());
}

#[tokio::test]
async fn test_send_before_open_is_rejected() {
	let transport = WebSocketTransport::new("ws://127.0.0.1:9");
	let result = transport.send(Envelope::new("login", json!({}), 0)).await;

	assert!(matches!(result, Err(Error::NotConnected { ref kind }) if kind == "login"));
	assert!(transport.in_flight().is_empty());
}

#[tokio::test]
async fn test_close_twice() {
	let url = spawn_agent(drain).await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();
	transport.release();
	assert!(transport.is_open(), "release leaves a live channel alone");
	transport.close().await.unwrap();

	assert!(!transport.is_open());
	assert!(matches!(transport.close().await, Err(Error::NotConnected { .. })));
}

#[tokio::test]
async fn test_open_unreachable_server() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let transport = WebSocketTransport::new(format!("ws://{addr}"));
	let err = transport.open().await.unwrap_err();
	assert!(matches!(err, Error::ConnectionFailed { .. }));
	assert!(!transport.is_open());
}

#[test]
fn test_message_ids_increment_from_zero() {
	let transport = WebSocketTransport::new("ws://127.0.0.1:9");
	assert_eq!(transport.next_message_id(), 0);
	assert_eq!(transport.next_message_id(), 1);
	assert_eq!(transport.next_message_id(), 2);
}

#[test]
fn test_router_prefers_pending_reply_over_event() {
	let router = FrameRouter::new();
	router.events().set(4, Arc::new(|_| panic!("event handler must not run")));
	let _pending = router.register(&Envelope::new("invoke", json!({}), 4)).unwrap();

	assert_eq!(router.route(r#"{"type":"invokeResult","messageId":4}"#.into()), Routed::Reply);
	assert_eq!(router.route(r#"{"type":"nope"}"#.into()), Routed::Dropped);
}

#[tokio::test]
async fn test_release_after_peer_close() {
	let url = spawn_agent(|mut ws| async move {
		let _ = ws.close(None).await;
		drain(ws).await;
	})
	.await;

	let transport = WebSocketTransport::new(url);
	transport.open().await.unwrap();
	tokio::time::timeout(Duration::from_secs(5), async {
		while transport.is_open() {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.unwrap();

	transport.release();
	assert!(matches!(transport.close().await, Err(Error::NotConnected { .. })));
}

#[test]
fn test_registration_after_reader_teardown_is_withdrawn() {
	let router = FrameRouter::new();
	let open = AtomicBool::new(true);

	// Reader finishes between the sender's open check and its registration.
	open.store(false, Ordering::SeqCst);
	router.in_flight().reset();

	let result = websocket::register_on_link(&router, &open, &Envelope::new("invoke", json!({}), 4));
	assert!(matches!(result, Err(Error::ChannelClosed)));
	assert!(router.in_flight().is_empty());
}

#[test]
fn test_registration_on_live_link_is_kept() {
	let router = FrameRouter::new();
	let open = AtomicBool::new(true);

	let _reply = websocket::register_on_link(&router, &open, &Envelope::new("invoke", json!({}), 4)).unwrap();
	assert!(router.in_flight().contains(4));
}
