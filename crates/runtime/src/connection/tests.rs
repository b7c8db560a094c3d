use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

use super::*;
use crate::transport::PipeTransport;

/// Connection plus the driver-side pipe ends: read what the client sent,
/// write what the "driver" answers.
fn create_test_connection() -> (Arc<Connection>, DuplexStream, DuplexStream) {
	let (stdin_read, stdin_write) = duplex(64 * 1024);
	let (stdout_read, stdout_write) = duplex(64 * 1024);

	let (transport, message_rx) = PipeTransport::new(stdin_write, stdout_read);
	let connection = Arc::new(Connection::new(transport.into_transport_parts(message_rx)));

	(connection, stdin_read, stdout_write)
}

async fn read_frame(pipe: &mut DuplexStream) -> Value {
	let mut len = [0u8; 4];
	pipe.read_exact(&mut len).await.unwrap();
	let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
	pipe.read_exact(&mut body).await.unwrap();
	serde_json::from_slice(&body).unwrap()
}

async fn write_frame(pipe: &mut DuplexStream, message: Value) {
	let body = serde_json::to_vec(&message).unwrap();
	pipe.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
	pipe.write_all(&body).await.unwrap();
}

fn create_event(parent: &str, type_name: &str, guid: &str, initializer: Value) -> Value {
	json!({
		"guid": parent,
		"method": "__create__",
		"params": {"type": type_name, "guid": guid, "initializer": initializer}
	})
}

#[test]
fn request_ids_increment() {
	let (connection, _, _) = create_test_connection();
	let ids: Vec<u32> = (0..3).map(|_| connection.last_id.fetch_add(1, Ordering::SeqCst)).collect();
	assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn request_serializes_with_wall_time() {
	let request = Request {
		id: 3,
		guid: Arc::from("frame@abc"),
		method: "goto".to_string(),
		params: json!({"url": "http://localhost/"}),
		metadata: Metadata::now(),
	};
	let value = serde_json::to_value(&request).unwrap();
	assert_eq!(value["guid"], "frame@abc");
	assert_eq!(value["method"], "goto");
	assert!(value["metadata"]["wallTime"].as_i64().unwrap() > 0);
}

#[test]
fn message_variants_deserialize() {
	let response: Message = serde_json::from_str(r#"{"id": 42, "result": {"value": 2}}"#).unwrap();
	assert!(matches!(response, Message::Response(Response { id: 42, .. })));

	let event: Message = serde_json::from_str(r#"{"guid": "browser-context@1", "method": "route", "params": {"route": {"guid": "route@1"}}}"#).unwrap();
	match event {
		Message::Event(event) => {
			assert_eq!(&*event.guid, "browser-context@1");
			assert_eq!(event.params["route"]["guid"], "route@1");
		}
		other => panic!("expected event, got {other:?}"),
	}
}

#[test]
fn dispatch_completes_callback_with_remote_error() {
	let (connection, _, _) = create_test_connection();
	let (tx, mut rx) = oneshot::channel();
	connection.callbacks.lock().insert(5, tx);

	connection
		.dispatch(Message::Response(Response {
			id: 5,
			result: None,
			error: Some(ErrorWrapper {
				error: ErrorPayload {
					message: "Timeout 100ms exceeded.".to_string(),
					name: Some("TimeoutError".to_string()),
					stack: None,
				},
			}),
		}))
		.unwrap();

	let err = rx.try_recv().unwrap().unwrap_err();
	assert!(err.is_timeout(), "{err:?}");
}

#[test]
fn dispatch_rejects_unknown_response_id() {
	let (connection, _, _) = create_test_connection();
	let err = connection
		.dispatch(Message::Response(Response {
			id: 99,
			result: Some(Value::Null),
			error: None,
		}))
		.unwrap_err();
	assert!(matches!(err, Error::ProtocolError(_)));
}

#[test]
fn registry_tracks_create_adopt_dispose() {
	let (connection, _, _) = create_test_connection();
	let dispatch = |v: Value| connection.dispatch(serde_json::from_value(v).unwrap()).unwrap();

	dispatch(create_event("browser@1", "BrowserContext", "browser-context@1", json!({})));
	dispatch(create_event("browser-context@1", "Page", "page@1", json!({"mainFrame": {"guid": "frame@1"}})));
	dispatch(create_event("page@1", "Frame", "frame@1", json!({"url": "about:blank"})));
	dispatch(create_event("browser-context@1", "Request", "request@1", json!({"url": "http://x/"})));
	dispatch(json!({"guid": "page@1", "method": "__adopt__", "params": {"guid": "request@1"}}));

	assert_eq!(&*connection.objects().try_get("request@1").unwrap().parent, "page@1");
	assert_eq!(connection.objects().try_get("page@1").unwrap().child_guid("mainFrame"), Some("frame@1"));

	dispatch(json!({"guid": "browser-context@1", "method": "__dispose__", "params": {}}));
	assert!(connection.objects().is_empty());
}

#[tokio::test]
async fn subscribers_receive_events_until_dispose() {
	let (connection, _, _) = create_test_connection();
	connection.dispatch(serde_json::from_value(create_event("browser@1", "BrowserContext", "browser-context@1", json!({}))).unwrap()).unwrap();
	let mut events = connection.subscribe("browser-context@1");

	connection
		.dispatch(serde_json::from_value(json!({"guid": "browser-context@1", "method": "route", "params": {"route": {"guid": "route@1"}}})).unwrap())
		.unwrap();
	connection
		.dispatch(serde_json::from_value(json!({"guid": "page@9", "method": "console", "params": {}})).unwrap())
		.unwrap();

	let event = events.recv().await.unwrap();
	assert_eq!(event.method, "route");

	connection
		.dispatch(serde_json::from_value(json!({"guid": "browser-context@1", "method": "__dispose__", "params": {}})).unwrap())
		.unwrap();
	assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn round_trip_over_pipes() {
	let (connection, mut driver_in, mut driver_out) = create_test_connection();
	let run = {
		let connection = connection.clone();
		tokio::spawn(async move { connection.run().await })
	};

	let driver = tokio::spawn(async move {
		let request = read_frame(&mut driver_in).await;
		assert_eq!(request["method"], "initialize");
		assert_eq!(request["guid"], "");
		assert_eq!(request["params"]["sdkLanguage"], "javascript");

		write_frame(&mut driver_out, create_event("", "Playwright", "Playwright", json!({"chromium": {"guid": "browser-type@1"}}))).await;
		write_frame(&mut driver_out, json!({"id": request["id"], "result": {"playwright": {"guid": "Playwright"}}})).await;
		(driver_in, driver_out)
	});

	let playwright = connection.initialize().await.unwrap();
	assert_eq!(playwright.type_name, "Playwright");
	assert_eq!(playwright.child_guid("chromium"), Some("browser-type@1"));

	let (driver_in, driver_out) = driver.await.unwrap();
	drop(driver_out);
	drop(driver_in);
	run.await.unwrap();
}

#[tokio::test]
async fn pending_requests_fail_when_driver_exits() {
	let (connection, _driver_in, driver_out) = create_test_connection();
	let run = {
		let connection = connection.clone();
		tokio::spawn(async move { connection.run().await })
	};

	let request = {
		let connection = connection.clone();
		tokio::spawn(async move { connection.send_message("page@1", "screenshot", json!({})).await })
	};
	while connection.callbacks.lock().is_empty() {
		tokio::task::yield_now().await;
	}
	drop(driver_out);

	let err = request.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::ChannelClosed), "{err:?}");
	run.await.unwrap();
}

#[tokio::test]
async fn dropped_request_removes_callback() {
	let (connection, _driver_in, _driver_out) = create_test_connection();
	let result = tokio::time::timeout(Duration::from_millis(10), connection.send_message("page@1", "title", json!({}))).await;
	assert!(result.is_err());
	assert!(connection.callbacks.lock().is_empty());
}

#[test]
fn protocol_error_defaults_name() {
	let err = parse_protocol_error(ErrorPayload {
		message: "boom".to_string(),
		name: None,
		stack: Some("at x".to_string()),
	});
	match err {
		Error::Remote { name, message, stack } => {
			assert_eq!(name, "Error");
			assert_eq!(message, "boom");
			assert_eq!(stack.as_deref(), Some("at x"));
		}
		other => panic!("expected remote error, got {other:?}"),
	}
}
