use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

use super::*;

fn frame(message: &Value) -> Vec<u8> {
	let body = serde_json::to_vec(message).unwrap();
	let mut out = (body.len() as u32).to_le_bytes().to_vec();
	out.extend_from_slice(&body);
	out
}

#[test]
fn frame_prefix_is_little_endian() {
	let bytes = frame(&json!({"a": 1}));
	let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
	assert_eq!(len, bytes.len() - 4);
	assert_eq!(bytes[1..4], [0, 0, 0]);
}

#[tokio::test]
async fn sender_writes_framed_json() {
	let (mut stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, _stdout_write) = duplex(1024);

	let (transport, _rx) = PipeTransport::new(stdin_write, stdout_read);
	let (mut sender, _receiver) = transport.into_parts();

	let message = json!({"id": 1, "guid": "", "method": "initialize", "params": {"sdkLanguage": "javascript"}});
	sender.send(message.clone()).await.unwrap();

	let mut len_buf = [0u8; 4];
	stdin_read.read_exact(&mut len_buf).await.unwrap();
	let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
	stdin_read.read_exact(&mut body).await.unwrap();

	assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), message);
}

#[tokio::test]
async fn reader_delivers_messages_in_order() {
	let (_stdin_read, stdin_write) = duplex(4096);
	let (stdout_read, mut stdout_write) = duplex(4096);

	let (mut transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let reader = tokio::spawn(async move { transport.run().await });

	let messages = [
		json!({"guid": "", "method": "__create__", "params": {"type": "Playwright", "guid": "Playwright"}}),
		json!({"id": 0, "result": {"playwright": {"guid": "Playwright"}}}),
		json!({"guid": "browser-context@1", "method": "route", "params": {"route": {"guid": "route@1"}}}),
	];
	for message in &messages {
		stdout_write.write_all(&frame(message)).await.unwrap();
	}
	stdout_write.flush().await.unwrap();

	for expected in &messages {
		assert_eq!(&rx.recv().await.unwrap(), expected);
	}

	drop(stdout_write);
	drop(rx);
	let _ = reader.await;
}

#[tokio::test]
async fn reader_handles_frames_larger_than_pipe_buffer() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(8 * 1024);

	let (mut transport, mut rx) = PipeTransport::new(stdin_write, stdout_read);
	let reader = tokio::spawn(async move { transport.run().await });

	// base64 screenshot payloads routinely exceed the pipe buffer
	let message = json!({"id": 7, "result": {"binary": "A".repeat(200_000)}});
	let bytes = frame(&message);
	let writer = tokio::spawn(async move {
		stdout_write.write_all(&bytes).await.unwrap();
		stdout_write
	});

	assert_eq!(rx.recv().await.unwrap(), message);

	drop(writer.await.unwrap());
	drop(rx);
	let _ = reader.await;
}

#[tokio::test]
async fn truncated_length_prefix_is_an_error() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	stdout_write.write_all(&[0x01, 0x02]).await.unwrap();
	drop(stdout_write);

	let err = transport.run().await.unwrap_err();
	assert!(err.to_string().contains("Failed to read length prefix"), "{err}");
}

#[tokio::test]
async fn truncated_body_is_an_error() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	stdout_write.write_all(&100u32.to_le_bytes()).await.unwrap();
	stdout_write.write_all(b"{\"id\":").await.unwrap();
	drop(stdout_write);

	let err = transport.run().await.unwrap_err();
	assert!(err.to_string().contains("Failed to read message body"), "{err}");
}

#[tokio::test]
async fn invalid_json_is_an_error() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(stdin_write, stdout_read);

	stdout_write.write_all(&3u32.to_le_bytes()).await.unwrap();
	stdout_write.write_all(b"{{{").await.unwrap();
	drop(stdout_write);

	assert!(matches!(transport.run().await, Err(Error::Json(_))));
}

#[tokio::test]
async fn reader_stops_cleanly_when_receiver_dropped() {
	let (_stdin_read, stdin_write) = duplex(1024);
	let (stdout_read, mut stdout_write) = duplex(1024);

	let (transport, rx) = PipeTransport::new(stdin_write, stdout_read);
	let (_sender, receiver) = transport.into_parts();
	drop(rx);

	stdout_write.write_all(&frame(&json!({"id": 1}))).await.unwrap();

	assert!(receiver.run().await.is_ok());
}
