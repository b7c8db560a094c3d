//! Length-prefixed JSON framing over the driver's stdio pipes.
//!
//! Every message in either direction is a 4-byte little-endian length
//! followed by that many bytes of UTF-8 JSON. The writer half serializes
//! outbound requests; the reader half decodes frames and forwards them to an
//! unbounded channel consumed by the connection.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Upper bound for one inbound frame. Screenshots of large pages stay well
/// below this.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Bidirectional pipe transport to the driver process.
pub struct PipeTransport {
	sender: PipeTransportSender,
	receiver: PipeTransportReceiver,
}

/// Write half: frames and sends outbound messages.
pub struct PipeTransportSender {
	stdin: BoxedWriter,
}

/// Read half: decodes inbound frames until EOF.
pub struct PipeTransportReceiver {
	stdout: BoxedReader,
	message_tx: mpsc::UnboundedSender<Value>,
}

/// Both halves plus the inbound message stream, handed to
/// [`Connection::new`](crate::connection::Connection::new).
pub struct TransportParts {
	pub sender: PipeTransportSender,
	pub receiver: PipeTransportReceiver,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

impl PipeTransport {
	/// Wraps the driver's stdin (we write) and stdout (we read).
	///
	/// Returns the transport and the receiver inbound messages are delivered to.
	pub fn new<W, R>(stdin: W, stdout: R) -> (Self, mpsc::UnboundedReceiver<Value>)
	where
		W: AsyncWrite + Send + Unpin + 'static,
		R: AsyncRead + Send + Unpin + 'static,
	{
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		let transport = Self {
			sender: PipeTransportSender { stdin: Box::new(stdin) },
			receiver: PipeTransportReceiver {
				stdout: Box::new(stdout),
				message_tx,
			},
		};
		(transport, message_rx)
	}

	pub async fn send(&mut self, message: Value) -> Result<()> {
		self.sender.send(message).await
	}

	/// Reads frames until EOF or until the message receiver is dropped.
	pub async fn run(&mut self) -> Result<()> {
		self.receiver.read_loop().await
	}

	pub fn into_parts(self) -> (PipeTransportSender, PipeTransportReceiver) {
		(self.sender, self.receiver)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		TransportParts {
			sender: self.sender,
			receiver: self.receiver,
			message_rx,
		}
	}
}

impl PipeTransportSender {
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let bytes = serde_json::to_vec(&message)?;
		let len = u32::try_from(bytes.len()).map_err(|_| Error::TransportError(format!("outbound message too large: {} bytes", bytes.len())))?;

		self.stdin
			.write_all(&len.to_le_bytes())
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write length prefix: {e}")))?;
		self.stdin
			.write_all(&bytes)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to write message body: {e}")))?;
		self.stdin.flush().await.map_err(|e| Error::TransportError(format!("Failed to flush: {e}")))?;
		Ok(())
	}
}

impl PipeTransportReceiver {
	pub async fn run(mut self) -> Result<()> {
		self.read_loop().await
	}

	async fn read_loop(&mut self) -> Result<()> {
		loop {
			let mut len_buf = [0u8; 4];
			self.stdout
				.read_exact(&mut len_buf)
				.await
				.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
			let len = u32::from_le_bytes(len_buf) as usize;
			if len > MAX_FRAME_LEN {
				return Err(Error::TransportError(format!("inbound frame of {len} bytes exceeds limit")));
			}

			let mut body = vec![0u8; len];
			self.stdout
				.read_exact(&mut body)
				.await
				.map_err(|e| Error::TransportError(format!("Failed to read message body: {e}")))?;

			let message: Value = serde_json::from_slice(&body)?;
			if self.message_tx.send(message).is_err() {
				tracing::debug!("message receiver dropped, stopping transport");
				return Ok(());
			}
		}
	}
}

#[cfg(test)]
mod tests;
