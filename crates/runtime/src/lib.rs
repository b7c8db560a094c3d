//! Runtime plumbing for talking to the Playwright driver.
//!
//! - **Driver discovery** ([`driver`]): locate Node.js and Playwright's `cli.js`
//! - **Server** ([`server`]): spawn and stop `node cli.js run-driver`
//! - **Transport** ([`transport`]): length-prefixed JSON over stdio pipes
//! - **Connection** ([`connection`]): request/response correlation, the object
//!   registry and per-object event streams
//!
//! ```text
//! smoke (Browser, Page, Route handles)
//!        │ Channel::send / Connection::subscribe
//! ┌──────▼──────┐
//! │ Connection  │  ids, callbacks, ObjectStore, subscribers
//! │ Transport   │  4-byte LE length + JSON
//! │ Server      │  node cli.js run-driver
//! └─────────────┘
//! ```

pub mod channel;
pub mod connection;
pub mod driver;
pub mod error;
pub mod server;
pub mod transport;

use std::sync::Arc;

pub use channel::Channel;
pub use connection::{Connection, Event, Message, ObjectInfo, ObjectStore};
pub use driver::get_driver_executable;
pub use error::{Error, Result};
pub use server::PlaywrightServer;
pub use transport::{PipeTransport, TransportParts};

/// Launches the driver, starts the connection loop and performs the
/// `initialize` handshake.
///
/// Returns the server handle, the running connection and the `Playwright`
/// root object.
pub async fn connect() -> Result<(PlaywrightServer, Arc<Connection>, Arc<ObjectInfo>)> {
	let mut server = PlaywrightServer::launch().await?;
	let (stdin, stdout) = server.take_stdio()?;

	let (transport, message_rx) = PipeTransport::new(stdin, stdout);
	let connection = Arc::new(Connection::new(transport.into_transport_parts(message_rx)));

	let runner = Arc::clone(&connection);
	tokio::spawn(async move { runner.run().await });

	let playwright = match connection.initialize().await {
		Ok(root) => root,
		Err(e) => {
			let _ = server.kill().await;
			return Err(e);
		}
	};
	Ok((server, connection, playwright))
}
