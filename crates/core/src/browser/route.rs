//! Answering intercepted routes from a [`RouteMockTable`](crate::mock::RouteMockTable).

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use smoke_runtime::{Channel, Connection, ObjectInfo};

use crate::error::Result;
use crate::mock::{InterceptedRequest, Resolution, RouteMockTable};

/// Builds the responder-facing view of a `Request` object's initializer.
pub fn intercepted_request(request: &ObjectInfo) -> InterceptedRequest {
	let init = &request.initializer;
	let text = |field: &str| init.get(field).and_then(Value::as_str).unwrap_or_default().to_string();

	let headers = init
		.get("headers")
		.and_then(Value::as_array)
		.map(|headers| {
			headers
				.iter()
				.filter_map(|h| Some((h.get("name")?.as_str()?.to_string(), h.get("value")?.as_str()?.to_string())))
				.collect()
		})
		.unwrap_or_default();

	let post_data = init.get("postData").and_then(Value::as_str).and_then(|encoded| BASE64.decode(encoded).ok());

	InterceptedRequest {
		method: text("method"),
		url: text("url"),
		headers,
		post_data,
	}
}

/// Sends the protocol call that carries out `resolution` on a route.
pub async fn apply_resolution(route: &Channel, resolution: Resolution) -> Result<()> {
	match resolution {
		Resolution::Fulfill(response) => {
			let mut headers = vec![json!({"name": "content-type", "value": response.content_type()})];
			headers.extend(response.headers().iter().map(|(name, value)| json!({"name": name, "value": value})));
			route
				.send_no_result(
					"fulfill",
					json!({
						"status": response.status_code(),
						"headers": headers,
						"body": BASE64.encode(response.body()),
						"isBase64": true,
					}),
				)
				.await?;
		}
		Resolution::Passthrough => route.send_no_result("continue", json!({"isFallback": false})).await?,
		Resolution::Abort(code) => route.send_no_result("abort", json!({"errorCode": code})).await?,
	}
	Ok(())
}

/// Handles one `route` event: looks up the request, resolves it against
/// `mocks` and answers the route.
pub(crate) async fn handle_route(connection: Arc<Connection>, route_guid: String, mocks: Arc<RouteMockTable>) -> Result<()> {
	let route = connection.wait_for_object(&route_guid).await?;
	let request_guid = route
		.child_guid("request")
		.ok_or_else(|| smoke_runtime::Error::ProtocolError(format!("route {route_guid} has no request")))?;
	let request = intercepted_request(&*connection.wait_for_object(request_guid).await?);

	let resolution = mocks.resolve(&request);
	tracing::trace!(method = %request.method, url = %request.url, ?resolution, "route resolved");
	apply_resolution(&Channel::new(route_guid, connection), resolution).await
}
