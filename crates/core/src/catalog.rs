//! Built-in scenarios for the WooSuite admin application.
//!
//! Each scenario carries its own base URL default (the dev server the flow
//! was written against); pass a base URL to [`builtin`] to point them all
//! somewhere else.

use serde_json::{Value, json};
use smoke_protocol::{Action, BootstrapPayload, TextMatch, selector};

use crate::mock::{InterceptedRequest, MockResponse, RouteMockTable};
use crate::scenario::Scenario;

pub const CONTENT_ENHANCER: &str = "content-enhancer";
pub const BACKUP_CHUNKS: &str = "backup-chunks";
pub const BULK_OPTIMIZE_RATE_LIMIT: &str = "bulk-optimize-rate-limit";

pub const PROPOSED_DESCRIPTION: &str = "A premium classic t-shirt made from 100% cotton.";

/// Rows the backup mock reports per table.
pub const TABLES: [(&str, u64); 2] = [("wp_options", 100), ("wp_posts", 5000)];

const DEFAULT_CHUNK_LIMIT: u64 = 1000;

pub fn names() -> [&'static str; 3] {
	[CONTENT_ENHANCER, BACKUP_CHUNKS, BULK_OPTIMIZE_RATE_LIMIT]
}

/// All built-in scenarios, optionally rebased onto `base_url`.
pub fn builtin(base_url: Option<&str>) -> Vec<Scenario> {
	vec![
		content_enhancer(base_url.unwrap_or("http://localhost:8080")),
		backup_chunks(base_url.unwrap_or("http://localhost:8081")),
		bulk_optimize_rate_limit(base_url.unwrap_or("http://localhost:5173")),
	]
}

pub fn find(name: &str, base_url: Option<&str>) -> Option<Scenario> {
	builtin(base_url).into_iter().find(|s| s.name == name)
}

fn bootstrap(base_url: &str, api_path: &str) -> BootstrapPayload {
	let base = base_url.trim_end_matches('/');
	BootstrapPayload::new(format!("{base}{api_path}"), "12345", base)
}

/// Product list proposal shows up in the Content Enhancer editor.
pub fn content_enhancer(base_url: &str) -> Scenario {
	let mut mocks = RouteMockTable::new();
	mocks
		.json("**/stats", json!({"seo_score": 50, "threats_blocked": 10, "last_backup": "Yesterday"}))
		.json(
			"**/content?type=product&limit=20&page=1",
			json!({
				"items": [{
					"id": 101,
					"name": "Classic T-Shirt",
					"description": "A nice t-shirt.",
					"shortDescription": "T-Shirt",
					"type": "product",
					"hasHistory": false,
					"proposedDescription": PROPOSED_DESCRIPTION,
				}],
				"total": 1,
				"pages": 1,
			}),
		)
		.json("**/content/categories?type=product", json!([{"id": 1, "name": "Clothing", "count": 10}]));

	Scenario::new(CONTENT_ENHANCER)
		.with_description("Content Enhancer lists mocked products and pre-fills the proposed description")
		.with_base_url(base_url)
		.with_bootstrap(bootstrap(base_url, "/wp-json/woosuite/v1"))
		.with_mocks(mocks)
		.actions([
			Action::navigate("/assets/index.html"),
			Action::wait_for("text=WooSuite AI", Some(30_000)),
			Action::click(selector::role("button", "Content Enhancer")),
			Action::wait_for(selector::placeholder("Search products..."), None),
			Action::assert_visible(selector::placeholder("Search products...")),
			Action::wait_for("textarea", None),
			Action::assert_value(selector::nth("textarea", 0), PROPOSED_DESCRIPTION),
			Action::screenshot("content_enhancer_ui.png"),
		])
}

/// Rows the chunk endpoint hands out for one request.
pub fn chunk_count(table: &str, limit: u64, offset: u64) -> u64 {
	let total = TABLES.iter().find(|(name, _)| *name == table).map_or(5000, |(_, rows)| *rows);
	limit.min(total.saturating_sub(offset))
}

fn export_chunk(request: &InterceptedRequest) -> MockResponse {
	let table = request.param_str("table").unwrap_or_default();
	let limit = request.param_u64("limit").unwrap_or(DEFAULT_CHUNK_LIMIT);
	let offset = request.param_u64("offset").unwrap_or(0);
	MockResponse::json(&json!({"success": true, "count": chunk_count(&table, limit, offset)}))
}

/// Site migration export walks every table in chunks until "Export Ready!".
pub fn backup_chunks(base_url: &str) -> Scenario {
	let tables: Vec<Value> = TABLES.iter().map(|(name, rows)| json!({"name": name, "rows": rows})).collect();

	let mut mocks = RouteMockTable::new();
	mocks
		.json(
			"**/api-mock/backup/analyze",
			json!({
				"risk": "Low",
				"summary": "System is ready for migration.",
				"recommendations": ["Backup DB", "Check PHP", "Disable caching"],
			}),
		)
		.json("**/api-mock/backup/export", json!({"success": true, "method": "php_chunked"}))
		.json("**/api-mock/backup/tables", json!({"tables": tables}))
		.respond_with("**/api-mock/backup/export/chunk", export_chunk)
		.json(
			"**/api-mock/backup/export/finalize",
			json!({"success": true, "result": {"url": "http://example.com/backup.sql", "size": "50 MB"}}),
		)
		.json("**/api-mock/stats", json!({"orders": 0, "seo_score": 50, "threats_blocked": 10}))
		.json("**/api-mock/security/status", json!({}))
		.json("**/api-mock/content?type=product&limit=*", json!({"items": [], "total": 0, "pages": 0}));

	Scenario::new(BACKUP_CHUNKS)
		.with_description("Site migration export completes over the chunked table export")
		.with_base_url(base_url)
		.with_bootstrap(bootstrap(base_url, "/api-mock"))
		.with_mocks(mocks)
		.actions([
			Action::navigate("/verification/mock_index.html"),
			Action::click(selector::has_text("aside button", "Cloud Backups")),
			Action::wait_for(selector::has_text("h2", "Backups & Migration"), None),
			Action::click(selector::role("button", "Site Migration")),
			Action::fill(selector::placeholder("livesite.com"), "new-site.com"),
			Action::click(selector::role("button", "Run Compatibility Scan")),
			Action::wait_for("text=Proceed to Export", Some(5_000)),
			Action::click("text=Proceed to Export"),
			Action::click(selector::role("button", "Generate SQL Dump")),
			Action::wait_for("text=Export Ready!", Some(10_000)),
			Action::screenshot("migration_step2_complete.png"),
		])
}

/// Bulk SEO optimisation hits a rate limit on the second item and must not
/// report completion. Progress has to reach 50% first, so the check sees a
/// stalled batch rather than one that has not started.
pub fn bulk_optimize_rate_limit(base_url: &str) -> Scenario {
	let mut mocks = RouteMockTable::new();
	mocks
		.json(
			"**/content?type=product&limit=20&page=1",
			json!({
				"items": [
					{"id": 1, "type": "product", "name": "Test Product 1", "description": "Desc 1"},
					{"id": 2, "type": "product", "name": "Test Product 2", "description": "Desc 2"},
				],
				"total": 2,
				"pages": 1,
			}),
		)
		.json("**/seo/batch-status", json!({"status": "idle"}))
		.json(
			"**/seo/generate/1",
			json!({"success": true, "data": {"title": "Optimized Title", "description": "Optimized Desc"}}),
		)
		.fulfill("**/seo/generate/2", MockResponse::text("Rate Limit").with_status(429));

	Scenario::new(BULK_OPTIMIZE_RATE_LIMIT)
		.with_description("Bulk optimisation stalls instead of completing when the API rate-limits")
		.with_base_url(base_url)
		.with_bootstrap(bootstrap(base_url, "/wp-json/woosuite/v1"))
		.with_mocks(mocks)
		.actions([
			Action::navigate("/"),
			Action::wait_for("text=Test Product 1", None),
			Action::assert_visible("text=Test Product 1"),
			Action::check(selector::nth("role=checkbox", 0)),
			Action::click(selector::role("button", "Optimize Selected")),
			Action::wait_for("text=Optimizing Selected Items...", None),
			Action::assert_visible("text=Optimizing Selected Items..."),
			Action::wait_for("text=50%", Some(10_000)),
			Action::assert_text("body", "100%", TextMatch::NotContains),
			Action::screenshot("seo_rate_limit.png"),
		])
}
