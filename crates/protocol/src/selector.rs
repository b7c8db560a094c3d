//! Constructors for Playwright selector strings.
//!
//! Scenario files carry selectors as plain strings. These helpers build the
//! common engine-prefixed forms so built-in scenarios don't hand-quote them.

/// Escapes a value for use inside a double-quoted selector attribute.
fn quote(value: &str) -> String {
	let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
	format!("\"{escaped}\"")
}

/// `role=<role>[name="<name>"]`; the accessible name matches case-insensitively as a substring.
pub fn role(role: &str, name: &str) -> String {
	format!("role={role}[name={}]", quote(name))
}

/// `text="<text>"`, exact text match.
pub fn text(text: &str) -> String {
	format!("text={}", quote(text))
}

/// `text=<text>`, case-insensitive substring match.
pub fn text_contains(text: &str) -> String {
	format!("text={text}")
}

/// Element whose placeholder contains `placeholder`, ignoring case.
pub fn placeholder(placeholder: &str) -> String {
	format!("internal:attr=[placeholder={}i]", quote(placeholder))
}

/// Form control whose label contains `label`, ignoring case.
pub fn label(label: &str) -> String {
	format!("internal:label={}i", quote(label))
}

/// `<selector>:has-text("<text>")`, narrowing to elements containing `text`.
pub fn has_text(selector: &str, text: &str) -> String {
	format!("{selector}:has-text({})", quote(text))
}

pub fn test_id(id: &str) -> String {
	format!("internal:testid=[data-testid={}s]", quote(id))
}

/// Narrows `selector` to its `n`th match (zero based).
pub fn nth(selector: &str, n: usize) -> String {
	format!("{selector} >> nth={n}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_engine_prefixed_selectors() {
		assert_eq!(role("button", "Optimize Selected"), r#"role=button[name="Optimize Selected"]"#);
		assert_eq!(text("Content Enhancer"), r#"text="Content Enhancer""#);
		assert_eq!(text_contains("Enhancer"), "text=Enhancer");
		assert_eq!(placeholder("Search"), r#"internal:attr=[placeholder="Search"i]"#);
		assert_eq!(label("Email"), r#"internal:label="Email"i"#);
		assert_eq!(has_text("aside button", "Cloud Backups"), r#"aside button:has-text("Cloud Backups")"#);
		assert_eq!(test_id("progress"), r#"internal:testid=[data-testid="progress"s]"#);
		assert_eq!(nth("textarea", 0), "textarea >> nth=0");
	}

	#[test]
	fn escapes_quotes() {
		assert_eq!(text(r#"Say "hi""#), r#"text="Say \"hi\"""#);
	}
}
