//! DOM assertions.
//!
//! Each check looks at the page exactly once; there is no retrying. Use a
//! `waitForSelector` action first when the page needs time to settle.

use smoke_protocol::{Action, TextMatch};

use crate::error::{Error, Result};
use crate::session::PageSession;

pub async fn assert_visible(session: &dyn PageSession, selector: &str) -> Result<()> {
	if session.is_visible(selector).await? {
		Ok(())
	} else {
		Err(Error::assertion(selector, "expected element to be visible"))
	}
}

/// Passes when nothing matches or the first match is not visible.
pub async fn assert_hidden(session: &dyn PageSession, selector: &str) -> Result<()> {
	if session.is_visible(selector).await? {
		Err(Error::assertion(selector, "expected element to be hidden"))
	} else {
		Ok(())
	}
}

pub async fn assert_text(session: &dyn PageSession, selector: &str, expected: &str, mode: TextMatch) -> Result<()> {
	require_element(session, selector).await?;
	let actual = session.text_content(selector).await?.unwrap_or_default();
	if mode.matches(&actual, expected) {
		Ok(())
	} else {
		Err(Error::assertion(selector, format!("expected text to {mode} {expected:?}, got {:?}", actual.trim())))
	}
}

pub async fn assert_attribute(session: &dyn PageSession, selector: &str, name: &str, expected: &str) -> Result<()> {
	require_element(session, selector).await?;
	match session.attribute(selector, name).await? {
		Some(actual) if actual == expected => Ok(()),
		Some(actual) => Err(Error::assertion(selector, format!("expected [{name}] to equal {expected:?}, got {actual:?}"))),
		None => Err(Error::assertion(selector, format!("expected [{name}] to equal {expected:?}, attribute is missing"))),
	}
}

pub async fn assert_value(session: &dyn PageSession, selector: &str, expected: &str) -> Result<()> {
	require_element(session, selector).await?;
	let actual = session.input_value(selector).await?;
	if actual == expected {
		Ok(())
	} else {
		Err(Error::assertion(selector, format!("expected value to equal {expected:?}, got {actual:?}")))
	}
}

/// Evaluates an assertion action. Non-assertions are rejected.
pub async fn evaluate(session: &dyn PageSession, action: &Action) -> Result<()> {
	match action {
		Action::AssertVisible { selector } => assert_visible(session, selector).await,
		Action::AssertHidden { selector } => assert_hidden(session, selector).await,
		Action::AssertText { selector, expected, mode } => assert_text(session, selector, expected, *mode).await,
		Action::AssertAttribute { selector, name, expected } => assert_attribute(session, selector, name, expected).await,
		Action::AssertValue { selector, expected } => assert_value(session, selector, expected).await,
		other => Err(Error::invalid(format!("{} is not an assertion", other.kind()))),
	}
}

async fn require_element(session: &dyn PageSession, selector: &str) -> Result<()> {
	if session.count(selector).await? == 0 {
		return Err(Error::ElementNotFound {
			selector: selector.to_string(),
		});
	}
	Ok(())
}
