//! URL patterns for route mock entries.

use std::fmt;

/// Compiled URL pattern.
///
/// Globs follow Playwright's URL glob flavour: `*` and `**` both cross `/`,
/// `?` matches one character. A glob that fails to compile is matched
/// literally instead.
#[derive(Clone)]
pub enum RoutePattern {
	Glob(glob::Pattern),
	Exact(String),
	Regex(regex::Regex),
}

impl RoutePattern {
	pub fn glob(pattern: &str) -> Self {
		match glob::Pattern::new(pattern) {
			Ok(compiled) => Self::Glob(compiled),
			Err(err) => {
				tracing::debug!(pattern, error = %err, "invalid glob, matching literally");
				Self::Exact(pattern.to_string())
			}
		}
	}

	pub fn exact(url: impl Into<String>) -> Self {
		Self::Exact(url.into())
	}

	pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
		regex::Regex::new(pattern).map(Self::Regex)
	}

	pub fn is_match(&self, url: &str) -> bool {
		match self {
			Self::Glob(pattern) => pattern.matches(url),
			Self::Exact(expected) => expected == url,
			Self::Regex(re) => re.is_match(url),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::Glob(pattern) => pattern.as_str(),
			Self::Exact(url) => url,
			Self::Regex(re) => re.as_str(),
		}
	}
}

impl From<&str> for RoutePattern {
	fn from(pattern: &str) -> Self {
		Self::glob(pattern)
	}
}

impl From<String> for RoutePattern {
	fn from(pattern: String) -> Self {
		Self::glob(&pattern)
	}
}

impl From<regex::Regex> for RoutePattern {
	fn from(re: regex::Regex) -> Self {
		Self::Regex(re)
	}
}

impl fmt::Debug for RoutePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Glob(_) => write!(f, "Glob({:?})", self.as_str()),
			Self::Exact(_) => write!(f, "Exact({:?})", self.as_str()),
			Self::Regex(_) => write!(f, "Regex({:?})", self.as_str()),
		}
	}
}

impl fmt::Display for RoutePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn double_star_matches_any_prefix() {
		let stats = RoutePattern::glob("**/stats");
		assert!(stats.is_match("http://localhost:8080/wp-json/woosuite/v1/stats"));
		assert!(!stats.is_match("http://localhost:8080/wp-json/woosuite/v1/stats/extra"));
		assert!(!stats.is_match("http://localhost:8080/wp-json/woosuite/v1/stats?fresh=1"));
	}

	#[test]
	fn glob_matches_query_string_verbatim() {
		let content = RoutePattern::glob("**/content?type=product&limit=20&page=1");
		assert!(content.is_match("http://localhost:8080/wp-json/woosuite/v1/content?type=product&limit=20&page=1"));
		assert!(!content.is_match("http://localhost:8080/wp-json/woosuite/v1/content?type=product&limit=20&page=2"));
	}

	#[test]
	fn single_star_crosses_segments() {
		let assets = RoutePattern::glob("http://localhost:5173/*.js");
		assert!(assets.is_match("http://localhost:5173/assets/index-abc.js"));
		assert!(!assets.is_match("http://localhost:5173/assets/index-abc.css"));
	}

	#[test]
	fn invalid_glob_falls_back_to_exact() {
		let pattern = RoutePattern::glob("http://x/a**b");
		assert!(matches!(pattern, RoutePattern::Exact(_)));
		assert!(pattern.is_match("http://x/a**b"));
		assert!(!pattern.is_match("http://x/aZZb"));
	}

	#[test]
	fn regex_patterns() {
		let pattern = RoutePattern::regex(r"/seo/generate/\d+$").unwrap();
		assert!(pattern.is_match("http://localhost:5173/wp-json/woosuite/v1/seo/generate/12"));
		assert!(!pattern.is_match("http://localhost:5173/wp-json/woosuite/v1/seo/generate/all"));
		assert!(RoutePattern::regex("(").is_err());
	}

	#[test]
	fn exact_requires_equality() {
		let pattern = RoutePattern::exact("http://localhost/api");
		assert!(pattern.is_match("http://localhost/api"));
		assert!(!pattern.is_match("http://localhost/api/"));
		assert_eq!(pattern.to_string(), "http://localhost/api");
	}
}
