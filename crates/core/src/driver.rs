//! Scenario driver.
//!
//! [`Driver::run`] takes one scenario from `Pending` to a terminal state:
//! it opens an isolated session with the bootstrap payload and a fresh copy
//! of the mock table, executes the actions strictly in order, stops at the
//! first failing step, captures a closing screenshot and closes the
//! session. Every path produces a [`ScenarioResult`]; nothing here returns
//! an error to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use smoke_protocol::{Action, BootstrapPayload, DialogPolicy, ScenarioResult, ScenarioState, StepRecord, UnmatchedPolicy, Viewport};
use tracing::{debug, error, info, warn};

use crate::assert;
use crate::error::{Error, Result, millis};
use crate::scenario::Scenario;
use crate::session::{PageSession, SessionConfig, SessionFactory};

/// Slack granted on top of a wait's own timeout before the driver gives up
/// on the browser answering at all.
pub const WAIT_GRACE: Duration = Duration::from_secs(2);

pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings shared by every scenario of a run.
#[derive(Debug, Clone)]
pub struct Environment {
	/// Used when a scenario has no base URL of its own.
	pub base_url: Option<String>,
	/// Used when a scenario has no viewport of its own.
	pub viewport: Viewport,
	/// Merged over each scenario's payload; set fields win.
	pub bootstrap: Option<BootstrapPayload>,
	pub artifacts_dir: PathBuf,
	/// Bound for element actions, navigation and waits without their own timeout.
	pub action_timeout: Duration,
	/// Budget for scenarios without their own `timeoutMs`.
	pub scenario_timeout: Duration,
	/// Reject element actions whose selector matches more than one element.
	pub strict_selectors: bool,
	/// Overrides every scenario's unmatched-request policy.
	pub unmatched: Option<UnmatchedPolicy>,
	pub dialogs: DialogPolicy,
}

impl Default for Environment {
	fn default() -> Self {
		Self {
			base_url: None,
			viewport: Viewport::default(),
			bootstrap: None,
			artifacts_dir: PathBuf::from("artifacts"),
			action_timeout: DEFAULT_ACTION_TIMEOUT,
			scenario_timeout: DEFAULT_SCENARIO_TIMEOUT,
			strict_selectors: true,
			unmatched: None,
			dialogs: DialogPolicy::Accept,
		}
	}
}

impl Environment {
	pub fn artifact_path(&self, path: &Path) -> PathBuf {
		if path.is_absolute() { path.to_path_buf() } else { self.artifacts_dir.join(path) }
	}

	/// Resolves `url` against the scenario's base URL, then ours.
	pub fn resolve_url(&self, scenario: &Scenario, url: &str) -> Result<String> {
		if url::Url::parse(url).is_ok() {
			return Ok(url.to_string());
		}
		let base = scenario
			.base_url
			.as_deref()
			.or(self.base_url.as_deref())
			.ok_or_else(|| Error::invalid(format!("relative url {url:?} needs a base url")))?;
		let base = url::Url::parse(base).map_err(|e| Error::invalid(format!("invalid base url {base:?}: {e}")))?;
		base.join(url)
			.map(String::from)
			.map_err(|e| Error::invalid(format!("cannot resolve {url:?} against {base}: {e}")))
	}

	fn session_config(&self, scenario: &Scenario) -> SessionConfig {
		let bootstrap = match (&scenario.bootstrap, &self.bootstrap) {
			(Some(own), Some(overrides)) => Some(own.clone().merged(overrides)),
			(Some(own), None) => Some(own.clone()),
			(None, shared) => shared.clone(),
		};
		let unmatched = self.unmatched.or(scenario.unmatched).unwrap_or(scenario.mocks.unmatched());
		SessionConfig {
			viewport: scenario.viewport.unwrap_or(self.viewport),
			bootstrap,
			mocks: scenario.mocks.clone().with_unmatched(unmatched),
			dialogs: self.dialogs,
			action_timeout: self.action_timeout,
		}
	}
}

/// Book-keeping for one scenario run.
struct Run<'a> {
	scenario: &'a Scenario,
	state: ScenarioState,
	steps: Vec<StepRecord>,
	artifacts: Vec<PathBuf>,
	/// Step in flight, with its start time.
	current: Option<(usize, Instant)>,
}

impl<'a> Run<'a> {
	fn new(scenario: &'a Scenario) -> Self {
		Self {
			scenario,
			state: ScenarioState::Pending,
			steps: Vec::with_capacity(scenario.actions.len()),
			artifacts: Vec::new(),
			current: None,
		}
	}

	fn transition(&mut self, next: ScenarioState) {
		if self.state.can_transition_to(next) {
			debug!(scenario = %self.scenario.name, from = %self.state, to = %next, "state change");
			self.state = next;
		} else {
			error!(scenario = %self.scenario.name, from = %self.state, to = %next, "rejected state transition");
		}
	}

	/// Records the step that was cut off, then marks the rest skipped.
	fn close_steps(&mut self, interruption: Option<&Error>) {
		if let (Some((index, started)), Some(err)) = (self.current.take(), interruption) {
			let label = self.scenario.actions[index].label();
			self.steps.push(StepRecord::failed(index, label, elapsed_ms(started), err.to_string()));
		}
		for index in self.steps.len()..self.scenario.actions.len() {
			self.steps.push(StepRecord::skipped(index, self.scenario.actions[index].label()));
		}
	}

	fn finish(mut self, outcome: Option<Error>, started: Instant) -> ScenarioResult {
		let terminal = outcome.as_ref().map_or(ScenarioState::Passed, Error::disposition);
		self.transition(terminal);
		let duration_ms = elapsed_ms(started);
		let name = self.scenario.name.clone();
		match outcome {
			None => {
				info!(scenario = %name, duration_ms, "scenario passed");
				ScenarioResult::passed(name, self.steps, self.artifacts, duration_ms)
			}
			Some(err) => {
				warn!(scenario = %name, state = %terminal, error = %err, duration_ms, "scenario stopped");
				ScenarioResult::stopped(name, err.kind(), err.to_string(), self.steps, self.artifacts, duration_ms)
			}
		}
	}
}

fn elapsed_ms(since: Instant) -> u64 {
	millis(since.elapsed())
}

/// Runs scenarios against sessions from one factory.
#[derive(Clone)]
pub struct Driver {
	factory: Arc<dyn SessionFactory>,
	env: Environment,
}

impl Driver {
	pub fn new(factory: Arc<dyn SessionFactory>, env: Environment) -> Self {
		Self { factory, env }
	}

	pub fn environment(&self) -> &Environment {
		&self.env
	}

	pub async fn run(&self, scenario: &Scenario) -> ScenarioResult {
		let started = Instant::now();
		let mut run = Run::new(scenario);
		info!(scenario = %scenario.name, actions = scenario.actions.len(), "scenario started");

		// The budget covers opening the session as well as the actions.
		let budget = scenario.timeout.unwrap_or(self.env.scenario_timeout);
		let deadline = tokio::time::Instant::now() + budget;
		let exceeded = || Error::BudgetExceeded { budget_ms: millis(budget) };

		let opened = tokio::time::timeout_at(deadline, self.factory.open(self.env.session_config(scenario))).await;
		let session = match opened {
			Ok(Ok(session)) => session,
			Ok(Err(err)) => {
				run.close_steps(None);
				return run.finish(Some(err), started);
			}
			Err(_) => {
				run.close_steps(None);
				return run.finish(Some(exceeded()), started);
			}
		};
		run.transition(ScenarioState::Running);

		let outcome = match tokio::time::timeout_at(deadline, self.execute(&*session, &mut run)).await {
			Ok(Ok(())) => None,
			Ok(Err(err)) => Some(err),
			Err(_) => Some(exceeded()),
		};
		run.close_steps(outcome.as_ref());

		self.closing_screenshot(&*session, &mut run, outcome.is_some()).await;
		match tokio::time::timeout(self.env.action_timeout + WAIT_GRACE, session.close()).await {
			Ok(Ok(())) => {}
			Ok(Err(err)) => warn!(scenario = %scenario.name, error = %err, "failed to close session"),
			Err(_) => warn!(scenario = %scenario.name, "session close timed out"),
		}
		run.finish(outcome, started)
	}

	async fn execute(&self, session: &dyn PageSession, run: &mut Run<'_>) -> Result<()> {
		let scenario = run.scenario;
		for (index, action) in scenario.actions.iter().enumerate() {
			let started = Instant::now();
			run.current = Some((index, started));
			debug!(scenario = %scenario.name, step = index + 1, action = %action.label(), "executing step");

			let result = self.perform(session, scenario, action).await;
			run.current = None;
			match result {
				Ok(artifact) => {
					run.artifacts.extend(artifact);
					run.steps.push(StepRecord::passed(index, action.label(), elapsed_ms(started)));
				}
				Err(err) => {
					run.steps.push(StepRecord::failed(index, action.label(), elapsed_ms(started), err.to_string()));
					return Err(err);
				}
			}
		}
		Ok(())
	}

	/// Performs one action. Returns the artifact it wrote, if any.
	async fn perform(&self, session: &dyn PageSession, scenario: &Scenario, action: &Action) -> Result<Option<PathBuf>> {
		let timeout = self.env.action_timeout;
		match action {
			Action::Navigate { url } => {
				let url = self.env.resolve_url(scenario, url)?;
				session.goto(&url, timeout).await?;
			}
			Action::Click { selector } => {
				let target = self.resolve_target(session, selector).await?;
				session.click(&target, timeout).await?;
			}
			Action::Fill { selector, value } => {
				let target = self.resolve_target(session, selector).await?;
				session.fill(&target, value, timeout).await?;
			}
			Action::SelectOption { selector, value } => {
				let target = self.resolve_target(session, selector).await?;
				session.select_option(&target, value, timeout).await?;
			}
			Action::Check { selector } => {
				let target = self.resolve_target(session, selector).await?;
				session.check(&target, timeout).await?;
			}
			Action::WaitForSelector { selector, timeout_ms } => {
				let wait = timeout_ms.map_or(timeout, Duration::from_millis);
				bounded_wait(session, selector, wait).await?;
			}
			Action::Pause { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
			Action::Screenshot { path } => {
				let path = self.env.artifact_path(path);
				session.screenshot(&path).await?;
				return Ok(Some(path));
			}
			assertion => assert::evaluate(session, assertion).await?,
		}
		Ok(None)
	}

	/// Selector an element action should use.
	///
	/// A selector matching nothing gets one bounded wait to appear. More
	/// than one match is an error under strict selectors; otherwise the
	/// first match is used.
	async fn resolve_target(&self, session: &dyn PageSession, selector: &str) -> Result<String> {
		let mut count = session.count(selector).await?;
		if count == 0 {
			match bounded_wait(session, selector, self.env.action_timeout).await {
				Ok(()) => count = session.count(selector).await?,
				Err(Error::Timeout { .. }) => {}
				Err(err) => return Err(err),
			}
		}
		match count {
			0 => Err(Error::ElementNotFound {
				selector: selector.to_string(),
			}),
			1 => Ok(selector.to_string()),
			n if self.env.strict_selectors => Err(Error::ElementAmbiguous {
				selector: selector.to_string(),
				count: n,
			}),
			n => {
				debug!(selector, matches = n, "acting on first match");
				Ok(smoke_protocol::selector::nth(selector, 0))
			}
		}
	}

	/// `<slug>-failure.png` after a failure, `<slug>.png` after a pass
	/// unless the scenario ended on its own screenshot. Never changes the
	/// outcome.
	async fn closing_screenshot(&self, session: &dyn PageSession, run: &mut Run<'_>, failed: bool) {
		let scenario = run.scenario;
		let file = if failed {
			format!("{}-failure.png", scenario.slug())
		} else if matches!(scenario.actions.last(), Some(Action::Screenshot { .. })) {
			return;
		} else {
			format!("{}.png", scenario.slug())
		};
		let path = self.env.artifacts_dir.join(file);

		match tokio::time::timeout(self.env.action_timeout + WAIT_GRACE, session.screenshot(&path)).await {
			Ok(Ok(())) => run.artifacts.push(path),
			Ok(Err(err)) => warn!(scenario = %scenario.name, path = %path.display(), error = %err, "closing screenshot failed"),
			Err(_) => warn!(scenario = %scenario.name, path = %path.display(), "closing screenshot timed out"),
		}
	}
}

/// Waits for `selector` to be visible, giving up `WAIT_GRACE` after
/// `timeout` even if the browser never answers.
async fn bounded_wait(session: &dyn PageSession, selector: &str, timeout: Duration) -> Result<()> {
	match tokio::time::timeout(timeout + WAIT_GRACE, session.wait_for_selector(selector, timeout)).await {
		Ok(result) => result,
		Err(_) => Err(Error::Timeout {
			what: selector.to_string(),
			timeout_ms: millis(timeout),
		}),
	}
}
