//! Runs a batch of scenarios and aggregates the report.

use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream;
use smoke_protocol::Report;

use crate::driver::Driver;
use crate::error::millis;
use crate::scenario::Scenario;

/// Runs up to `jobs` scenarios at a time; each gets its own session.
/// Results come back in input order regardless of completion order.
#[derive(Clone)]
pub struct Runner {
	driver: Driver,
	jobs: usize,
}

impl Runner {
	pub fn new(driver: Driver) -> Self {
		Self { driver, jobs: 1 }
	}

	/// Values below one are treated as one.
	pub fn with_jobs(mut self, jobs: usize) -> Self {
		self.jobs = jobs.max(1);
		self
	}

	pub fn jobs(&self) -> usize {
		self.jobs
	}

	pub async fn run(&self, scenarios: &[Scenario]) -> Report {
		let started = Instant::now();
		tracing::info!(scenarios = scenarios.len(), jobs = self.jobs, "starting run");

		let results = stream::iter(scenarios)
			.map(|scenario| self.driver.run(scenario))
			.buffered(self.jobs)
			.collect::<Vec<_>>()
			.await;

		let report = Report::new(results, millis(started.elapsed()));
		tracing::info!(
			passed = report.summary.passed,
			failed = report.summary.failed,
			errored = report.summary.errored,
			duration_ms = report.duration_ms,
			"run finished"
		);
		report
	}
}
