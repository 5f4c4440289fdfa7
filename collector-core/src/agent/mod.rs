//! Agent runtime: two independent tickers — one refreshes samples, the other dispatches them.

mod dispatcher;
mod sampler;

pub use dispatcher::{SendResult, dispatch};
pub use sampler::Sampler;

// crates.io
use reqwest::Client;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, config::AgentConfig};

/// Run the agent until `cancel` fires: samples are refreshed on `poll_interval` and dispatched on
/// `report_interval`, independently, matching the original two-ticker design.
pub async fn run(config: Arc<AgentConfig>, client: Arc<Client>, cancel: CancellationToken) {
	let sampler = Sampler::new();

	let poll_handle = tokio::spawn({
		let sampler = Arc::clone(&sampler);
		let config = Arc::clone(&config);
		let cancel = cancel.clone();

		async move {
			let mut ticker = tokio::time::interval(config.poll_interval);

			loop {
				tokio::select! {
					_ = ticker.tick() => sampler.refresh(),
					_ = cancel.cancelled() => return,
				}
			}
		}
	});

	let report_handle = tokio::spawn({
		let sampler = Arc::clone(&sampler);
		let config = Arc::clone(&config);
		let cancel = cancel.clone();

		async move {
			let mut ticker = tokio::time::interval(config.report_interval);

			loop {
				tokio::select! {
					_ = ticker.tick() => {
						let mut forms = sampler.stat_forms();

						forms.push(sampler.poll_count_form());

						let results = dispatch(forms, Arc::clone(&client), &config, cancel.clone()).await;
						let mut all_succeeded = true;

						for result in &results {
							if result.status == 0 {
								all_succeeded = false;

								tracing::warn!(metric = %result.id, "dispatch failed after retries");
							}
						}

						if all_succeeded {
							sampler.reset_poll_count();
						}
					},
					_ = cancel.cancelled() => return,
				}
			}
		}
	});

	let _ = tokio::join!(poll_handle, report_handle);
}
