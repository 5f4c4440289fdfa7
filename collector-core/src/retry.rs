//! Fixed-schedule retry helper shared by the agent dispatcher and the server's store service.

// std
use std::future::Future;
// crates.io
use tokio::time;
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Backoff windows applied after the 1st, 2nd and 3rd failed attempts.
const BACKOFF: [Duration; 3] = [Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(5)];

/// Call `op` once, then retry up to three more times on failure, sleeping 1s/3s/5s between
/// attempts. Returns the last error if every attempt fails.
///
/// Unlike a fixed `std::thread::sleep` loop, the backoff sleep races a [`CancellationToken`] so a
/// shutdown signal interrupts a pending retry instead of blocking it to completion.
pub async fn retry<F, Fut, T, E>(cancel: &CancellationToken, mut op: F) -> std::result::Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = std::result::Result<T, E>>,
{
	let mut last_err = match op().await {
		Ok(value) => return Ok(value),
		Err(err) => err,
	};

	for delay in BACKOFF {
		tokio::select! {
			_ = time::sleep(delay) => {},
			_ = cancel.cancelled() => return Err(last_err),
		}

		match op().await {
			Ok(value) => return Ok(value),
			Err(err) => last_err = err,
		}
	}

	Err(last_err)
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU32, Ordering};
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn retries_until_success() {
		let attempts = AtomicU32::new(0);
		let cancel = CancellationToken::new();
		let result: std::result::Result<(), &str> = retry(&cancel, || {
			let n = attempts.fetch_add(1, Ordering::SeqCst);

			async move { if n < 2 { Err("not yet") } else { Ok(()) } }
		})
		.await;

		assert!(result.is_ok());
		assert_eq!(attempts.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn gives_up_after_four_attempts() {
		let attempts = AtomicU32::new(0);
		let cancel = CancellationToken::new();
		let result: std::result::Result<(), &str> = retry(&cancel, || {
			attempts.fetch_add(1, Ordering::SeqCst);

			async { Err("always fails") }
		})
		.await;

		assert_eq!(result, Err("always fails"));
		assert_eq!(attempts.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn cancellation_short_circuits_the_wait() {
		let cancel = CancellationToken::new();
		let cancel_clone = cancel.clone();

		cancel.cancel();

		let result: std::result::Result<(), &str> =
			retry(&cancel_clone, || async { Err("down") }).await;

		assert_eq!(result, Err("down"));
	}
}
