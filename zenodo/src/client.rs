use lazy_static::lazy_static;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use tokio::time::Duration;

/// Transient failures (5xx, connection resets) are retried this many times.
pub const MAX_RETRIES: u32 = 3;

const USER_AGENT: &str = concat!("sylph-tax/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    static ref CLIENT: ClientWithMiddleware = build_client(MAX_RETRIES);
}

fn build_client(max_retries: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(20))
        // zenodo stalls now and then; a stalled body read should fail rather than hang
        .read_timeout(Duration::from_secs(60))
        .build()
        .expect("reqwest::Client::new()");

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// Shared HTTP client with retry middleware, built on first use.
pub fn retry_client() -> &'static ClientWithMiddleware {
    &CLIENT
}
