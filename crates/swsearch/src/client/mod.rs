//! Client for the SmallWorld similarity search service.
//!
//! One [`SmallWorldClient`] owns the pooled HTTP session and the run
//! configuration; every search pipeline (submit, correlate, fetch, shape)
//! borrows both. Batches fan the pipeline out over a bounded worker pool
//! sharing that single session.

pub mod fetch;
pub mod params;
pub mod shape;
pub mod submit;
pub mod types;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, Url};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
    time::sleep,
};
use tracing::{debug, info, warn};

pub use shape::{AlignmentRecord, HitRow};
pub use types::{HitListId, SearchConfig, SearchError, SearchOptions};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("swsearch/", env!("CARGO_PKG_VERSION"));

/// Handle on the search service: pooled connections, retry policy, and the
/// shared run configuration. Cloning is cheap and clones share the pool.
#[derive(Debug, Clone)]
pub struct SmallWorldClient {
    base_url: Url,
    http: Client,
    config: Arc<SearchConfig>,
    backoff: ExponentialBuilder,
}

impl SmallWorldClient {
    /// Build a client bound to the service origin. The underlying connection
    /// pool is created once and reused by every search issued through this
    /// client; it closes when the last clone is dropped.
    pub fn new(base_url: &str, config: SearchConfig) -> Result<Self, SearchError> {
        let parsed = Url::parse(base_url)
            .map_err(|_| SearchError::InvalidBaseUrl(base_url.to_string()))?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| SearchError::request("build_client", err))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(3)
            .with_jitter();

        Ok(Self {
            base_url: parsed,
            http,
            config: Arc::new(config),
            backoff,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub(crate) fn endpoint(&self, path: &'static str) -> Result<Url, SearchError> {
        self.base_url.join(path).map_err(|err| SearchError::UrlJoin {
            path: path.to_string(),
            source: Arc::new(err),
        })
    }

    /// Issue a GET and hand back the response with the body unread. Retries
    /// transient failures (500/502, connection errors) with bounded
    /// exponential backoff; every other failure is final.
    pub(crate) async fn send_get(
        &self,
        stage: &'static str,
        url: Url,
        params: Vec<(String, String)>,
    ) -> Result<reqwest::Response, SearchError> {
        let attempt = {
            let client = self.http.clone();
            let url = url.clone();
            let params = params.clone();
            move || {
                let client = client.clone();
                let url = url.clone();
                let params = params.clone();
                async move {
                    let response = client
                        .get(url)
                        .query(&params)
                        .send()
                        .await
                        .map_err(|err| SearchError::request(stage, err))?;

                    let status = response.status();
                    if !status.is_success() {
                        return Err(SearchError::HttpStatus {
                            stage,
                            status: status.as_u16(),
                        });
                    }
                    Ok(response)
                }
            }
        };

        attempt
            .retry(self.backoff)
            .sleep(sleep)
            .when(|err: &SearchError| err.is_transient())
            .notify(|err: &SearchError, delay: Duration| {
                warn!(
                    stage,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "retrying transient request failure"
                );
            })
            .await
    }

    /// Run the full pipeline for one structure: submit, correlate, fetch,
    /// shape. An empty result set is a normal outcome, covering both "no
    /// results" submissions and the recoverable empty hit-list conditions.
    pub async fn get_molecules(&self, smiles: &str) -> Result<Vec<HitRow>, SearchError> {
        let Some(id) = submit::submit(self, smiles).await? else {
            return Ok(Vec::new());
        };

        let shaped = fetch::fetch(self, &id)
            .await
            .and_then(|table| shape::shape(&table));

        match shaped {
            Ok(rows) => {
                debug!(smiles, hlid = %id, hits = rows.len(), "search pipeline completed");
                Ok(rows)
            }
            Err(err) if err.is_no_data() => {
                debug!(smiles, hlid = %id, outcome = %err, "search produced no usable hits");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Search many structures concurrently over a fixed-size worker pool and
    /// concatenate the non-empty per-structure result sets.
    ///
    /// Ordering across inputs follows worker completion and is not
    /// deterministic; row order within one input is preserved. A pipeline
    /// that fails with a recoverable error contributes nothing to the
    /// combined set; a protocol violation aborts the whole batch.
    pub async fn search_many(
        &self,
        smiles: Vec<String>,
        options: SearchOptions,
    ) -> Result<Vec<HitRow>, SearchError> {
        if smiles.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let queried = smiles.len();
        let worker_count = options.worker_count.get().min(queried);
        let (sender, receiver) = mpsc::channel(options.channel_capacity.max(1));

        let mut join_set = spawn_workers(self.clone(), receiver, worker_count);

        for structure in smiles {
            if sender.send(structure).await.is_err() {
                // Every worker exited before the batch was fully queued;
                // surface whatever stopped them instead of the closed channel.
                while let Some(result) = join_set.join_next().await {
                    match result {
                        Ok(Err(err)) => return Err(err),
                        Ok(Ok(_)) => {}
                        Err(join_err) => return Err(to_worker_join_error(join_err)),
                    }
                }
                return Err(SearchError::ChannelClosed);
            }
        }
        drop(sender);

        let mut combined = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(Ok(rows)) => combined.extend(rows),
                Ok(Err(err)) => return Err(err),
                Err(join_err) => return Err(to_worker_join_error(join_err)),
            }
        }

        info!(
            hits = combined.len(),
            queried,
            elapsed_ms = started.elapsed().as_millis(),
            "batch search completed"
        );
        Ok(combined)
    }
}

fn spawn_workers(
    client: SmallWorldClient,
    receiver: mpsc::Receiver<String>,
    worker_count: usize,
) -> JoinSet<Result<Vec<HitRow>, SearchError>> {
    let shared_receiver = Arc::new(Mutex::new(receiver));

    let mut join_set = JoinSet::new();
    for worker_idx in 0..worker_count {
        let rx = Arc::clone(&shared_receiver);
        let client = client.clone();
        join_set.spawn(async move { run_worker(worker_idx, rx, client).await });
    }

    join_set
}

async fn run_worker(
    worker_idx: usize,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    client: SmallWorldClient,
) -> Result<Vec<HitRow>, SearchError> {
    let mut collected = Vec::new();

    loop {
        let Some(smiles) = receive_task(&receiver).await else {
            debug!(
                stage = "worker_shutdown",
                worker = worker_idx,
                "worker terminating (channel closed)"
            );
            break;
        };

        match client.get_molecules(&smiles).await {
            Ok(rows) => collected.extend(rows),
            Err(err @ SearchError::ProtocolViolation { .. }) => {
                warn!(
                    stage = "worker_error",
                    worker = worker_idx,
                    smiles,
                    error = %err,
                    "upstream broke the correlation contract"
                );
                return Err(err);
            }
            Err(err) => {
                // One flaky input must not sink the batch.
                warn!(
                    stage = "worker_error",
                    worker = worker_idx,
                    smiles,
                    error = %err,
                    "dropping failed search from combined results"
                );
            }
        }
    }

    Ok(collected)
}

async fn receive_task(receiver: &Arc<Mutex<mpsc::Receiver<String>>>) -> Option<String> {
    let mut guard = receiver.lock().await;
    guard.recv().await
}

fn to_worker_join_error(err: tokio::task::JoinError) -> SearchError {
    if err.is_cancelled() {
        SearchError::WorkerJoin {
            reason: "task cancelled",
        }
    } else if err.is_panic() {
        SearchError::WorkerJoin { reason: "panicked" }
    } else {
        SearchError::WorkerJoin {
            reason: "aborted unexpectedly",
        }
    }
}
