//! Sharing one pipeline run between concurrent requests for the same paper.
//!
//! The first request for an uncached fingerprint becomes the leader and runs
//! the pipeline on a detached task, so a client disconnect never wastes the
//! work. Requests arriving while it runs subscribe to the leader's broadcast
//! channel and receive the same outcome.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::error::{ServiceError, ServiceResult};

/// Outcome shared with followers. Errors are not `Clone`, so they travel as
/// their message and error code.
type Shared<T> = Result<Arc<T>, SharedFailure>;

#[derive(Debug, Clone)]
struct SharedFailure {
    message: String,
    code: &'static str,
}

impl From<&ServiceError> for SharedFailure {
    fn from(error: &ServiceError) -> Self {
        Self {
            message: error.to_string(),
            code: error.error_code(),
        }
    }
}

/// How a lookup was satisfied
#[derive(Debug)]
pub enum Lookup<T> {
    /// Served from the result cache
    Cached(Arc<T>),
    /// This request ran the pipeline
    Computed(Arc<T>),
    /// Another request's pipeline run produced the result
    Joined(Arc<T>),
}

enum Role<T> {
    Cached(Arc<T>),
    Leader(broadcast::Sender<Shared<T>>),
    Follower(broadcast::Receiver<Shared<T>>),
}

/// Registry of running pipelines, keyed by content fingerprint
pub struct InFlight<T> {
    flights: Arc<DashMap<String, broadcast::Sender<Shared<T>>>>,
}

/// Removes the registration when the leader task finishes or unwinds
struct FlightGuard<T> {
    flights: Arc<DashMap<String, broadcast::Sender<Shared<T>>>>,
    key: String,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        self.flights.remove(&self.key);
    }
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Send + Sync + 'static> InFlight<T> {
    /// Number of pipelines currently running
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Resolve `key` from `cache`, an already-running pipeline, or by running
    /// `pipeline` as the leader. Successful leader results are stored in
    /// `cache` before followers are released.
    pub async fn run<F>(
        &self,
        key: String,
        cache: Arc<ResultCache<Arc<T>>>,
        pipeline: F,
    ) -> ServiceResult<Lookup<T>>
    where
        F: Future<Output = ServiceResult<T>> + Send + 'static,
    {
        // The cache check happens under the registry shard lock, so a leader
        // finishing in between cannot be missed.
        let role = match self.flights.entry(key.clone()) {
            Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => match cache.get(&key) {
                Some(hit) => Role::Cached(hit),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    entry.insert(tx.clone());
                    Role::Leader(tx)
                }
            },
        };

        match role {
            Role::Cached(hit) => Ok(Lookup::Cached(hit)),
            Role::Follower(rx) => self.follow(&key, &cache, rx).await,
            Role::Leader(tx) => {
                let guard = FlightGuard {
                    flights: self.flights.clone(),
                    key: key.clone(),
                };

                let task = tokio::spawn(async move {
                    let result = pipeline.await.map(Arc::new);
                    if let Ok(value) = &result {
                        cache.insert(key, value.clone());
                    }
                    drop(guard);

                    let shared = match &result {
                        Ok(value) => Ok(value.clone()),
                        Err(e) => Err(SharedFailure::from(e)),
                    };
                    // No receivers just means nobody else asked
                    let _ = tx.send(shared);
                    result
                });

                let value = task.await.map_err(|e| ServiceError::Internal {
                    message: format!("Analysis task failed: {}", e),
                })??;
                Ok(Lookup::Computed(value))
            }
        }
    }

    async fn follow(
        &self,
        key: &str,
        cache: &ResultCache<Arc<T>>,
        mut rx: broadcast::Receiver<Shared<T>>,
    ) -> ServiceResult<Lookup<T>> {
        debug!(fingerprint = %key, "Joining in-flight analysis");

        match rx.recv().await {
            Ok(Ok(value)) => Ok(Lookup::Joined(value)),
            Ok(Err(SharedFailure { message, code })) => {
                Err(ServiceError::Analysis { message, code })
            }
            Err(e) => {
                // The leader went away without reporting; a result may still
                // have reached the cache.
                warn!(fingerprint = %key, error = %e, "In-flight analysis ended without a result");
                cache
                    .get(key)
                    .map(Lookup::Joined)
                    .ok_or_else(|| ServiceError::Internal {
                        message: "Analysis ended without a result".to_string(),
                    })
            }
        }
    }
}
