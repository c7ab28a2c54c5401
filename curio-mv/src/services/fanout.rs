//! Concurrent provider fan-out
//!
//! Invokes a requested subset of providers concurrently and races the
//! joined result against one global deadline. Providers that have not
//! completed when the deadline fires are abandoned (their tasks aborted,
//! their eventual results discarded); they are excluded from the result
//! set rather than reported as errors. The executor itself never fails:
//! an empty result set is a valid outcome and its meaning is the
//! aggregator's call.

use crate::models::ItemQuery;
use crate::providers::{execute_provider_call, ProviderResult, ValuationProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Concurrent executor over the registered providers
pub struct FanOutExecutor {
    providers: Vec<Arc<dyn ValuationProvider>>,
    deadline: Duration,
    per_call_timeout: Duration,
}

impl FanOutExecutor {
    pub fn new(
        providers: Vec<Arc<dyn ValuationProvider>>,
        deadline: Duration,
        per_call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            deadline,
            per_call_timeout,
        }
    }

    /// Names of every registered provider
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Query the selected providers concurrently under the global deadline
    ///
    /// `include` narrows the fan-out to the named providers
    /// (case-insensitive); `None` queries all of them. Each provider runs
    /// in its own task, so a hang in one cannot delay the others past the
    /// shared deadline.
    pub async fn execute(
        &self,
        query: &ItemQuery,
        include: Option<&[String]>,
    ) -> Vec<ProviderResult> {
        let request_id = Uuid::new_v4();
        let selected: Vec<Arc<dyn ValuationProvider>> = self
            .providers
            .iter()
            .filter(|provider| match include {
                Some(names) => names
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(provider.name())),
                None => true,
            })
            .cloned()
            .collect();

        if selected.is_empty() {
            tracing::warn!(
                request_id = %request_id,
                "fan-out selection matched no providers"
            );
            return Vec::new();
        }

        tracing::debug!(
            request_id = %request_id,
            providers = selected.len(),
            deadline_ms = self.deadline.as_millis() as u64,
            "starting provider fan-out"
        );

        let (tx, mut rx) = mpsc::channel(selected.len());
        let mut handles = Vec::with_capacity(selected.len());

        for provider in selected {
            let tx = tx.clone();
            let query = query.clone();
            let per_call_timeout = self.per_call_timeout;
            handles.push(tokio::spawn(async move {
                let result = execute_provider_call(
                    provider.as_ref(),
                    &query,
                    request_id,
                    "fan_out",
                    per_call_timeout,
                )
                .await;
                // Receiver may be gone if the deadline already fired.
                let _ = tx.send(result).await;
            }));
        }
        drop(tx);

        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        let mut results = Vec::new();
        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Some(result) => results.push(result),
                        // All senders done: every provider settled in time.
                        None => break,
                    }
                }
                _ = &mut deadline => {
                    // Providers that already finished still contribute:
                    // drain whatever is buffered before abandoning the rest.
                    while let Ok(result) = rx.try_recv() {
                        results.push(result);
                    }
                    let abandoned = handles.iter().filter(|h| !h.is_finished()).count();
                    tracing::warn!(
                        request_id = %request_id,
                        completed = results.len(),
                        abandoned,
                        "fan-out deadline elapsed, abandoning in-flight providers"
                    );
                    for handle in &handles {
                        handle.abort();
                    }
                    break;
                }
            }
        }

        results
    }
}
