use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::core::prober::UrlProber;
use crate::core::result_aggregator::ResultAggregator;
use crate::core::target_manager::TargetManager;
use crate::core::{ProbeOutcome, Target};
use crate::SinkRef;

/// Bounded worker pool that probes every target once.
///
/// The engine:
/// 1. Puts all targets, tagged with their input position, on a shared queue
/// 2. Spawns `concurrency_limit` workers (fewer if there are fewer targets)
/// 3. Each worker claims a target, probes it, and sends `(index, outcome)` back
/// 4. The aggregator slots each outcome by index and releases them in input order
pub struct ScanEngine {
    prober: Arc<UrlProber>,
    concurrency_limit: usize,
    sink: SinkRef,
}

impl ScanEngine {
    /// Creates a new `ScanEngine`. A limit of 0 is treated as 1.
    pub fn new(prober: Arc<UrlProber>, concurrency_limit: usize, sink: SinkRef) -> Self {
        Self {
            prober,
            concurrency_limit: concurrency_limit.max(1),
            sink,
        }
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Probes all targets and returns one outcome per target, in input order.
    pub async fn run(&self, targets: Vec<Target>) -> Vec<ProbeOutcome> {
        match self.run_streaming(targets, |_| Ok::<(), Infallible>(())).await {
            Ok(outcomes) => outcomes,
            Err(never) => match never {},
        }
    }

    /// Like `run`, but hands each outcome to `on_ready` as soon as it and
    /// every outcome before it are available. An error from `on_ready`
    /// aborts outstanding workers and is returned as is.
    pub async fn run_streaming<F, E>(
        &self,
        targets: Vec<Target>,
        mut on_ready: F,
    ) -> Result<Vec<ProbeOutcome>, E>
    where
        F: FnMut(&ProbeOutcome) -> Result<(), E>,
    {
        let urls: Vec<String> = targets.iter().map(|t| t.as_str().to_string()).collect();
        let queue = Arc::new(TargetManager::new(targets));
        let total = queue.total();
        let workers = self.concurrency_limit.min(total);

        info!("Probing {} target(s) with {} worker(s)", total, workers);

        let (result_tx, mut result_rx) = mpsc::channel::<(usize, ProbeOutcome)>(workers.max(1) * 2);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let prober = Arc::clone(&self.prober);
            let tx = result_tx.clone();

            handles.push(tokio::spawn(async move {
                while let Some((index, target)) = queue.next().await {
                    let url = target.as_str().to_string();
                    let outcome = match AssertUnwindSafe(prober.probe(target)).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(payload) => {
                            let reason = panic_reason(payload.as_ref());
                            warn!("worker {} panicked on {}: {}", worker_id, url, reason);
                            ProbeOutcome::error(url, format!("worker aborted: {}", reason))
                        }
                    };
                    if tx.send((index, outcome)).await.is_err() {
                        debug!("worker {} stopping, collector gone", worker_id);
                        break;
                    }
                }
            }));
        }

        drop(result_tx);

        let mut aggregator = ResultAggregator::new(total);
        let mut completed = 0;

        while let Some((index, outcome)) = result_rx.recv().await {
            completed += 1;
            self.sink.on_outcome(&outcome);
            self.sink.on_progress("Probing", completed, total);
            aggregator.insert(index, outcome);

            while let Some(ready) = aggregator.next_ready() {
                if let Err(e) = on_ready(ready) {
                    warn!("report aborted at row {} of {}", aggregator.released(), total);
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(e);
                }
            }
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("worker task failed: {}", e);
            }
        }

        let lost = aggregator.fill_missing(|index| {
            ProbeOutcome::error(urls[index].clone(), "worker aborted before reporting a result")
        });
        if lost > 0 {
            self.sink.on_log("warn", &format!("[!] {} target(s) lost to aborted workers", lost));
        }

        while let Some(ready) = aggregator.next_ready() {
            on_ready(ready)?;
        }

        Ok(aggregator.into_outcomes())
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FlawLabel, ProbeStatus};
    use crate::http::{FetchedResponse, Transport, TransportError};
    use crate::SilentSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fake transport keyed on the URL path: `/status/<code>`, `/refused`,
    /// `/panic`, anything else is a 200 with the path as body. Later
    /// `?delay=<ms>` sleeps before answering.
    #[derive(Default)]
    struct ScriptedTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<FetchedResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let (path, delay) = match url.split_once("?delay=") {
                Some((path, ms)) => (path, ms.parse().unwrap_or(0)),
                None => (url, 0),
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if path.ends_with("/panic") {
                panic!("transport blew up");
            }
            if path.ends_with("/refused") {
                return Err(TransportError::new("connection refused"));
            }
            if let Some((_, code)) = path.rsplit_once("/status/") {
                return Ok(FetchedResponse::new(code.parse().unwrap_or(500), ""));
            }
            Ok(FetchedResponse::new(200, path))
        }
    }

    fn engine(transport: Arc<ScriptedTransport>, limit: usize) -> ScanEngine {
        let prober = Arc::new(UrlProber::new(transport));
        ScanEngine::new(prober, limit, SilentSink::new_ref())
    }

    fn targets(urls: &[String]) -> Vec<Target> {
        urls.iter().map(|u| Target::new(u.as_str())).collect()
    }

    fn mixed_urls(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| match i % 4 {
                0 => format!("http://t.test/{}/status/404?delay={}", i, (n - i) * 3),
                1 => format!("http://t.test/{}/refused?delay={}", i, (n - i) * 2),
                2 => format!("http://t.test/{}/eval(\"x\")?delay={}", i, (n - i) * 3),
                _ => format!("http://t.test/{}/clean.js?delay={}", i, i),
            })
            .collect()
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let engine = engine(Arc::new(ScriptedTransport::default()), 0);
        assert_eq!(engine.concurrency_limit(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_report() {
        let outcomes = engine(Arc::new(ScriptedTransport::default()), 4).run(Vec::new()).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcomes_keep_input_positions() {
        let urls = mixed_urls(16);
        for limit in 1..=urls.len() {
            let outcomes = engine(Arc::new(ScriptedTransport::default()), limit)
                .run(targets(&urls))
                .await;

            assert_eq!(outcomes.len(), urls.len());
            for (outcome, url) in outcomes.iter().zip(&urls) {
                assert_eq!(&outcome.url, url);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sequential_and_parallel_runs_match() {
        let urls = mixed_urls(12);
        let sequential = engine(Arc::new(ScriptedTransport::default()), 1).run(targets(&urls)).await;
        let parallel = engine(Arc::new(ScriptedTransport::default()), 8).run(targets(&urls)).await;

        assert_eq!(sequential, parallel);
        assert_eq!(sequential[0].status, ProbeStatus::Http(404));
        assert_eq!(sequential[1].status, ProbeStatus::Error("connection refused".to_string()));
        assert_eq!(sequential[2].flaws, vec![FlawLabel::Eval, FlawLabel::DynamicCodeExecution]);
        assert_eq!(sequential[3].status, ProbeStatus::Http(200));
        assert!(sequential[3].flaws.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_requests_bounded_by_limit() {
        let transport = Arc::new(ScriptedTransport::default());
        let urls: Vec<String> = (0..12).map(|i| format!("http://t.test/{}.js?delay=20", i)).collect();

        let outcomes = engine(Arc::clone(&transport), 4).run(targets(&urls)).await;

        assert_eq!(outcomes.len(), 12);
        let peak = transport.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight {} exceeded limit", peak);
        assert!(peak >= 2, "expected parallel requests, peak was {}", peak);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_probe_is_isolated() {
        let urls = vec![
            "http://t.test/a.js".to_string(),
            "http://t.test/panic".to_string(),
            "http://t.test/c.js".to_string(),
            "http://t.test/d.js".to_string(),
        ];

        let outcomes = engine(Arc::new(ScriptedTransport::default()), 2).run(targets(&urls)).await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[1].is_error());
        assert_eq!(outcomes[1].url, "http://t.test/panic");
        for i in [0, 2, 3] {
            assert_eq!(outcomes[i].status, ProbeStatus::Http(200));
        }
    }

    #[tokio::test]
    async fn test_single_worker_survives_a_panicking_probe() {
        let transport = Arc::new(ScriptedTransport::default());
        let urls = vec![
            "http://t.test/a.js".to_string(),
            "http://t.test/panic".to_string(),
            "http://t.test/c.js".to_string(),
            "http://t.test/d.js".to_string(),
        ];

        let outcomes = engine(Arc::clone(&transport), 1).run(targets(&urls)).await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            outcomes[1].status,
            ProbeStatus::Error("worker aborted: transport blew up".to_string())
        );
        for i in [0, 2, 3] {
            assert_eq!(outcomes[i].url, urls[i]);
            assert_eq!(outcomes[i].status, ProbeStatus::Http(200));
        }
        assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_streaming_releases_in_input_order() {
        let urls = mixed_urls(10);
        let mut seen = Vec::new();

        let outcomes = engine(Arc::new(ScriptedTransport::default()), 5)
            .run_streaming(targets(&urls), |outcome| {
                seen.push(outcome.url.clone());
                Ok::<(), String>(())
            })
            .await
            .unwrap();

        assert_eq!(seen, urls);
        assert_eq!(outcomes.len(), urls.len());
    }

    #[tokio::test]
    async fn test_streaming_error_aborts_run() {
        let urls = mixed_urls(6);
        let result = engine(Arc::new(ScriptedTransport::default()), 2)
            .run_streaming(targets(&urls), |_| Err::<(), _>("disk full".to_string()))
            .await;

        assert_eq!(result.unwrap_err(), "disk full");
    }
}
