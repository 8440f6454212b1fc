use std::{sync::Arc, time::Duration};

use {
    futures::StreamExt,
    gamebridge_common::{EventObserver, GameEvent, Observers},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use gamebridge_metrics::{counter, events as event_metrics, labels, log_watcher as log_metrics};

use crate::{
    Result,
    patterns::LineParser,
    source::LogSource,
};

/// Wait between stream cycles after an error or a closed stream.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Follows the game server's console output and turns matching lines into
/// events.
pub struct LogWatcher {
    source: Arc<dyn LogSource>,
    selector: String,
    parser: LineParser,
    observers: Observers,
    retry_delay: Duration,
    current_instance: Option<String>,
}

impl LogWatcher {
    pub fn new(source: Arc<dyn LogSource>, selector: impl Into<String>) -> Result<Self> {
        Ok(Self {
            source,
            selector: selector.into(),
            parser: LineParser::new()?,
            observers: Observers::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            current_instance: None,
        })
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn subscribe(&mut self, observer: Arc<dyn EventObserver>) {
        self.observers.push(observer);
    }

    /// Run until `cancel` fires. Errors are logged and retried, never returned.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = self.follow() => outcome,
            };
            match outcome {
                Ok(()) => info!(
                    retry_in = ?self.retry_delay,
                    "log stream ended, reconnecting"
                ),
                Err(e) => warn!(
                    error = %e,
                    retry_in = ?self.retry_delay,
                    "log watch failed, retrying"
                ),
            }
            #[cfg(feature = "metrics")]
            counter!(log_metrics::RETRIES_TOTAL).increment(1);

            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(self.retry_delay) => {},
            }
        }
    }

    /// One resolve-and-stream cycle. Returns when the stream closes.
    async fn follow(&mut self) -> Result<()> {
        let instance = self.source.resolve(&self.selector).await?;
        self.note_instance(&instance);

        let mut lines = self.source.stream_output(&instance).await?;
        while let Some(line) = lines.next().await {
            let line = line?;
            #[cfg(feature = "metrics")]
            counter!(log_metrics::LINES_TOTAL).increment(1);
            if let Some(event) = self.parser.parse(&line) {
                self.emit(&event);
            }
        }
        Ok(())
    }

    fn note_instance(&mut self, instance: &str) {
        if self.current_instance.as_deref() == Some(instance) {
            return;
        }
        match &self.current_instance {
            Some(previous) => info!(
                scope = %self.source.scope(),
                from = %previous,
                to = %instance,
                "game server instance changed"
            ),
            None => info!(
                scope = %self.source.scope(),
                instance = %instance,
                "following game server logs"
            ),
        }
        #[cfg(feature = "metrics")]
        counter!(log_metrics::INSTANCE_CHANGES_TOTAL).increment(1);
        self.current_instance = Some(instance.to_string());
    }

    fn emit(&self, event: &GameEvent) {
        debug!(kind = %event.kind, player = %event.player(), "log event");
        #[cfg(feature = "metrics")]
        counter!(
            event_metrics::PRODUCED_TOTAL,
            labels::SOURCE => "log",
            labels::KIND => event.kind.clone()
        )
        .increment(1);
        self.observers.notify(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use {
        super::*,
        crate::{Error, source::LineStream},
        async_trait::async_trait,
        futures::stream,
        gamebridge_common::types::kind,
    };

    /// Each `stream_output` call pops the next scripted batch of lines.
    /// An exhausted script fails resolution.
    struct ScriptedSource {
        instances: Mutex<VecDeque<&'static str>>,
        batches: Mutex<VecDeque<Vec<Result<String>>>>,
        resolves: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(instances: Vec<&'static str>, batches: Vec<Vec<Result<String>>>) -> Arc<Self> {
            Arc::new(Self {
                instances: Mutex::new(instances.into()),
                batches: Mutex::new(batches.into()),
                resolves: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn resolve(&self, selector: &str) -> Result<String> {
            self.resolves.fetch_add(1, Ordering::SeqCst);
            self.instances
                .lock()
                .unwrap()
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| Error::NotFound {
                    selector: selector.to_string(),
                })
        }

        async fn stream_output(&self, _instance: &str) -> Result<LineStream> {
            let batch = self.batches.lock().unwrap().pop_front().unwrap_or_default();
            Ok(stream::iter(batch).boxed())
        }
    }

    fn ok(line: &str) -> Result<String> {
        Ok(line.to_string())
    }

    fn recorder() -> (Arc<Mutex<Vec<GameEvent>>>, Arc<dyn EventObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn EventObserver> =
            Arc::new(move |e: &GameEvent| sink.lock().unwrap().push(e.clone()));
        (seen, observer)
    }

    #[tokio::test(start_paused = true)]
    async fn emits_one_event_per_matching_line_in_order() {
        let source = ScriptedSource::new(vec!["pod-a"], vec![vec![
            ok("[CHAT] Alice: hello"),
            ok("noise"),
            ok("Bob joined the game"),
            ok("Rocket launched"),
        ]]);
        let (seen, observer) = recorder();
        let mut watcher = LogWatcher::new(source, "app=game").unwrap();
        watcher.subscribe(observer);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        task.await.unwrap();

        let kinds: Vec<_> = seen.lock().unwrap().iter().map(|e| e.kind.clone()).collect();
        assert_eq!(kinds, vec![kind::CHAT, kind::JOIN, kind::ROCKET]);
    }

    #[tokio::test(start_paused = true)]
    async fn every_observer_sees_every_event() {
        let source = ScriptedSource::new(vec!["pod-a"], vec![vec![ok("Alice left the game")]]);
        let (first, a) = recorder();
        let (second, b) = recorder();
        let mut watcher = LogWatcher::new(source, "app=game").unwrap();
        watcher.subscribe(a);
        watcher.subscribe(b);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_per_backoff_interval() {
        // First cycle streams one line then breaks; later resolutions fail.
        let source = ScriptedSource::new(vec!["pod-a"], vec![vec![
            ok("[CHAT] Alice: hello"),
            Err(Error::Message("connection reset".into())),
        ]]);
        let (seen, observer) = recorder();
        let mut watcher = LogWatcher::new(Arc::clone(&source) as Arc<dyn LogSource>, "app=game")
            .unwrap()
            .with_retry_delay(Duration::from_secs(10));
        watcher.subscribe(observer);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));

        // Cycles start at t=0, 10, 20, 30.
        tokio::time::sleep(Duration::from_secs(35)).await;
        cancel.cancel();
        task.await.unwrap();

        assert_eq!(source.resolves.load(Ordering::SeqCst), 4);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let source = ScriptedSource::new(vec![], vec![]);
        let watcher = LogWatcher::new(source, "app=game")
            .unwrap()
            .with_retry_delay(Duration::from_secs(3600));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("watcher should stop promptly")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_instance_changes() {
        let source = ScriptedSource::new(vec!["pod-a", "pod-a", "pod-b"], vec![
            vec![ok("Alice joined the game")],
            vec![],
            vec![ok("Bob joined the game")],
        ]);
        let (seen, observer) = recorder();
        let mut watcher = LogWatcher::new(source, "app=game")
            .unwrap()
            .with_retry_delay(Duration::from_secs(1));
        watcher.subscribe(observer);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();
        task.await.unwrap();

        let players: Vec<_> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.player().to_string())
            .collect();
        assert_eq!(players, vec!["Alice", "Bob"]);
    }
}
