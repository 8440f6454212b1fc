use std::{sync::Arc, time::Duration};

use {
    chrono::Utc,
    gamebridge_common::{EventFilter, EventObserver, Observers},
    gamebridge_rcon::CommandExecutor,
    tokio::time::{Instant, MissedTickBehavior, interval_at},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use gamebridge_metrics::{
    counter, events as event_metrics, gauge, labels, poller as poller_metrics,
};

use crate::{Error, Result, record::PolledRecord};

/// Prefix that runs a script body as a silent server command.
pub const SCRIPT_PREFIX: &str = "/sc ";

/// Answers `ok` while the server-side event queue exists.
pub const HEALTH_PROBE: &str =
    r#"/sc rcon.print(storage.bridge_events ~= nil and "ok" or "missing")"#;

const OK: &str = "ok";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// How often queued records are drained.
    pub poll_interval: Duration,
    /// How often hook presence is verified.
    pub health_interval: Duration,
    /// Wait before re-running a failed registration sequence.
    pub retry_delay: Duration,
    /// Record kinds delivered to observers.
    pub kinds: EventFilter,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            health_interval: Duration::from_secs(60),
            retry_delay: Duration::from_secs(15),
            kinds: EventFilter::All,
        }
    }
}

/// Server-side hook state as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Unregistered,
    Registering,
    Registered,
}

/// Installs event hooks on the game server and drains their queue.
pub struct StatePoller {
    executor: Arc<dyn CommandExecutor>,
    register_scripts: Vec<String>,
    poll_command: String,
    config: PollerConfig,
    observers: Observers,
    state: Registration,
}

impl StatePoller {
    /// `register_scripts` run in order on every registration; `poll_script`
    /// returns and clears the queued records as a JSON array.
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        register_scripts: Vec<String>,
        poll_script: &str,
        config: PollerConfig,
    ) -> Self {
        Self {
            executor,
            register_scripts,
            poll_command: format!("{SCRIPT_PREFIX}{poll_script}"),
            config,
            observers: Observers::new(),
            state: Registration::Unregistered,
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn EventObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> Registration {
        self.state
    }

    /// Register, then poll and health-check on their timers until `cancel`
    /// fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.register_with_retry(&cancel).await {
            return;
        }

        let now = Instant::now();
        let mut poll = interval_at(now + self.config.poll_interval, self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut health =
            interval_at(now + self.config.health_interval, self.config.health_interval);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = poll.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "event poll failed");
                    }
                },
                _ = health.tick() => {
                    if !self.health_check(&cancel).await {
                        return;
                    }
                },
            }
        }
    }

    /// Run the registration sequence once. Any transport error or answer
    /// other than `ok` aborts at that step.
    pub async fn register_once(&mut self) -> Result<()> {
        self.set_state(Registration::Registering);
        #[cfg(feature = "metrics")]
        counter!(poller_metrics::REGISTRATIONS_TOTAL).increment(1);

        let outcome = self.run_registration_scripts().await;
        match &outcome {
            Ok(()) => {
                self.set_state(Registration::Registered);
                info!(scripts = self.register_scripts.len(), "event hooks registered");
            },
            Err(_) => {
                self.set_state(Registration::Unregistered);
                #[cfg(feature = "metrics")]
                counter!(poller_metrics::REGISTRATION_FAILURES_TOTAL).increment(1);
            },
        }
        outcome
    }

    async fn run_registration_scripts(&self) -> Result<()> {
        for (index, script) in self.register_scripts.iter().enumerate() {
            let reason = match self.executor.execute(&format!("{SCRIPT_PREFIX}{script}")).await {
                Ok(resp) if resp.trim() == OK => continue,
                Ok(resp) => format!("unexpected response {:?}", truncate(resp.trim(), 200)),
                Err(e) => e.to_string(),
            };
            return Err(Error::Registration {
                step: index + 1,
                reason,
            });
        }
        Ok(())
    }

    /// Retry registration until it succeeds. Returns `false` if cancelled
    /// first.
    pub async fn register_with_retry(&mut self, cancel: &CancellationToken) -> bool {
        loop {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return false,
                outcome = self.register_once() => outcome,
            };
            match outcome {
                Ok(()) => return true,
                Err(e) => warn!(
                    error = %e,
                    retry_in = ?self.config.retry_delay,
                    "event hook registration failed"
                ),
            }
            tokio::select! {
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(self.config.retry_delay) => {},
            }
        }
    }

    /// Drain queued records once and deliver them in response order.
    /// Returns how many events were delivered.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let resp = match self.executor.execute(&self.poll_command).await {
            Ok(resp) => resp,
            Err(e) => {
                self.set_state(Registration::Unregistered);
                return Err(e.into());
            },
        };

        let body = resp.trim();
        if body.is_empty() || body == "[]" {
            return Ok(0);
        }

        let records = PolledRecord::parse_batch(body).map_err(|e| {
            debug!(response = %truncate(body, 200), "unparseable poll response");
            #[cfg(feature = "metrics")]
            counter!(poller_metrics::PARSE_ERRORS_TOTAL).increment(1);
            Error::from(e)
        })?;

        let now = Utc::now();
        let mut delivered = 0;
        for record in records {
            if !self.config.kinds.allows(&record.kind) {
                continue;
            }
            let event = record.into_event(now);
            debug!(kind = %event.kind, player = %event.player(), "polled event");
            #[cfg(feature = "metrics")]
            counter!(
                event_metrics::PRODUCED_TOTAL,
                labels::SOURCE => "poll",
                labels::KIND => event.kind.clone()
            )
            .increment(1);
            self.observers.notify(&event);
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Verify the hooks are still installed, re-registering when they are
    /// not. Returns `false` if cancelled while re-registering.
    pub async fn health_check(&mut self, cancel: &CancellationToken) -> bool {
        if self.state != Registration::Registered {
            return self.register_with_retry(cancel).await;
        }
        match self.executor.execute(HEALTH_PROBE).await {
            Ok(resp) if resp.trim() == OK => true,
            Ok(resp) => {
                info!(response = %truncate(resp.trim(), 200), "event hooks missing, re-registering");
                self.set_state(Registration::Unregistered);
                self.register_with_retry(cancel).await
            },
            Err(e) => {
                warn!(error = %e, "health probe failed, re-registering");
                self.set_state(Registration::Unregistered);
                self.register_with_retry(cancel).await
            },
        }
    }

    fn set_state(&mut self, state: Registration) {
        if self.state == Registration::Registered && state == Registration::Unregistered {
            info!("event hooks lost");
        }
        self.state = state;
        #[cfg(feature = "metrics")]
        gauge!(poller_metrics::REGISTERED).set(if state == Registration::Registered {
            1.0
        } else {
            0.0
        });
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
