use crate::monitor::Monitor;
use crate::Services;
use chrono::{DateTime, Utc};
use models::{EntityFilter, TrackedEntity};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Horizon bounds which tracked flights are monitored, by their departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    All,
    /// Flights departing within this duration of now.
    Within(Duration),
}

impl Horizon {
    pub fn filter(&self, now: DateTime<Utc>) -> EntityFilter {
        match self {
            Horizon::All => EntityFilter::default(),
            Horizon::Within(horizon) => {
                let horizon = i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX);
                EntityFilter::departing_before(now.timestamp().saturating_add(horizon))
            }
        }
    }
}

struct MonitorHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Supervisor runs one Monitor per tracked flight, reconciling running
/// monitors against the flights which are currently stored.
///
/// The map of monitor handles is owned by the Supervisor alone. Monitors
/// announce their exit over a channel, which the Supervisor drains.
pub struct Supervisor {
    services: Services,
    poll_interval: Duration,
    horizon: Horizon,
    handles: HashMap<String, MonitorHandle>,
    exits_tx: mpsc::UnboundedSender<String>,
    exits_rx: mpsc::UnboundedReceiver<String>,
}

impl Supervisor {
    pub fn new(services: Services, poll_interval: Duration, horizon: Horizon) -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();

        Self {
            services,
            poll_interval,
            horizon,
            handles: HashMap::new(),
            exits_tx,
            exits_rx,
        }
    }

    /// Ids of flights with a running monitor, in sorted order.
    pub fn monitored(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Cancellation token of the monitor of flight `id`.
    pub fn token(&self, id: &str) -> Option<&CancellationToken> {
        self.handles.get(id).map(|h| &h.token)
    }

    /// Start monitors for stored flights which lack one, and stop monitors
    /// of flights which are no longer stored.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn reconcile(&mut self) -> anyhow::Result<()> {
        let filter = self.horizon.filter((self.services.clock)());
        let entities = self.services.store.list_entities(filter).await?;
        let stored: HashSet<&str> = entities.iter().map(|e| e.id.as_str()).collect();

        self.handles.retain(|id, handle| {
            if !stored.contains(id.as_str()) {
                tracing::info!(entity_id = %id, "flight is no longer tracked, stopping its monitor");
                handle.token.cancel();
                false
            } else {
                // A finished monitor of a still-stored flight is restarted below.
                !handle.task.is_finished()
            }
        });

        for entity in entities {
            if !self.handles.contains_key(&entity.id) {
                self.start(entity);
            }
        }
        tracing::debug!(monitors = self.handles.len(), "reconciled tracked flights");

        Ok(())
    }

    fn start(&mut self, entity: TrackedEntity) {
        tracing::info!(
            entity_id = %entity.id,
            flight_number = %entity.flight_number,
            departure = entity.departure,
            "starting flight monitor",
        );

        let token = CancellationToken::new();
        let id = entity.id.clone();
        let monitor = Monitor::new(entity, self.services.clone());
        let task = tokio::spawn(monitor.run(
            self.poll_interval,
            token.clone(),
            self.exits_tx.clone(),
        ));

        self.handles.insert(id, MonitorHandle { token, task });
    }

    // A handle whose token is not cancelled belongs to a newer monitor of the
    // same flight, and is kept.
    fn on_exit(&mut self, id: String) {
        if self
            .handles
            .get(&id)
            .is_some_and(|handle| handle.token.is_cancelled())
        {
            self.handles.remove(&id);
            tracing::debug!(entity_id = %id, "removed exited flight monitor");
        }
    }

    /// Reconcile every `interval` until `shutdown` resolves, and then stop
    /// all monitors and wait for them to exit.
    pub async fn run(mut self, interval: Duration, shutdown: impl std::future::Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(id) = self.exits_rx.recv() => self.on_exit(id),
                _ = ticker.tick() => {
                    if let Err(err) = self.reconcile().await {
                        tracing::error!(?err, "failed to reconcile tracked flights (will retry)");
                    }
                }
            }
        }

        self.stop().await;
    }

    async fn stop(&mut self) {
        tracing::info!(monitors = self.handles.len(), "stopping flight monitors");

        let tasks: Vec<_> = self
            .handles
            .drain()
            .map(|(_, handle)| {
                handle.token.cancel();
                handle.task
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(err) = result {
                tracing::error!(?err, "flight monitor task failed");
            }
        }
    }
}
