use crate::{differ, Services};
use models::{StateSnapshot, TrackedEntity};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Tick is the outcome of one poll of a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep polling.
    Continue,
    /// The flight is complete and its monitor should retire.
    Retire,
    /// The monitor was cancelled during the poll, which made no further writes.
    Cancelled,
}

/// Monitor polls a single tracked flight, dispatching alerts for its
/// transitions, until the flight completes or the monitor is cancelled.
///
/// A monitor is the only writer of its flight's stored snapshot.
pub struct Monitor {
    entity: TrackedEntity,
    services: Services,
}

impl Monitor {
    pub fn new(entity: TrackedEntity, services: Services) -> Self {
        Self { entity, services }
    }

    /// Poll every `interval` until cancelled or retired, starting immediately.
    /// The entity id is sent to `exits` as the monitor stops.
    #[tracing::instrument(name = "monitor", skip_all, fields(
        entity_id = %self.entity.id,
        flight_number = %self.entity.flight_number,
    ))]
    pub async fn run(
        self,
        interval: Duration,
        token: CancellationToken,
        exits: mpsc::UnboundedSender<String>,
    ) {
        tracing::info!("started monitoring flight");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => (),
            }

            match self.tick(&token).await {
                Tick::Continue => continue,
                Tick::Cancelled => break,
                Tick::Retire => {
                    self.retire(&token).await;
                    break;
                }
            }
        }

        // The supervisor has gone away if it's shutting down.
        let _ = exits.send(self.entity.id.clone());
        tracing::info!("stopped monitoring flight");
    }

    /// Poll the flight once: fetch, diff against the stored snapshot,
    /// dispatch alerts, and store the new snapshot.
    pub async fn tick(&self, token: &CancellationToken) -> Tick {
        let Services {
            store,
            source,
            dispatcher,
            clock,
        } = &self.services;

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return Tick::Cancelled,
            fetched = source.fetch(&self.entity.flight_number) => fetched,
        };
        let detail = match fetched {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                tracing::debug!("no current flight data, skipping poll");
                return Tick::Continue;
            }
            Err(err) => {
                tracing::warn!(?err, "failed to fetch flight data (will retry)");
                return Tick::Continue;
            }
        };
        if token.is_cancelled() {
            return Tick::Cancelled;
        }

        let current = StateSnapshot::from_detail(&detail, &self.entity.id, clock().timestamp());

        let previous = match store.fetch_snapshot(&self.entity.id).await {
            Ok(previous) => previous,
            Err(err) => {
                tracing::error!(?err, "failed to load flight state, skipping poll");
                return Tick::Continue;
            }
        };
        if previous.is_none() {
            tracing::debug!("no previous flight state, storing baseline");
        }

        let candidates = differ::evaluate(previous.as_ref(), &current);
        tracing::debug!(status = %current.status, candidates = candidates.len(), "polled flight");

        for candidate in &candidates {
            if token.is_cancelled() {
                return Tick::Cancelled;
            }
            dispatcher
                .execute(&self.entity, candidate, &current, &detail)
                .await;
        }

        if token.is_cancelled() {
            return Tick::Cancelled;
        }
        if let Err(err) = store.store_snapshot(current).await {
            tracing::error!(?err, "failed to store flight state");
        }

        // A previous snapshot which is already complete means an earlier
        // retirement didn't finish.
        let previously_complete = previous.as_ref().is_some_and(StateSnapshot::is_complete);

        if candidates.iter().any(|c| c.terminal) || previously_complete {
            Tick::Retire
        } else {
            Tick::Continue
        }
    }

    async fn retire(&self, token: &CancellationToken) {
        token.cancel();

        match self.services.store.delete_entity(&self.entity.id).await {
            Ok(_) => tracing::info!("flight is complete, stopped tracking"),
            Err(err) => tracing::error!(?err, "failed to delete completed flight"),
        }
    }
}
