use crate::differ::AlertCandidate;
use crate::maps::MapRenderer;
use crate::slack::Notifier;
use crate::store::Store;
use models::flightaware::FlightDetail;
use models::{AlertKind, StateSnapshot, TrackedEntity};
use std::sync::Arc;

/// Delivery is the outcome of dispatching one alert candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// An alert with the same key was delivered before.
    AlreadySent,
    /// The alert was delivered now.
    Delivered,
    /// Rendering or delivery failed. The alert is not recorded, and may be
    /// dispatched again by a later poll.
    Failed,
    /// Sent alerts could not be queried, so the alert was not attempted.
    Skipped,
}

/// Dispatcher delivers each alert at most once per dedup key, by consulting
/// and recording sent alerts around every delivery.
pub struct Dispatcher {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    maps: Arc<dyn MapRenderer>,
    renderer: notifications::Renderer<'static>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        maps: Arc<dyn MapRenderer>,
        renderer: notifications::Renderer<'static>,
    ) -> Self {
        Self {
            store,
            notifier,
            maps,
            renderer,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(entity_id = %entity.id, key = %candidate.key))]
    pub async fn execute(
        &self,
        entity: &TrackedEntity,
        candidate: &AlertCandidate,
        current: &StateSnapshot,
        detail: &FlightDetail,
    ) -> Delivery {
        match self.store.alert_sent(&entity.id, &candidate.key).await {
            Ok(true) => return Delivery::AlreadySent,
            Ok(false) => (),
            Err(err) => {
                tracing::error!(?err, "failed to query sent alerts, skipping alert");
                return Delivery::Skipped;
            }
        }

        let message = match self.renderer.render(entity, &candidate.kind, current) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(?err, "failed to render alert");
                return Delivery::Failed;
            }
        };

        // Only in-flight updates carry a map.
        let image = if let AlertKind::InFlightUpdate { .. } = candidate.kind {
            match self.maps.render(detail).await {
                Ok(image) => Some(image),
                Err(err) => {
                    tracing::warn!(?err, "failed to render flight map, sending text only");
                    None
                }
            }
        } else {
            None
        };

        let result = match &image {
            Some(image) => {
                self.notifier
                    .upload_file(&entity.channel, image, &message)
                    .await
            }
            None => self.notifier.post_message(&entity.channel, &message).await,
        };
        if let Err(err) = result {
            tracing::warn!(?err, channel = %entity.channel, "failed to deliver alert (will retry)");
            return Delivery::Failed;
        }

        match self.store.record_alert(&entity.id, &candidate.key).await {
            Ok(_) => tracing::info!(channel = %entity.channel, "delivered alert"),
            Err(err) => tracing::error!(?err, "delivered alert, but failed to record it"),
        }
        Delivery::Delivered
    }
}
