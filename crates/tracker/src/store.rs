use anyhow::Context;
use models::{EntityFilter, StateSnapshot, TrackedEntity};
use std::sync::{Arc, Mutex};

/// Store is the durable state of the tracker: tracked flights, their latest
/// snapshots, and the dedup keys of delivered alerts.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn list_entities(&self, filter: EntityFilter) -> anyhow::Result<Vec<TrackedEntity>>;

    async fn insert_entity(&self, entity: TrackedEntity) -> anyhow::Result<()>;

    async fn get_entity(&self, id: &str) -> anyhow::Result<Option<TrackedEntity>>;

    /// Delete entity `id`, returning whether it existed.
    async fn delete_entity(&self, id: &str) -> anyhow::Result<bool>;

    /// Fetch the latest snapshot of `entity_id`, or None if it has never been stored.
    async fn fetch_snapshot(&self, entity_id: &str) -> anyhow::Result<Option<StateSnapshot>>;

    async fn store_snapshot(&self, snapshot: StateSnapshot) -> anyhow::Result<()>;

    async fn alert_sent(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool>;

    /// Record delivery of `alert_type`. Recording an existing alert is a no-op
    /// which returns false.
    async fn record_alert(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool>;
}

/// SqliteStore serializes statements over a single SQLite connection,
/// which are run on the blocking thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteStore {
    pub fn open(uri: &str) -> anyhow::Result<Self> {
        let conn = tracker_sql::open(uri)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("database connection mutex is poisoned"))?;
            Ok(f(&*conn)?)
        })
        .await
        .context("database task failed")?
    }
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn list_entities(&self, filter: EntityFilter) -> anyhow::Result<Vec<TrackedEntity>> {
        self.with_conn(move |conn| tracker_sql::entities::list(conn, &filter))
            .await
            .context("listing tracked flights")
    }

    async fn insert_entity(&self, entity: TrackedEntity) -> anyhow::Result<()> {
        self.with_conn(move |conn| tracker_sql::entities::insert(conn, &entity))
            .await
            .context("inserting tracked flight")
    }

    async fn get_entity(&self, id: &str) -> anyhow::Result<Option<TrackedEntity>> {
        let id = id.to_string();
        self.with_conn(move |conn| tracker_sql::entities::get(conn, &id))
            .await
            .context("fetching tracked flight")
    }

    async fn delete_entity(&self, id: &str) -> anyhow::Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| tracker_sql::entities::delete(conn, &id))
            .await
            .context("deleting tracked flight")
    }

    async fn fetch_snapshot(&self, entity_id: &str) -> anyhow::Result<Option<StateSnapshot>> {
        let entity_id = entity_id.to_string();
        self.with_conn(move |conn| tracker_sql::snapshots::fetch(conn, &entity_id))
            .await
            .context("fetching flight state")
    }

    async fn store_snapshot(&self, snapshot: StateSnapshot) -> anyhow::Result<()> {
        self.with_conn(move |conn| tracker_sql::snapshots::upsert(conn, &snapshot))
            .await
            .context("storing flight state")
    }

    async fn alert_sent(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool> {
        let (entity_id, alert_type) = (entity_id.to_string(), alert_type.to_string());
        self.with_conn(move |conn| tracker_sql::alerts::exists(conn, &entity_id, &alert_type))
            .await
            .context("querying sent alerts")
    }

    async fn record_alert(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool> {
        let (entity_id, alert_type) = (entity_id.to_string(), alert_type.to_string());
        self.with_conn(move |conn| tracker_sql::alerts::insert(conn, &entity_id, &alert_type))
            .await
            .context("recording sent alert")
    }
}
