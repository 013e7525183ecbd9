/// TrackedEntity is a flight which a user asked to be notified about.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackedEntity {
    pub id: String,
    /// Flight number as understood by the data source, ex `AFR102`.
    pub flight_number: String,
    /// Slack channel which receives alerts for this flight.
    pub channel: String,
    /// Slack user who is tracking the flight.
    pub owner: String,
    /// Scheduled departure, as unix seconds.
    pub departure: i64,
}

/// EntityFilter narrows a listing of tracked entities.
/// Every `None` field matches all entities.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityFilter {
    pub owner: Option<String>,
    pub flight_number: Option<String>,
    pub channel: Option<String>,
    /// Match only entities departing strictly before this unix time.
    pub departs_before: Option<i64>,
    /// Match only entities departing strictly after this unix time.
    pub departs_after: Option<i64>,
}

impl EntityFilter {
    pub fn departing_before(ts: i64) -> Self {
        Self {
            departs_before: Some(ts),
            ..Default::default()
        }
    }

    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Default::default()
        }
    }

    /// Returns true if `entity` is matched by this filter.
    pub fn matches(&self, entity: &TrackedEntity) -> bool {
        let Self {
            owner,
            flight_number,
            channel,
            departs_before,
            departs_after,
        } = self;

        owner.as_ref().map_or(true, |o| *o == entity.owner)
            && flight_number
                .as_ref()
                .map_or(true, |f| *f == entity.flight_number)
            && channel.as_ref().map_or(true, |c| *c == entity.channel)
            && departs_before.map_or(true, |ts| entity.departure < ts)
            && departs_after.map_or(true, |ts| entity.departure > ts)
    }
}
