//! Slack messages for each kind of flight alert.
//!
//! Templates are keyed by `AlertKind::name()` and render Slack mrkdwn. Every
//! template sees the tracked `entity`, the `current` snapshot, the `alert`
//! itself (with its `previous` and `current` values, for change alerts), and
//! a set of `facts` derived from the snapshot.
use anyhow::Context;
use chrono::{TimeZone, Utc};
use handlebars::Handlebars;
use models::{AlertKind, StateSnapshot, TrackedEntity};
use serde::Serialize;

mod changes;
mod format;
mod milestones;

pub use format::{human_duration, progress_bar, slack_time};

/// Message is a rendered alert, ready to be posted to a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Plain mrkdwn body, used as the notification fallback.
    pub text: String,
    /// Slack layout blocks: the body section, followed by a context footer.
    pub blocks: Vec<serde_json::Value>,
    /// Title of an attached file, if the message carries one.
    pub title: String,
}

/// Quantities derived from a snapshot, in seconds, relative to the time the
/// snapshot was observed. Unknown inputs yield zero.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Facts {
    pub departs_in: i64,
    pub taxi_time: i64,
    pub flight_duration: i64,
    pub progress_percent: f64,
    pub time_left: i64,
}

impl Facts {
    pub fn from_snapshot(s: &StateSnapshot) -> Self {
        let now = s.updated_at;
        let known = |a: i64, b: i64| a != 0 && b != 0;

        let progress_percent = if s.dep_actual != 0 && s.arr_estimated > s.dep_actual {
            (now - s.dep_actual) as f64 * 100.0 / (s.arr_estimated - s.dep_actual) as f64
        } else {
            0.0
        };

        Self {
            departs_in: if s.dep_estimated != 0 {
                (s.dep_estimated - now).max(0)
            } else {
                0
            },
            taxi_time: if known(s.takeoff_estimated, s.dep_estimated) {
                (s.takeoff_estimated - s.dep_estimated).max(0)
            } else {
                0
            },
            flight_duration: if known(s.arr_estimated, s.dep_estimated) {
                (s.arr_estimated - s.dep_estimated).max(0)
            } else {
                0
            },
            progress_percent,
            time_left: if s.arr_estimated != 0 {
                (s.arr_estimated - now).max(0)
            } else {
                0
            },
        }
    }
}

#[derive(Serialize)]
struct TemplateData<'a> {
    entity: &'a TrackedEntity,
    current: &'a StateSnapshot,
    alert: &'a AlertKind,
    facts: Facts,
}

pub struct Renderer<'a> {
    reg: Handlebars<'a>,
}

const FOOTER: &str = "footer";

impl Renderer<'_> {
    pub fn try_new() -> anyhow::Result<Self> {
        let mut reg = Handlebars::new();
        reg.register_escape_fn(handlebars::no_escape);
        format::register_helpers(&mut reg);

        milestones::register_templates(&mut reg)?;
        changes::register_templates(&mut reg)?;

        reg.register_template_string(
            FOOTER,
            "_flight {{entity.flight_number}} - {{entity.id}}, tracked by <@{{entity.owner}}>_",
        )
        .context("registering footer template")?;

        Ok(Self { reg })
    }

    pub fn render(
        &self,
        entity: &TrackedEntity,
        alert: &AlertKind,
        current: &StateSnapshot,
    ) -> anyhow::Result<Message> {
        let data = TemplateData {
            entity,
            current,
            alert,
            facts: Facts::from_snapshot(current),
        };

        let text = self
            .reg
            .render(alert.name(), &data)
            .with_context(|| format!("rendering {} template", alert.name()))?;
        let footer = self
            .reg
            .render(FOOTER, &data)
            .context("rendering footer template")?;

        let date = Utc
            .timestamp_opt(current.updated_at, 0)
            .single()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();

        Ok(Message {
            blocks: vec![
                serde_json::json!({
                    "type": "section",
                    "text": {"type": "mrkdwn", "text": text},
                }),
                serde_json::json!({
                    "type": "context",
                    "elements": [{"type": "mrkdwn", "text": footer}],
                }),
            ],
            text,
            title: format!("{} - {date}", entity.flight_number),
        })
    }
}
