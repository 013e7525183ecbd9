use chrono::{TimeZone, Utc};
use handlebars::handlebars_helper;

/// Render unix seconds as a Slack date token, which each reader sees in
/// their own timezone. The fallback text is UTC.
pub fn slack_time(ts: i64) -> String {
    if ts == 0 {
        return "unknown".to_string();
    }
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => format!("<!date^{ts}^{{time}}|{} UTC>", dt.format("%H:%M")),
        None => "unknown".to_string(),
    }
}

/// Render a number of seconds as ex "1d 2h 3m". Durations under a minute,
/// including negative ones, render as "0m".
pub fn human_duration(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    let (days, hours, minutes) = (minutes / 1440, (minutes / 60) % 24, minutes % 60);

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect();

    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

/// Render `percent` as a bar of `width` cells, followed by the percentage.
pub fn progress_bar(width: usize, percent: f64) -> String {
    let percent = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    let full = ((width as f64 * percent) / 100.0).round() as usize;

    format!(
        "`{}{}` {percent:.1}%",
        "█".repeat(full),
        "░".repeat(width - full)
    )
}

handlebars_helper!(time_helper: |ts: i64| slack_time(ts));
handlebars_helper!(duration_helper: |seconds: i64| human_duration(seconds));
handlebars_helper!(progress_helper: |percent: f64| progress_bar(10, percent));

pub fn register_helpers(registry: &mut handlebars::Handlebars<'_>) {
    registry.register_helper("time", Box::new(time_helper));
    registry.register_helper("duration", Box::new(duration_helper));
    registry.register_helper("progress", Box::new(progress_helper));
}
