use anyhow::Context;

// Change alerts render the `previous` and `current` values carried by the alert itself.
pub fn register_templates<'a>(registry: &mut handlebars::Handlebars<'a>) -> anyhow::Result<()> {
    registry
        .register_template_string(
            "departure_time_change",
            r#":rotating_light: *Departure time updated!* :rotating_light:
Previous: {{time alert.previous}}
New: {{time alert.current}}"#,
        )
        .context("registering departure_time_change template")?;

    registry
        .register_template_string(
            "gate_change",
            r#":rotating_light: *Gate updated!* :rotating_light:
Previous: {{alert.previous}}
New: {{alert.current}}"#,
        )
        .context("registering gate_change template")?;

    registry
        .register_template_string(
            "arrival_gate_change",
            r#":rotating_light: *Arrival gate updated!* :rotating_light:
Previous: {{#if alert.previous}}{{alert.previous}}{{else}}unknown{{/if}}
New: {{alert.current}}"#,
        )
        .context("registering arrival_gate_change template")?;

    registry
        .register_template_string(
            "arrival_time_change",
            r#":rotating_light: *Arrival time updated!* :rotating_light:
Previous: {{time alert.previous}}
New: {{time alert.current}}"#,
        )
        .context("registering arrival_time_change template")?;

    Ok(())
}
