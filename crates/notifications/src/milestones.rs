use anyhow::Context;

pub fn register_templates<'a>(registry: &mut handlebars::Handlebars<'a>) -> anyhow::Result<()> {
    registry
        .register_template_string(
            "departure_gate_announced",
            r#"*:seat: Gate announced!* :seat:
Gate *{{current.origin_gate}}*{{#if current.origin_terminal}}, terminal {{current.origin_terminal}}{{/if}}
Estimated departure time: {{time current.dep_estimated}} (_in {{duration facts.departs_in}}_)"#,
        )
        .context("registering departure_gate_announced template")?;

    registry
        .register_template_string(
            "flight_departed_from_gate",
            r#"*:airplane: Flight departed from {{#if current.origin_gate}}gate {{current.origin_gate}}{{else}}the gate{{/if}}!* :airplane:
Departure time: ~{{time current.dep_estimated}}~ {{time current.dep_actual}}{{#if facts.taxi_time}}
Estimated taxi time: {{duration facts.taxi_time}}{{/if}}"#,
        )
        .context("registering flight_departed_from_gate template")?;

    registry
        .register_template_string(
            "flight_takeoff",
            r#":airplane_departure: *Flight took off!* :airplane_departure:
Takeoff time: ~{{time current.takeoff_estimated}}~ {{time current.takeoff_actual}}{{#if facts.flight_duration}}
Estimated flight duration: {{duration facts.flight_duration}}{{/if}}"#,
        )
        .context("registering flight_takeoff template")?;

    registry
        .register_template_string(
            "flight_landed",
            r#":airplane_arriving: *Flight landed!* :airplane_arriving:
Landing time: ~{{time current.landing_estimated}}~ {{time current.landing_actual}}{{#if current.dest_gate}}
Taxiing to gate {{current.dest_gate}}{{/if}}"#,
        )
        .context("registering flight_landed template")?;

    registry
        .register_template_string(
            "flight_arrived_at_gate",
            r#":airplane: *Flight arrived{{#if current.dest_gate}} at gate {{current.dest_gate}}{{/if}}* :airplane:
Arrival time: ~{{time current.arr_estimated}}~ {{time current.arr_actual}}"#,
        )
        .context("registering flight_arrived_at_gate template")?;

    registry
        .register_template_string(
            "in_flight_update",
            r#":airplane: *Still flying!* :airplane:
{{progress facts.progress_percent}}
({{duration facts.time_left}} left)"#,
        )
        .context("registering in_flight_update template")?;

    Ok(())
}
