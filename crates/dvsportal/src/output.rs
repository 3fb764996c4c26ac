//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders sensor state in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits one sensor per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use dvsportal_core::SensorState;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn availability(available: bool, color: bool) -> String {
    match (available, color) {
        (true, true) => "yes".green().to_string(),
        (false, true) => "no".red().to_string(),
        (true, false) => "yes".into(),
        (false, false) => "no".into(),
    }
}

// ── Sensor rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Sensor")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Type")]
    type_id: String,
    #[tabled(rename = "Reservation")]
    reservation: String,
    #[tabled(rename = "Valid from")]
    valid_from: String,
    #[tabled(rename = "Valid until")]
    valid_until: String,
    #[tabled(rename = "Plate name")]
    plate_name: String,
}

fn sensor_row(s: &SensorState, color: bool) -> SensorRow {
    let attrs = s.attributes.as_ref();
    let reservation = attrs.and_then(|a| a.reservation.as_ref());
    SensorRow {
        name: s.name.clone(),
        state: s.state.clone().unwrap_or_else(|| "-".into()),
        available: availability(s.available, color),
        type_id: attrs.map_or_else(|| "-".into(), |a| a.type_id.to_string()),
        reservation: reservation.map_or_else(|| "-".into(), |r| r.reservation_id.clone()),
        valid_from: reservation
            .map_or_else(|| "-".into(), |r| r.reservation_valid_from.to_string()),
        valid_until: reservation
            .map_or_else(|| "-".into(), |r| r.reservation_valid_until.to_string()),
        plate_name: reservation
            .and_then(|r| r.reservation_license_plate_name.clone())
            .unwrap_or_else(|| "-".into()),
    }
}

/// One `unique_id<TAB>state` line, for `plain` and `watch`.
pub fn sensor_line(s: &SensorState) -> String {
    let state = match (&s.state, s.available) {
        (_, false) => "unavailable",
        (Some(plate), true) => plate.as_str(),
        (None, true) => "none",
    };
    format!("{}\t{state}", s.unique_id)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render every sensor in the chosen format.
pub fn render_sensors(format: OutputFormat, sensors: &[SensorState], color: bool) -> String {
    match format {
        OutputFormat::Table => {
            let rows: Vec<SensorRow> = sensors.iter().map(|s| sensor_row(s, color)).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(sensors, false),
        OutputFormat::JsonCompact => render_json(sensors, true),
        OutputFormat::Yaml => render_yaml(sensors),
        OutputFormat::Plain => sensors.iter().map(sensor_line).collect::<Vec<_>>().join("\n"),
    }
}

/// Render one sensor update for `watch`: a compact JSON object in the
/// JSON formats, otherwise a timestamped plain line.
pub fn render_update(format: OutputFormat, sensor: &SensorState) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => render_json(sensor, true),
        OutputFormat::Yaml => format!("---\n{}", render_yaml(sensor)),
        OutputFormat::Table | OutputFormat::Plain => format!(
            "{}\t{}",
            chrono::Local::now().format("%H:%M:%S"),
            sensor_line(sensor)
        ),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: {e}\n"))
}

#[cfg(test)]
mod tests {
    use dvsportal_core::SensorState;

    use super::{render_sensors, sensor_line};
    use crate::cli::OutputFormat;

    fn sensor(state: Option<&str>, available: bool) -> SensorState {
        SensorState {
            unique_id: "dvsportal_PV-1_CENTRUM".into(),
            name: "Parking Permit PV-1 (CENTRUM)".into(),
            state: state.map(str::to_owned),
            available,
            attributes: None,
        }
    }

    #[test]
    fn plain_lines_show_plate_none_or_unavailable() {
        assert_eq!(
            sensor_line(&sensor(Some("AB-123-C"), true)),
            "dvsportal_PV-1_CENTRUM\tAB-123-C"
        );
        assert_eq!(sensor_line(&sensor(None, true)), "dvsportal_PV-1_CENTRUM\tnone");
        assert_eq!(
            sensor_line(&sensor(Some("AB-123-C"), false)),
            "dvsportal_PV-1_CENTRUM\tunavailable"
        );
    }

    #[test]
    fn table_has_one_row_per_sensor() {
        let out = render_sensors(
            OutputFormat::Table,
            &[sensor(Some("AB-123-C"), true), sensor(None, true)],
            false,
        );
        assert!(out.contains("Parking Permit PV-1 (CENTRUM)"));
        assert!(out.contains("AB-123-C"));
        assert_eq!(out.matches("Parking Permit").count(), 2);
    }
}
