//! Terminal rendering of dashboard data.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use rfid_client::models::{parse_timestamp, Reading, ServerStatus, StatsSnapshot, UserProfile};

const BAR_WIDTH: usize = 40;

/// `zona_3` -> `Zone 3`; other keys are shown as-is.
pub fn zone_label(key: &str) -> String {
    match key.strip_prefix("zona_") {
        Some(n) => format!("Zone {}", n),
        None => key.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Horizontal bar chart, bars scaled to the largest value.
pub fn bar_chart(title: &str, rows: &[(String, u64)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    if rows.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return out;
    }

    let label_width = rows.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    for (label, value) in rows {
        let len = ((*value as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
        let len = if *value > 0 { len.max(1) } else { 0 };
        let _ = writeln!(
            out,
            "  {:<width$} {} {}",
            label,
            "█".repeat(len),
            value,
            width = label_width
        );
    }
    out
}

fn zone_rows(by_zone: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut rows: Vec<(String, u64)> = by_zone.iter().map(|(k, v)| (k.clone(), *v)).collect();
    // Numeric order so zona_10 sorts after zona_2.
    rows.sort_by_key(|(k, _)| {
        k.strip_prefix("zona_")
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(i64::MAX)
    });
    rows.into_iter().map(|(k, v)| (zone_label(&k), v)).collect()
}

fn readings_table(readings: &[Reading]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Zone", "Animal", "Tag UID", "Count", "Device", "Time"]);

    for reading in readings {
        table.add_row(vec![
            format!("Zone {}", reading.zone),
            reading.animal_type.clone(),
            reading.uid.clone(),
            reading.count.to_string(),
            reading.device.clone().unwrap_or_else(|| "-".to_string()),
            format_timestamp(&reading.timestamp),
        ]);
    }
    table
}

pub fn readings(readings: &[Reading]) -> String {
    if readings.is_empty() {
        return "No readings recorded.\n".to_string();
    }
    format!("{}\n({} readings)\n", readings_table(readings), readings.len())
}

/// Full dashboard screen: cards, per-zone and per-type charts, recent readings.
pub fn dashboard(stats: &StatsSnapshot, user: Option<&UserProfile>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "RFID Livestock Dashboard");
    if let Some(user) = user {
        let _ = writeln!(out, "Signed in as {}", user.display_name());
    }
    let _ = writeln!(out);

    let mut cards = Table::new();
    cards.load_preset(UTF8_FULL);
    let mut header = vec!["Total readings".to_string(), "Today".to_string()];
    let mut values = vec![stats.total.to_string(), stats.today.to_string()];
    for (animal, count) in &stats.by_animal_type {
        header.push(capitalize(animal));
        values.push(count.to_string());
    }
    cards.set_header(header).add_row(values);
    let _ = writeln!(out, "{}\n", cards);

    out.push_str(&bar_chart("Readings by zone", &zone_rows(&stats.by_zone)));
    let _ = writeln!(out);

    let type_rows: Vec<(String, u64)> = stats
        .by_animal_type
        .iter()
        .map(|(k, v)| (capitalize(k), *v))
        .collect();
    out.push_str(&bar_chart("Readings by animal type", &type_rows));
    let _ = writeln!(out);

    let _ = writeln!(out, "Latest readings");
    if stats.recent.is_empty() {
        let _ = writeln!(out, "  No readings recorded.");
    } else {
        let _ = writeln!(out, "{}", readings_table(&stats.recent));
    }
    out
}

/// Zone statistics. Known fields are laid out; anything else falls back to JSON.
pub fn zone_statistics(value: &serde_json::Value) -> String {
    let Some(zone) = value.get("zona").and_then(|v| v.as_i64()) else {
        return serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    };

    let mut out = String::new();
    let _ = writeln!(out, "Zone {}", zone);
    if let Some(total) = value.get("total_leituras").and_then(|v| v.as_u64()) {
        let _ = writeln!(out, "  Total readings: {}", total);
    }
    let last = value
        .get("ultima_leitura")
        .and_then(|v| v.as_str())
        .map(|raw| {
            parse_timestamp(raw)
                .map(|ts| format_timestamp(&ts))
                .unwrap_or_else(|| raw.to_string())
        })
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "  Last reading:   {}", last);

    if let Some(by_type) = value.get("por_tipo").and_then(|v| v.as_object()) {
        let rows: Vec<(String, u64)> = by_type
            .iter()
            .map(|(k, v)| (capitalize(k), v.as_u64().unwrap_or(0)))
            .collect();
        let _ = writeln!(out);
        out.push_str(&bar_chart("Readings by animal type", &rows));
    }
    out
}

pub fn server_status(status: &ServerStatus, api_url: &str) -> String {
    format!(
        "Server:  {}\nStatus:  {}\nVersion: {}\nTime:    {}\n",
        api_url, status.status, status.version, status.timestamp
    )
}
