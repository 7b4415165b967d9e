use crate::error::OutputError;
use crate::pipeline::ReportSet;
use crate::types::{ChannelRevenueSummary, TimeSlotRevenueRow};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const MER_FILE: &str = "mer_by_channel.csv";
pub const DAILY_FILE: &str = "daily_revenue.csv";
pub const TIME_SLOT_FILE: &str = "time_slot_revenue.csv";
pub const TOP_CHANNELS_FILE: &str = "top_channels.csv";
pub const CHARTS_FILE: &str = "charts.json";

/// Time-slot chart: one bar group per slot, one bar per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarChart {
    pub x_axis: Vec<String>,
    pub series: Vec<BarSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizontalBarChart {
    pub channels: Vec<String>,
    pub revenue: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub time_slot_revenue: GroupedBarChart,
    pub top_channels: HorizontalBarChart,
}

/// Slots keep the row order (by hour); channels are alphabetical and get 0
/// for slots where they had no revenue.
pub fn time_slot_chart(rows: &[TimeSlotRevenueRow]) -> GroupedBarChart {
    let mut x_axis: Vec<String> = Vec::new();
    for r in rows {
        if x_axis.last() != Some(&r.time_slot) {
            x_axis.push(r.time_slot.clone());
        }
    }
    let slot_pos: HashMap<&str, usize> = x_axis
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let channels: BTreeSet<&str> = rows.iter().map(|r| r.channel.as_str()).collect();
    let series = channels
        .into_iter()
        .map(|channel| {
            let mut values = vec![0.0; x_axis.len()];
            for r in rows.iter().filter(|r| r.channel == channel) {
                if let Some(&i) = slot_pos.get(r.time_slot.as_str()) {
                    values[i] += r.revenue;
                }
            }
            BarSeries {
                name: channel.to_string(),
                values,
            }
        })
        .collect();
    GroupedBarChart { x_axis, series }
}

pub fn top_channels_chart(rows: &[ChannelRevenueSummary]) -> HorizontalBarChart {
    HorizontalBarChart {
        channels: rows.iter().map(|r| r.channel.clone()).collect(),
        revenue: rows.iter().map(|r| r.revenue).collect(),
    }
}

pub fn chart_series(report: &ReportSet) -> ChartSeries {
    ChartSeries {
        time_slot_revenue: time_slot_chart(&report.time_slots),
        top_channels: top_channels_chart(&report.top_channels),
    }
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every view into `dir`, creating it if needed. Returns the files
/// written.
pub fn write_reports(dir: &Path, report: &ReportSet) -> Result<Vec<PathBuf>, OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mer = dir.join(MER_FILE);
    write_csv(&mer, &report.mer_display())?;
    let daily = dir.join(DAILY_FILE);
    write_csv(&daily, &report.daily)?;
    let slots = dir.join(TIME_SLOT_FILE);
    write_csv(&slots, &report.time_slots)?;
    let top = dir.join(TOP_CHANNELS_FILE);
    write_csv(&top, &report.top_channels_display())?;
    let charts = dir.join(CHARTS_FILE);
    write_json(&charts, &chart_series(report))?;

    info!(dir = %dir.display(), "reports written");
    Ok(vec![mer, daily, slots, top, charts])
}

/// Markdown rendering of the first `max_rows` rows, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

pub fn preview_report(report: &ReportSet, max_rows: usize) {
    preview_table(
        "MER by Channel",
        Some("sorted by MER"),
        &report.mer_display(),
        max_rows,
    );
    preview_table("Daily Revenue by Channel", None, &report.daily, max_rows);
    preview_table(
        "Revenue by Time Slot by Channel",
        Some("web channels excluded"),
        &report.time_slots,
        max_rows,
    );
    preview_table(
        "Top 10 Revenue Channels",
        Some("web channels excluded"),
        &report.top_channels_display(),
        max_rows,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{run, Selection};
    use crate::types::{CostInput, DerivedRecord};
    use crate::loader::{load_bytes, LoadOptions, SourceKind};

    fn slot(time_slot: &str, hour: u32, channel: &str, revenue: f64) -> TimeSlotRevenueRow {
        TimeSlotRevenueRow {
            time_slot: time_slot.to_string(),
            channel: channel.to_string(),
            hour,
            revenue,
        }
    }

    fn sample_records() -> Vec<DerivedRecord> {
        let text = "Sale Placement Date,Product Line (no hierarchy),TV Channel 1,TV Channel 1 £,TV Channel 2,TV Channel 2 £,TV Channel 3,TV Channel 3 £,TV Channel 4,TV Channel 4 £\n\
                    2024-01-15 09:00:00,Drama,BBC1,500,ITV,250,,,,\n\
                    2024-02-20 19:30:00,Drama,BBC1,300,Web Partner,40,,,,\n";
        load_bytes(text.as_bytes(), SourceKind::Csv, &LoadOptions::default())
            .unwrap()
            .0
    }

    #[test]
    fn grouped_chart_fills_missing_slots_with_zero() {
        let rows = vec![
            slot("02:00-03:00", 2, "ITV", 4.0),
            slot("02:00-03:00", 2, "BBC1", 2.0),
            slot("10:00-11:00", 10, "BBC1", 5.0),
        ];
        let chart = time_slot_chart(&rows);
        assert_eq!(chart.x_axis, vec!["02:00-03:00", "10:00-11:00"]);
        assert_eq!(chart.series[0].name, "BBC1");
        assert_eq!(chart.series[0].values, vec![2.0, 5.0]);
        assert_eq!(chart.series[1].name, "ITV");
        assert_eq!(chart.series[1].values, vec![4.0, 0.0]);
    }

    #[test]
    fn empty_table_renders_placeholder() {
        let rows: Vec<TimeSlotRevenueRow> = Vec::new();
        assert_eq!(render_table(&rows, 5), "(no rows)");
        let chart = time_slot_chart(&rows);
        assert!(chart.x_axis.is_empty());
        assert!(chart.series.is_empty());
    }

    #[test]
    fn writes_all_report_files() {
        let records = sample_records();
        let selection = Selection::default_for(&records).unwrap();
        let mut costs = CostInput::new();
        costs.set("BBC1", 400.0).unwrap();
        let report = run(&records, &selection, &costs);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = write_reports(&out, &report).unwrap();
        assert_eq!(written.len(), 5);

        let mer = std::fs::read_to_string(out.join(MER_FILE)).unwrap();
        let mut lines = mer.lines();
        assert_eq!(lines.next(), Some("Channel,Revenue,Cost,MER"));
        assert_eq!(lines.next(), Some("BBC1,£800.00,£400.00,2.00"));

        let charts: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(CHARTS_FILE)).unwrap()).unwrap();
        let top = charts["top_channels"]["channels"].as_array().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], "BBC1");
        assert_eq!(top[1], "ITV");
    }

    #[test]
    fn markdown_preview_has_headers() {
        let rows = vec![slot("09:00-10:00", 9, "BBC1", 1.5)];
        let table = render_table(&rows, 5);
        assert!(table.contains("Time_Slot"));
        assert!(table.contains("09:00-10:00"));
    }
}
