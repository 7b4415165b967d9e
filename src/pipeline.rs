//! End-to-end report run over an already loaded table.
//!
//! filter → unpivot → aggregate → MER / views. Every step is a pure function
//! of the records, the selection and the costs, so a run can be repeated
//! whenever any of them changes without reloading the file.
use crate::format::{format_mer_rows, format_top_channels};
use crate::loader;
use crate::reports::{
    compute_mer, daily_revenue, revenue_by_channel, time_slot_revenue, top_channels,
};
use crate::transform::{filter_records, unpivot_channels};
use crate::types::{
    ChannelRevenueSummary, CostInput, DailyRevenueRow, DerivedRecord, MerDisplayRow, MerRow,
    TimeSlotRevenueRow, TopChannelDisplayRow,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Category and month choices for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub category: String,
    pub months: HashSet<String>,
}

impl Selection {
    pub fn new(category: impl Into<String>, months: impl IntoIterator<Item = String>) -> Self {
        Self {
            category: category.into(),
            months: months.into_iter().collect(),
        }
    }

    /// First product in the table with every month selected; `None` for an
    /// empty table.
    pub fn default_for(records: &[DerivedRecord]) -> Option<Self> {
        let category = loader::products(records).into_iter().next()?;
        Some(Self::new(category, loader::months(records)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSet {
    pub revenue_by_channel: Vec<ChannelRevenueSummary>,
    pub mer: Vec<MerRow>,
    pub daily: Vec<DailyRevenueRow>,
    pub time_slots: Vec<TimeSlotRevenueRow>,
    pub top_channels: Vec<ChannelRevenueSummary>,
}

impl ReportSet {
    pub fn mer_display(&self) -> Vec<MerDisplayRow> {
        format_mer_rows(&self.mer)
    }

    pub fn top_channels_display(&self) -> Vec<TopChannelDisplayRow> {
        format_top_channels(&self.top_channels)
    }

    /// Channels that need a cost entry, highest revenue first.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.revenue_by_channel.iter().map(|r| r.channel.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.revenue_by_channel.is_empty()
    }
}

pub fn run(records: &[DerivedRecord], selection: &Selection, costs: &CostInput) -> ReportSet {
    let filtered = filter_records(records, &selection.category, &selection.months);
    debug!(
        category = %selection.category,
        months = selection.months.len(),
        rows = filtered.len(),
        "filtered records"
    );
    if filtered.is_empty() {
        warn!(category = %selection.category, "selection matched no rows");
    }

    let entries = unpivot_channels(&filtered);
    debug!(entries = entries.len(), "unpivoted channel slots");

    let summary = revenue_by_channel(&entries);
    let mut full_costs = CostInput::for_channels(&summary);
    full_costs.merge(costs);

    ReportSet {
        mer: compute_mer(&summary, &full_costs),
        daily: daily_revenue(&entries),
        time_slots: time_slot_revenue(&entries),
        top_channels: top_channels(&summary),
        revenue_by_channel: summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_bytes, LoadOptions, SourceKind};

    const HEADER: &str = "Sale Placement Date,Product Line (no hierarchy),TV Channel 1,TV Channel 1 £,TV Channel 2,TV Channel 2 £,TV Channel 3,TV Channel 3 £,TV Channel 4,TV Channel 4 £";

    fn records(body: &str) -> Vec<DerivedRecord> {
        let text = format!("{}\n{}", HEADER, body);
        load_bytes(text.as_bytes(), SourceKind::Csv, &LoadOptions::default())
            .unwrap()
            .0
    }

    fn months(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drama_two_months_single_channel() {
        let data = records(
            "2024-01-15 09:00:00,Drama,BBC1,500,,,,,,\n\
             2024-02-20 19:30:00,Drama,BBC1,300,,,,,,\n",
        );
        let selection = Selection::new("Drama", months(&["January", "February"]));
        let mut costs = CostInput::new();
        costs.set("BBC1", 400.0).unwrap();

        let report = run(&data, &selection, &costs);
        let shown = report.mer_display();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].channel, "BBC1");
        assert_eq!(shown[0].revenue, "£800.00");
        assert_eq!(shown[0].cost, "£400.00");
        assert_eq!(shown[0].mer, "2.00");
        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.time_slots.len(), 2);
        assert_eq!(report.time_slots[0].time_slot, "09:00-10:00");
    }

    #[test]
    fn web_channel_only_in_mer_table() {
        let data = records(
            "2024-01-15 09:00:00,Drama,BBC1,500,WEB-Direct,900,,,,\n",
        );
        let selection = Selection::default_for(&data).unwrap();
        let report = run(&data, &selection, &CostInput::new());
        let mer_channels: Vec<&str> = report.mer.iter().map(|r| r.channel.as_str()).collect();
        assert!(mer_channels.contains(&"WEB-Direct"));
        assert!(report.time_slots.iter().all(|r| r.channel != "WEB-Direct"));
        assert!(report.top_channels.iter().all(|r| r.channel != "WEB-Direct"));
        assert!(report.mer.iter().all(|r| r.mer == 0.0));
    }

    #[test]
    fn empty_month_selection_gives_empty_report() {
        let data = records("2024-01-15 09:00:00,Drama,BBC1,500,,,,,,\n");
        let report = run(&data, &Selection::new("Drama", Vec::new()), &CostInput::new());
        assert!(report.is_empty());
        assert!(report.mer.is_empty());
        assert!(report.daily.is_empty());
        assert!(report.time_slots.is_empty());
        assert!(report.top_channels.is_empty());
    }

    #[test]
    fn unknown_category_is_not_an_error() {
        let data = records("2024-01-15 09:00:00,Drama,BBC1,500,,,,,,\n");
        let report = run(&data, &Selection::new("News", months(&["January"])), &CostInput::new());
        assert!(report.is_empty());
    }

    #[test]
    fn costs_can_change_without_reloading() {
        let data = records(
            "2024-01-15 09:00:00,Drama,BBC1,600,ITV,300,,,,\n",
        );
        let selection = Selection::default_for(&data).unwrap();
        let first = run(&data, &selection, &CostInput::new());
        let order: Vec<&str> = first.channels().collect();
        assert_eq!(order, vec!["BBC1", "ITV"]);

        let mut costs = CostInput::new();
        costs.set("ITV", 50.0).unwrap();
        costs.set("BBC1", 300.0).unwrap();
        let second = run(&data, &selection, &costs);
        assert_eq!(second.mer[0].channel, "ITV");
        assert_eq!(second.mer[0].mer, 6.0);
        assert_eq!(second.mer[1].mer, 2.0);
    }

    #[test]
    fn default_selection_is_first_product_all_months() {
        let data = records(
            "2024-03-01 09:00:00,Comedy,BBC1,1,,,,,,\n\
             2024-01-01 09:00:00,Drama,BBC1,1,,,,,,\n",
        );
        let selection = Selection::default_for(&data).unwrap();
        assert_eq!(selection.category, "Comedy");
        assert_eq!(selection.months.len(), 2);
        assert!(Selection::default_for(&[]).is_none());
    }
}
