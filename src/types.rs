use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

use crate::error::CostError;

pub const DATE_COLUMN: &str = "Sale Placement Date";
pub const CATEGORY_COLUMN: &str = "Product Line (no hierarchy)";

/// One (channel-name, channel-revenue) column pair of the wide input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotColumns {
    pub channel: String,
    pub revenue: String,
}

impl SlotColumns {
    pub fn new(channel: impl Into<String>, revenue: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            revenue: revenue.into(),
        }
    }
}

/// The four `TV Channel i` / `TV Channel i £` pairs of the sales export.
pub static DEFAULT_SLOTS: Lazy<Vec<SlotColumns>> = Lazy::new(|| {
    (1..=4)
        .map(|i| SlotColumns::new(format!("TV Channel {}", i), format!("TV Channel {} £", i)))
        .collect()
});

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSlot {
    pub channel: Option<String>,
    pub revenue: Option<f64>,
}

/// One row of the uploaded table, reduced to the columns the report needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub placed_at: NaiveDateTime,
    pub category: String,
    /// One entry per configured slot, in slot order.
    pub slots: Vec<ChannelSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Daypart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Daypart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Daypart::Morning => "Morning",
            Daypart::Afternoon => "Afternoon",
            Daypart::Evening => "Evening",
            Daypart::Night => "Night",
        }
    }
}

impl fmt::Display for Daypart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw record plus the calendar and time-of-day fields derived from
/// its placement timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub raw: RawRecord,
    pub month: String,
    pub day: NaiveDate,
    pub hour: u32,
    pub daypart: Daypart,
    pub time_slot: String,
}

/// One channel slot of one derived record, in long format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    pub channel: String,
    pub revenue: f64,
    pub day: NaiveDate,
    pub daypart: Daypart,
    pub time_slot: String,
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRevenueSummary {
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DailyRevenueRow {
    #[serde(rename = "Day")]
    #[tabled(rename = "Day")]
    pub day: NaiveDate,
    #[serde(rename = "Channel")]
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TimeSlotRevenueRow {
    #[serde(rename = "Time_Slot")]
    #[tabled(rename = "Time_Slot")]
    pub time_slot: String,
    #[serde(rename = "Channel")]
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Hour")]
    #[tabled(rename = "Hour")]
    pub hour: u32,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: f64,
}

/// Raw MER computation result; `mer` is 0 whenever `cost` is not positive.
#[derive(Debug, Clone, PartialEq)]
pub struct MerRow {
    pub channel: String,
    pub revenue: f64,
    pub cost: f64,
    pub mer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MerDisplayRow {
    #[serde(rename = "Channel")]
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[serde(rename = "Cost")]
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[serde(rename = "MER")]
    #[tabled(rename = "MER")]
    pub mer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct TopChannelDisplayRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Channel")]
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Revenue")]
    #[tabled(rename = "Revenue")]
    pub revenue: String,
}

/// User-entered cost per channel, keyed by channel name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostInput {
    costs: HashMap<String, f64>,
}

impl CostInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a zero cost for every channel in `summary`.
    pub fn for_channels(summary: &[ChannelRevenueSummary]) -> Self {
        let costs = summary
            .iter()
            .map(|row| (row.channel.clone(), 0.0))
            .collect();
        Self { costs }
    }

    pub fn set(&mut self, channel: impl Into<String>, cost: f64) -> Result<(), CostError> {
        let channel = channel.into();
        if !cost.is_finite() || cost < 0.0 {
            return Err(CostError { channel, cost });
        }
        self.costs.insert(channel, cost);
        Ok(())
    }

    /// Cost for `channel`, or 0 when none was entered.
    pub fn cost_for(&self, channel: &str) -> f64 {
        self.costs.get(channel).copied().unwrap_or(0.0)
    }

    /// Copy every entry of `other` over this mapping.
    pub fn merge(&mut self, other: &CostInput) {
        for (channel, cost) in &other.costs {
            self.costs.insert(channel.clone(), *cost);
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.costs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(channels: &[&str]) -> Vec<ChannelRevenueSummary> {
        channels
            .iter()
            .map(|c| ChannelRevenueSummary {
                channel: c.to_string(),
                revenue: 100.0,
            })
            .collect()
    }

    #[test]
    fn default_slots_are_the_four_tv_channel_pairs() {
        assert_eq!(DEFAULT_SLOTS.len(), 4);
        assert_eq!(DEFAULT_SLOTS[0], SlotColumns::new("TV Channel 1", "TV Channel 1 £"));
        assert_eq!(DEFAULT_SLOTS[3], SlotColumns::new("TV Channel 4", "TV Channel 4 £"));
    }

    #[test]
    fn cost_input_defaults_to_zero_per_channel() {
        let costs = CostInput::for_channels(&summary(&["BBC1", "ITV"]));
        assert_eq!(costs.channels().count(), 2);
        assert_eq!(costs.cost_for("BBC1"), 0.0);
        assert_eq!(costs.cost_for("Unknown"), 0.0);
    }

    #[test]
    fn cost_input_rejects_negative_and_nan() {
        let mut costs = CostInput::new();
        assert!(costs.set("BBC1", -1.0).is_err());
        assert!(costs.set("BBC1", f64::NAN).is_err());
        assert!(costs.set("BBC1", 250.0).is_ok());
        assert_eq!(costs.cost_for("BBC1"), 250.0);
    }

    #[test]
    fn merge_overrides_by_channel_name() {
        let mut base = CostInput::for_channels(&summary(&["BBC1", "ITV"]));
        let mut entered = CostInput::new();
        entered.set("ITV", 40.0).unwrap();
        base.merge(&entered);
        assert_eq!(base.cost_for("ITV"), 40.0);
        assert_eq!(base.cost_for("BBC1"), 0.0);
    }
}
