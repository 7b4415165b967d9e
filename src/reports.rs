use crate::types::{
    ChannelEntry, ChannelRevenueSummary, CostInput, DailyRevenueRow, MerRow, TimeSlotRevenueRow,
};
use crate::util::is_web_channel;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const TOP_CHANNEL_LIMIT: usize = 10;

fn desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Total revenue per channel, highest first. Equal totals stay in channel
/// name order.
pub fn revenue_by_channel(entries: &[ChannelEntry]) -> Vec<ChannelRevenueSummary> {
    let mut map: BTreeMap<&str, f64> = BTreeMap::new();
    for e in entries {
        *map.entry(e.channel.as_str()).or_insert(0.0) += e.revenue;
    }
    let mut rows: Vec<ChannelRevenueSummary> = map
        .into_iter()
        .map(|(channel, revenue)| ChannelRevenueSummary {
            channel: channel.to_string(),
            revenue,
        })
        .collect();
    rows.sort_by(|a, b| desc_f64(a.revenue, b.revenue));
    rows
}

/// Revenue per (day, channel), ordered by day then channel.
pub fn daily_revenue(entries: &[ChannelEntry]) -> Vec<DailyRevenueRow> {
    let mut map: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    for e in entries {
        *map.entry((e.day, e.channel.as_str())).or_insert(0.0) += e.revenue;
    }
    map.into_iter()
        .map(|((day, channel), revenue)| DailyRevenueRow {
            day,
            channel: channel.to_string(),
            revenue,
        })
        .collect()
}

/// Revenue per (time slot, channel) for broadcast channels only, ordered by
/// numeric hour so labels come out chronologically.
pub fn time_slot_revenue(entries: &[ChannelEntry]) -> Vec<TimeSlotRevenueRow> {
    let mut map: BTreeMap<(u32, &str), (&str, f64)> = BTreeMap::new();
    for e in entries.iter().filter(|e| !is_web_channel(&e.channel)) {
        let slot = map
            .entry((e.hour, e.channel.as_str()))
            .or_insert((e.time_slot.as_str(), 0.0));
        slot.1 += e.revenue;
    }
    map.into_iter()
        .map(|((hour, channel), (time_slot, revenue))| TimeSlotRevenueRow {
            time_slot: time_slot.to_string(),
            channel: channel.to_string(),
            hour,
            revenue,
        })
        .collect()
}

/// Revenue over cost. Unset or zero cost gives 0 rather than a division
/// error, and the ratio never goes negative or non-finite.
pub fn mer(revenue: f64, cost: f64) -> f64 {
    if cost <= 0.0 {
        return 0.0;
    }
    let ratio = revenue / cost;
    if !ratio.is_finite() || ratio < 0.0 {
        0.0
    } else {
        ratio
    }
}

/// Join per-channel revenue with the entered costs and rank by MER.
///
/// The sort is stable, so channels with equal MER keep the order of
/// `summary`.
pub fn compute_mer(summary: &[ChannelRevenueSummary], costs: &CostInput) -> Vec<MerRow> {
    let known: HashSet<&str> = summary.iter().map(|r| r.channel.as_str()).collect();
    for channel in costs.channels().filter(|c| !known.contains(c)) {
        debug!(channel, "cost entered for a channel with no revenue in this selection");
    }

    let mut rows: Vec<MerRow> = summary
        .iter()
        .map(|r| {
            let cost = costs.cost_for(&r.channel);
            MerRow {
                channel: r.channel.clone(),
                revenue: r.revenue,
                cost,
                mer: mer(r.revenue, cost),
            }
        })
        .collect();
    rows.sort_by(|a, b| desc_f64(a.mer, b.mer));
    rows
}

/// The ten highest-revenue broadcast channels, fewer if there aren't ten.
pub fn top_channels(summary: &[ChannelRevenueSummary]) -> Vec<ChannelRevenueSummary> {
    let mut rows: Vec<ChannelRevenueSummary> = summary
        .iter()
        .filter(|r| !is_web_channel(&r.channel))
        .cloned()
        .collect();
    rows.sort_by(|a, b| desc_f64(a.revenue, b.revenue));
    rows.truncate(TOP_CHANNEL_LIMIT);
    rows
}
