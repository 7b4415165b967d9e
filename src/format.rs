//! Display rows for the console and CSV exports.
//!
//! These run after every sort, on already-ordered raw rows.
use crate::types::{ChannelRevenueSummary, MerDisplayRow, MerRow, TopChannelDisplayRow};
use crate::util::{format_currency, format_ratio};

pub fn format_mer_rows(rows: &[MerRow]) -> Vec<MerDisplayRow> {
    rows.iter()
        .map(|r| MerDisplayRow {
            channel: r.channel.clone(),
            revenue: format_currency(r.revenue),
            cost: format_currency(r.cost),
            mer: format_ratio(r.mer),
        })
        .collect()
}

pub fn format_top_channels(rows: &[ChannelRevenueSummary]) -> Vec<TopChannelDisplayRow> {
    rows.iter()
        .enumerate()
        .map(|(idx, r)| TopChannelDisplayRow {
            rank: idx + 1,
            channel: r.channel.clone(),
            revenue: format_currency(r.revenue),
        })
        .collect()
}
