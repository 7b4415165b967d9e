//! Row filtering and the wide-to-long channel reshape.
use crate::types::{ChannelEntry, DerivedRecord};
use std::collections::HashSet;

/// Keep records whose category equals `category` exactly and whose month is
/// in `months`. An empty month set selects nothing.
pub fn filter_records<'a>(
    records: &'a [DerivedRecord],
    category: &str,
    months: &HashSet<String>,
) -> Vec<&'a DerivedRecord> {
    if months.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| r.raw.category == category && months.contains(&r.month))
        .collect()
}

/// One entry per (record, slot) with a channel name, in record order and
/// then slot order. Slots without a channel are dropped with their revenue;
/// a missing revenue next to a named channel counts as 0.
pub fn unpivot_channels(records: &[&DerivedRecord]) -> Vec<ChannelEntry> {
    records
        .iter()
        .flat_map(|r| {
            r.raw.slots.iter().filter_map(move |slot| {
                let channel = slot.channel.as_deref()?.trim();
                if channel.is_empty() {
                    return None;
                }
                Some(ChannelEntry {
                    channel: channel.to_string(),
                    revenue: slot.revenue.unwrap_or(0.0),
                    day: r.day,
                    daypart: r.daypart,
                    time_slot: r.time_slot.clone(),
                    hour: r.hour,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::derive_record;
    use crate::types::{ChannelSlot, Daypart, RawRecord};
    use chrono::NaiveDate;

    fn record(month: u32, hour: u32, category: &str, slots: &[(Option<&str>, Option<f64>)]) -> DerivedRecord {
        let placed_at = NaiveDate::from_ymd_opt(2024, month, 5)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        derive_record(RawRecord {
            placed_at,
            category: category.to_string(),
            slots: slots
                .iter()
                .map(|(c, r)| ChannelSlot {
                    channel: c.map(str::to_string),
                    revenue: *r,
                })
                .collect(),
        })
    }

    fn months(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_matches_category_and_month() {
        let records = vec![
            record(1, 9, "Drama", &[]),
            record(2, 9, "Drama", &[]),
            record(1, 9, "drama", &[]),
            record(1, 9, "Comedy", &[]),
        ];
        let kept = filter_records(&records, "Drama", &months(&["January"]));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].month, "January");
        assert_eq!(kept[0].raw.category, "Drama");
    }

    #[test]
    fn empty_month_selection_yields_nothing() {
        let records = vec![record(1, 9, "Drama", &[]), record(2, 9, "Drama", &[])];
        assert!(filter_records(&records, "Drama", &HashSet::new()).is_empty());
    }

    #[test]
    fn unpivot_drops_unnamed_slots_and_keeps_order() {
        let records = vec![
            record(1, 9, "Drama", &[(Some("BBC1"), Some(500.0)), (None, Some(99.0)), (Some("ITV"), None)]),
            record(1, 21, "Drama", &[(Some("  "), Some(5.0)), (Some("C4"), Some(10.0))]),
        ];
        let refs: Vec<&DerivedRecord> = records.iter().collect();
        let entries = unpivot_channels(&refs);
        let channels: Vec<&str> = entries.iter().map(|e| e.channel.as_str()).collect();
        assert_eq!(channels, vec!["BBC1", "ITV", "C4"]);
        assert_eq!(entries[1].revenue, 0.0);
        assert_eq!(entries[2].hour, 21);
        assert_eq!(entries[2].time_slot, "21:00-22:00");
        assert_eq!(entries[2].daypart, Daypart::Night);
    }

    #[test]
    fn unpivot_conserves_named_revenue() {
        let records = vec![
            record(1, 8, "Drama", &[(Some("BBC1"), Some(120.5)), (Some("ITV"), Some(30.0)), (None, Some(1000.0)), (Some("Web"), Some(7.25))]),
            record(3, 13, "Drama", &[(None, None), (Some("BBC1"), Some(60.0)), (Some("C5"), None), (None, Some(1.0))]),
        ];
        let expected: f64 = records
            .iter()
            .flat_map(|r| r.raw.slots.iter())
            .filter(|s| s.channel.is_some())
            .map(|s| s.revenue.unwrap_or(0.0))
            .sum();
        let refs: Vec<&DerivedRecord> = records.iter().collect();
        let total: f64 = unpivot_channels(&refs).iter().map(|e| e.revenue).sum();
        assert_eq!(total, expected);
        assert_eq!(total, 217.75);
    }

    #[test]
    fn unpivot_of_nothing_is_empty() {
        assert!(unpivot_channels(&[]).is_empty());
    }
}
