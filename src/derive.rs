//! Calendar and time-of-day fields derived from the sale placement timestamp.
//!
//! Daypart boundaries and the one-hour slot labels are business rules of the
//! sales team and are kept as literal constants.
use chrono::{Datelike, Timelike};

use crate::types::{Daypart, DerivedRecord, RawRecord};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// [5,12) Morning, [12,17) Afternoon, [17,21) Evening, anything else Night.
pub fn daypart(hour: u32) -> Daypart {
    match hour {
        5..=11 => Daypart::Morning,
        12..=16 => Daypart::Afternoon,
        17..=20 => Daypart::Evening,
        _ => Daypart::Night,
    }
}

/// One-hour label such as `09:00-10:00`; hour 23 wraps to `23:00-00:00`.
pub fn time_slot(hour: u32) -> String {
    format!("{:02}:00-{:02}:00", hour, (hour + 1) % 24)
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month as usize).saturating_sub(1) % 12]
}

pub fn derive_record(raw: RawRecord) -> DerivedRecord {
    let ts = raw.placed_at;
    let hour = ts.hour();
    DerivedRecord {
        month: month_name(ts.month()).to_string(),
        day: ts.date(),
        hour,
        daypart: daypart(hour),
        time_slot: time_slot(hour),
        raw,
    }
}

pub fn derive_all(raw: Vec<RawRecord>) -> Vec<DerivedRecord> {
    raw.into_iter().map(derive_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn daypart_boundaries() {
        assert_eq!(daypart(5), Daypart::Morning);
        assert_eq!(daypart(11), Daypart::Morning);
        assert_eq!(daypart(12), Daypart::Afternoon);
        assert_eq!(daypart(16), Daypart::Afternoon);
        assert_eq!(daypart(17), Daypart::Evening);
        assert_eq!(daypart(20), Daypart::Evening);
        assert_eq!(daypart(21), Daypart::Night);
        assert_eq!(daypart(23), Daypart::Night);
        assert_eq!(daypart(4), Daypart::Night);
        assert_eq!(daypart(0), Daypart::Night);
    }

    #[test]
    fn time_slot_labels() {
        assert_eq!(time_slot(0), "00:00-01:00");
        assert_eq!(time_slot(9), "09:00-10:00");
        assert_eq!(time_slot(14), "14:00-15:00");
        assert_eq!(time_slot(23), "23:00-00:00");
    }

    #[test]
    fn derived_fields_agree_with_hour() {
        let placed_at = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(18, 45, 0)
            .unwrap();
        let derived = derive_record(RawRecord {
            placed_at,
            category: "Drama".to_string(),
            slots: vec![],
        });
        assert_eq!(derived.month, "February");
        assert_eq!(derived.day, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(derived.hour, 18);
        assert_eq!(derived.daypart, daypart(derived.hour));
        assert_eq!(derived.time_slot, time_slot(derived.hour));
        assert_eq!(derived.daypart, Daypart::Evening);
    }

    #[test]
    fn every_hour_has_a_consistent_label() {
        for hour in 0..24 {
            let label = time_slot(hour);
            assert_eq!(label.len(), 11);
            assert!(label.starts_with(&format!("{:02}:00", hour)));
        }
    }
}
