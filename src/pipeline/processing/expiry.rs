use crate::clock::Clock;
use crate::domain::Facility;
use chrono::{DateTime, FixedOffset, Months, NaiveDate};
use std::sync::Arc;
use tracing::{info, warn};

/// Flags facilities holding at least one accreditation that expires within
/// the configured forward-looking horizon.
pub struct ExpiryFilter {
    clock: Arc<dyn Clock>,
    horizon_months: u32,
}

impl ExpiryFilter {
    /// Six-month horizon, the production default.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_horizon(clock, 6)
    }

    pub fn with_horizon(clock: Arc<dyn Clock>, horizon_months: u32) -> Self {
        Self {
            clock,
            horizon_months,
        }
    }

    /// Last calendar date still considered "expiring". Computed once per
    /// filtering pass so the whole batch sees the same cutoff.
    pub fn cutoff(&self) -> NaiveDate {
        self.clock
            .today()
            .checked_add_months(Months::new(self.horizon_months))
            .unwrap_or(NaiveDate::MAX)
    }

    /// True iff `valid_until` parses as an ISO-8601 date (or datetime) on or
    /// before the cutoff. Missing or malformed values are treated as not
    /// expiring rather than failing the record.
    fn is_expiring(valid_until: Option<&str>, cutoff: NaiveDate) -> bool {
        let Some(raw) = valid_until else {
            return false;
        };
        match parse_iso_date(raw) {
            Some(date) => date <= cutoff,
            None => {
                warn!("Unparseable valid_until value '{}', treating as not expiring", raw);
                false
            }
        }
    }

    /// Returns the subsequence of `facilities` with at least one expiring
    /// accreditation, preserving input order. Scanning a facility stops at
    /// its first qualifying accreditation.
    pub fn filter(&self, facilities: Vec<Facility>) -> Vec<Facility> {
        let cutoff = self.cutoff();
        info!(
            "Filtering {} facilities for accreditations expiring on or before {}",
            facilities.len(),
            cutoff
        );

        let mut expiring = Vec::new();
        for facility in facilities {
            let matched = facility
                .accreditations
                .iter()
                .position(|acc| Self::is_expiring(acc.valid_until.as_deref(), cutoff));
            if let Some(idx) = matched {
                let acc = &facility.accreditations[idx];
                info!(
                    "Accreditation of {} with {} is expiring on {}",
                    facility.display_name(),
                    acc.accreditation_body.as_deref().unwrap_or("unknown body"),
                    acc.valid_until.as_deref().unwrap_or("unknown date"),
                );
                expiring.push(facility);
            }
        }

        info!(
            "Found {} facilities with accreditations expiring on or before {}",
            expiring.len(),
            cutoff
        );
        expiring
    }
}

/// Accepts a plain date or a full datetime, taking the date part of the
/// latter. Returns None when neither form parses.
fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Some(date);
    }
    raw.parse::<DateTime<FixedOffset>>()
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{Accreditation, Facility};
    use chrono::NaiveDate;

    fn fixed_filter(year: i32, month: u32, day: u32) -> ExpiryFilter {
        let today = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        ExpiryFilter::new(Arc::new(FixedClock::at_date(today)))
    }

    fn facility(name: &str, valid_untils: &[Option<&str>]) -> Facility {
        Facility {
            facility_id: None,
            facility_name: name.to_string(),
            accreditations: valid_untils
                .iter()
                .map(|v| Accreditation {
                    accreditation_body: Some("JCI".to_string()),
                    valid_until: v.map(|s| s.to_string()),
                    extra: serde_json::Map::new(),
                })
                .collect(),
            location: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_cutoff_is_today_plus_six_months() {
        let filter = fixed_filter(2023, 8, 1);
        assert_eq!(filter.cutoff(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_cutoff_clamps_at_month_end() {
        let filter = fixed_filter(2023, 8, 31);
        assert_eq!(filter.cutoff(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_date_on_cutoff_is_expiring() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(ExpiryFilter::is_expiring(Some("2024-02-01"), cutoff));
        assert!(ExpiryFilter::is_expiring(Some("2024-01-01"), cutoff));
        assert!(!ExpiryFilter::is_expiring(Some("2024-02-02"), cutoff));
    }

    #[test]
    fn test_datetime_values_use_their_date_part() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(ExpiryFilter::is_expiring(
            Some("2024-01-15T09:30:00+00:00"),
            cutoff
        ));
    }

    #[test]
    fn test_malformed_or_missing_dates_are_not_expiring() {
        let cutoff = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(!ExpiryFilter::is_expiring(None, cutoff));
        assert!(!ExpiryFilter::is_expiring(Some(""), cutoff));
        assert!(!ExpiryFilter::is_expiring(Some("next spring"), cutoff));
        assert!(!ExpiryFilter::is_expiring(Some("2024-13-40"), cutoff));
    }

    #[test]
    fn test_filter_includes_facility_expiring_within_horizon() {
        // Today 2023-08-01, cutoff 2024-02-01: a 2024-01-01 expiry is in.
        let filter = fixed_filter(2023, 8, 1);
        let result = filter.filter(vec![facility("A", &[Some("2024-01-01")])]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].facility_name, "A");
    }

    #[test]
    fn test_filter_excludes_facility_outside_horizon() {
        // Today 2023-01-01, cutoff 2023-07-01: a 2024-01-01 expiry is out.
        let filter = fixed_filter(2023, 1, 1);
        let result = filter.filter(vec![facility("A", &[Some("2024-01-01")])]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_preserves_input_order() {
        let filter = fixed_filter(2023, 8, 1);
        let input = vec![
            facility("A", &[Some("2023-09-01")]),
            facility("B", &[Some("2030-01-01")]),
            facility("C", &[None, Some("2023-10-01")]),
            facility("D", &[]),
            facility("E", &[Some("bogus"), Some("2024-02-01")]),
        ];
        let names: Vec<String> = filter
            .filter(input)
            .into_iter()
            .map(|f| f.facility_name)
            .collect();
        assert_eq!(names, vec!["A", "C", "E"]);
    }

    #[test]
    fn test_one_qualifying_accreditation_is_enough() {
        let filter = fixed_filter(2023, 8, 1);
        let result = filter.filter(vec![facility(
            "A",
            &[Some("2030-01-01"), Some("2023-09-01"), Some("2023-10-01")],
        )]);
        assert_eq!(result.len(), 1);
    }
}
