//! The Filing Selector: the best filing version per fiscal period, with the
//! cutoff assertion that aborts a snapshot on violation.

use std::collections::HashMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use pit_core::{Filing, PitError, Result};
use tracing::instrument;

/// Groups PIT-filtered filings by fiscal period and keeps the latest
/// `acceptance_datetime` per period.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilingSelector;

impl FilingSelector {
    /// Selects one filing per `period_end`, preferring the latest
    /// `acceptance_datetime`.
    ///
    /// `cutoff_tz` must be the same zone the Filings Index's primary PIT
    /// gate used to day-bound `acceptance_datetime` (`EngineConfig::cutoff_timezone`);
    /// comparing in UTC here instead would reject filings the primary gate
    /// already accepted whenever a late-evening acceptance in `cutoff_tz`
    /// falls on the next UTC day.
    ///
    /// # Errors
    /// Returns [`PitError::CutoffViolation`] if any selected filing's
    /// acceptance date, converted to `cutoff_tz`, falls after `cutoff_date`.
    /// The filter chain upstream (Filings Index, §4.5) should already
    /// exclude these; surviving here is a programming error, never an
    /// expected runtime outcome, so the snapshot aborts rather than
    /// silently dropping the offending filing.
    #[instrument(skip(filings))]
    pub fn select(
        &self,
        filings: &[Filing],
        cutoff_date: NaiveDate,
        cutoff_tz: Tz,
    ) -> Result<Vec<Filing>> {
        let mut best: HashMap<NaiveDate, &Filing> = HashMap::new();
        for filing in filings {
            best.entry(filing.period_end)
                .and_modify(|current| {
                    if filing.acceptance_datetime > current.acceptance_datetime {
                        *current = filing;
                    }
                })
                .or_insert(filing);
        }

        let mut selected: Vec<Filing> = best.into_values().cloned().collect();
        selected.sort_by_key(|f| f.period_end);

        for filing in &selected {
            if filing.acceptance_datetime.with_timezone(&cutoff_tz).date_naive() > cutoff_date {
                return Err(PitError::CutoffViolation(format!(
                    "filing {} for period {} accepted {} after cutoff {cutoff_date}",
                    filing.accession, filing.period_end, filing.acceptance_datetime
                )));
            }
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pit_core::{FormType, IssuerId};

    fn filing(period_end: NaiveDate, accepted: chrono::DateTime<Utc>, accession: &str) -> Filing {
        Filing {
            issuer: IssuerId::new("320193"),
            form_type: FormType::Annual,
            period_end,
            filing_date: accepted.date_naive(),
            acceptance_datetime: accepted,
            accession: accession.to_string(),
        }
    }

    #[test]
    fn picks_latest_acceptance_per_period() {
        let period = NaiveDate::from_ymd_opt(2016, 9, 24).unwrap();
        let older = filing(period, Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(), "older");
        let newer = filing(period, Utc.with_ymd_and_hms(2017, 11, 3, 9, 0, 0).unwrap(), "newer");

        let selector = FilingSelector;
        let cutoff = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let selected = selector.select(&[older, newer], cutoff, chrono_tz::UTC).unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].accession, "newer");
    }

    #[test]
    fn distinct_periods_each_keep_their_own_filing() {
        let fy2016 = filing(
            NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(),
            "fy2016",
        );
        let fy2017 = filing(
            NaiveDate::from_ymd_opt(2017, 9, 30).unwrap(),
            Utc.with_ymd_and_hms(2017, 11, 3, 9, 0, 0).unwrap(),
            "fy2017",
        );

        let selector = FilingSelector;
        let cutoff = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let selected = selector.select(&[fy2016, fy2017], cutoff, chrono_tz::UTC).unwrap();

        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn acceptance_after_cutoff_raises_cutoff_violation() {
        let period = NaiveDate::from_ymd_opt(2016, 9, 24).unwrap();
        let late = filing(period, Utc.with_ymd_and_hms(2018, 6, 1, 9, 0, 0).unwrap(), "late");

        let selector = FilingSelector;
        let cutoff = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let err = selector.select(&[late], cutoff, chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, PitError::CutoffViolation(_)));
    }

    #[test]
    fn late_evening_eastern_acceptance_on_cutoff_day_is_not_a_violation() {
        // 2017-02-15 23:30 America/New_York is already 2017-02-16 UTC; the
        // tz-aware check must still treat this as accepted on the cutoff day.
        let period = NaiveDate::from_ymd_opt(2016, 9, 24).unwrap();
        let accepted = Utc.with_ymd_and_hms(2017, 2, 16, 4, 30, 0).unwrap();
        let late_et = filing(period, accepted, "late-et");

        let selector = FilingSelector;
        let cutoff = NaiveDate::from_ymd_opt(2017, 2, 15).unwrap();
        let selected = selector
            .select(&[late_et], cutoff, chrono_tz::America::New_York)
            .unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].accession, "late-et");
    }
}
