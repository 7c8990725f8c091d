//! Per-issuer filings index with the primary point-in-time gate.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use pit_core::{Filing, FormType, IssuerId, PeriodType, PitError, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::RegulatorClient;

const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// Fetches and PIT-filters one issuer's filing history.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilingsIndex;

impl FilingsIndex {
    /// Fetches `issuer`'s filings and returns only those that pass the
    /// **primary PIT gate** (`acceptance_datetime.date <= cutoff_date`,
    /// evaluated in `cutoff_tz`) and match `period_type` (annuals for
    /// annual, quarterlies for quarterly; amendments of either are
    /// included).
    ///
    /// # Errors
    /// Propagates the client's network/auth/not-found errors, or
    /// [`PitError::Parse`] on a malformed submissions payload.
    #[instrument(skip(client))]
    pub async fn fetch(
        client: &RegulatorClient,
        issuer: &IssuerId,
        cutoff_date: NaiveDate,
        period_type: PeriodType,
        cutoff_tz: Tz,
    ) -> Result<Vec<Filing>> {
        let url = format!("{EDGAR_BASE_URL}/submissions/CIK{issuer}.json");
        let body = client.get(&url).await?;
        let submissions: Submissions = serde_json::from_slice(&body)
            .map_err(|e| PitError::Parse(format!("submissions for {issuer}: {e}")))?;

        let recent = submissions.filings.recent;
        let count = recent.accession_number.len();
        let mut filings = Vec::new();

        for i in 0..count {
            let Some(filing) = parse_row(issuer, &recent, i)? else {
                continue;
            };

            if filing.acceptance_datetime.with_timezone(&cutoff_tz).date_naive() > cutoff_date {
                continue;
            }
            if !filing.form_type.matches_period_type(period_type) {
                continue;
            }

            debug_assert!(filing.period_end <= filing.filing_date);
            debug_assert!(filing.filing_date <= filing.acceptance_datetime.date_naive());

            filings.push(filing);
        }

        debug!(issuer = %issuer, count = filings.len(), "PIT-filtered filings");
        Ok(filings)
    }
}

fn parse_row(issuer: &IssuerId, recent: &RecentFilings, i: usize) -> Result<Option<Filing>> {
    let form = recent
        .form
        .get(i)
        .ok_or_else(|| PitError::Parse(format!("{issuer}: missing form at index {i}")))?;
    let form_type = FormType::classify(form);
    if form_type == FormType::Other {
        return Ok(None);
    }

    let accession = recent
        .accession_number
        .get(i)
        .ok_or_else(|| PitError::Parse(format!("{issuer}: missing accessionNumber at index {i}")))?
        .clone();

    let report_date = recent
        .report_date
        .get(i)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PitError::Parse(format!("{issuer}: missing reportDate at index {i}")))?;
    let period_end = parse_date(report_date)?;

    let filing_date = recent
        .filing_date
        .get(i)
        .ok_or_else(|| PitError::Parse(format!("{issuer}: missing filingDate at index {i}")))?;
    let filing_date = parse_date(filing_date)?;

    let acceptance_raw = recent
        .acceptance_date_time
        .get(i)
        .ok_or_else(|| {
            PitError::Parse(format!("{issuer}: missing acceptanceDateTime at index {i}"))
        })?;
    let acceptance_datetime = parse_datetime(acceptance_raw)?;

    Ok(Some(Filing {
        issuer: issuer.clone(),
        form_type,
        period_end,
        filing_date,
        acceptance_datetime,
        accession,
    }))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| PitError::Parse(format!("invalid date {s:?}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PitError::Parse(format!("invalid acceptance datetime {s:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: FilingsBlock,
}

#[derive(Debug, Deserialize)]
struct FilingsBlock {
    recent: RecentFilings,
}

/// The regulator publishes recent filings as parallel arrays rather than an
/// array of objects; each index `i` across these vectors describes one
/// filing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    report_date: Vec<String>,
    acceptance_date_time: Vec<String>,
    form: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent() -> RecentFilings {
        RecentFilings {
            accession_number: vec![
                "0000320193-17-000009".to_string(),
                "0000320193-17-000070".to_string(),
            ],
            filing_date: vec!["2017-02-15".to_string(), "2017-11-03".to_string()],
            report_date: vec!["2016-09-24".to_string(), "2016-09-24".to_string()],
            acceptance_date_time: vec![
                "2017-02-15T06:01:36.000Z".to_string(),
                "2017-11-03T06:01:36.000Z".to_string(),
            ],
            form: vec!["10-K".to_string(), "10-K/A".to_string()],
        }
    }

    #[test]
    fn parses_annual_and_amendment_rows() {
        let issuer = IssuerId::new("320193");
        let recent = recent();

        let row0 = parse_row(&issuer, &recent, 0).unwrap().unwrap();
        assert_eq!(row0.form_type, FormType::Annual);
        assert_eq!(row0.accession, "0000320193-17-000009");

        let row1 = parse_row(&issuer, &recent, 1).unwrap().unwrap();
        assert_eq!(row1.form_type, FormType::Amendment);
    }

    #[test]
    fn other_form_types_are_skipped() {
        let issuer = IssuerId::new("320193");
        let mut recent = recent();
        recent.form[0] = "8-K".to_string();
        assert!(parse_row(&issuer, &recent, 0).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_datetime("not-a-datetime").is_err());
    }
}
