//! The Context Engine: per-tag, per-period fact selection under a cutoff.

use std::collections::HashMap;

use chrono::NaiveDate;
use pit_core::{FormType, PeriodKind, XbrlFact};

/// Tolerance, in days, on fiscal period endpoint matching, absorbs 52/53
/// week fiscal calendar drift relative to a calendar-aligned target period.
pub const FISCAL_PERIOD_TOLERANCE_DAYS: i64 = 3;

/// The fiscal period a [`ContextEngine`] selection targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetPeriod {
    /// Start of the window; `None` for an instant target.
    pub period_start: Option<NaiveDate>,
    /// End of the window, or the instant date.
    pub period_end: NaiveDate,
    /// Whether the target is an instant balance or a duration flow.
    pub kind: PeriodKind,
}

/// Selects the single fact a cutoff-dated observer would have seen for one
/// tag and one target fiscal period.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextEngine;

impl ContextEngine {
    /// Runs the five-step selection algorithm:
    ///
    /// 1. Filter to `filed_date <= cutoff_date` (secondary PIT gate).
    /// 2. Filter to facts matching `target` within
    ///    [`FISCAL_PERIOD_TOLERANCE_DAYS`] on every endpoint.
    /// 3. Filter to consolidated facts.
    /// 4. Tie-break: latest `filed_date` still `<= cutoff_date`.
    /// 5. Further tie-break: among facts filed on the same day, prefer the
    ///    fact from an original (non-amendment) form; otherwise the later
    ///    accession wins.
    ///
    /// `filing_form_types` maps accession → form type so step 5 can tell an
    /// original filing from its amendment; an accession absent from the map
    /// is treated as non-amendment.
    #[must_use]
    pub fn select<'a>(
        &self,
        facts: &'a [XbrlFact],
        target: TargetPeriod,
        cutoff_date: NaiveDate,
        filing_form_types: &HashMap<String, FormType>,
    ) -> Option<&'a XbrlFact> {
        let mut candidates: Vec<&XbrlFact> = facts
            .iter()
            .filter(|f| f.filed_date <= cutoff_date)
            .filter(|f| matches_period(f, &target))
            .filter(|f| f.is_consolidated())
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| {
            b.filed_date
                .cmp(&a.filed_date)
                .then_with(|| {
                    let a_is_amendment = is_amendment(a, filing_form_types);
                    let b_is_amendment = is_amendment(b, filing_form_types);
                    // non-amendment (false) sorts before amendment (true)
                    a_is_amendment.cmp(&b_is_amendment)
                })
                .then_with(|| b.accession.cmp(&a.accession))
        });

        candidates.into_iter().next()
    }
}

fn is_amendment(fact: &XbrlFact, filing_form_types: &HashMap<String, FormType>) -> bool {
    matches!(
        filing_form_types.get(&fact.accession),
        Some(FormType::Amendment)
    )
}

fn matches_period(fact: &XbrlFact, target: &TargetPeriod) -> bool {
    if fact.period_kind != target.kind {
        return false;
    }
    if !within_tolerance(fact.period_end, target.period_end) {
        return false;
    }
    match (fact.period_start, target.period_start) {
        (Some(fact_start), Some(target_start)) => within_tolerance(fact_start, target_start),
        (None, None) => true,
        _ => false,
    }
}

fn within_tolerance(a: NaiveDate, b: NaiveDate) -> bool {
    (a - b).num_days().abs() <= FISCAL_PERIOD_TOLERANCE_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fact(
        value: f64,
        period_end: NaiveDate,
        period_start: Option<NaiveDate>,
        kind: PeriodKind,
        accession: &str,
        filed_date: NaiveDate,
    ) -> XbrlFact {
        XbrlFact {
            tag: "us-gaap:Revenues".to_string(),
            value,
            unit: "USD".to_string(),
            period_start,
            period_end,
            period_kind: kind,
            accession: accession.to_string(),
            filed_date,
            dimensions: BTreeMap::new(),
        }
    }

    #[test]
    fn picks_latest_filed_date_within_cutoff() {
        let target = TargetPeriod {
            period_start: Some(NaiveDate::from_ymd_opt(2015, 9, 27).unwrap()),
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            kind: PeriodKind::Duration,
        };
        let facts = vec![
            fact(
                215_639_000_000.0,
                target.period_end,
                target.period_start,
                PeriodKind::Duration,
                "0000320193-17-000009",
                NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
            ),
            fact(
                999.0,
                target.period_end,
                target.period_start,
                PeriodKind::Duration,
                "0000320193-18-000145",
                NaiveDate::from_ymd_opt(2018, 2, 14).unwrap(),
            ),
        ];
        let mut form_types = HashMap::new();
        form_types.insert("0000320193-17-000009".to_string(), FormType::Annual);
        form_types.insert("0000320193-18-000145".to_string(), FormType::Annual);

        let engine = ContextEngine;
        let cutoff = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let selected = engine.select(&facts, target, cutoff, &form_types).unwrap();
        assert_eq!(selected.accession, "0000320193-17-000009");
    }

    #[test]
    fn restatement_after_cutoff_is_ignored() {
        let target = TargetPeriod {
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            kind: PeriodKind::Instant,
        };
        let original = fact(
            321_686_000_000.0,
            target.period_end,
            None,
            PeriodKind::Instant,
            "0000320193-17-000009",
            NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
        );
        let restated = fact(
            1.0,
            target.period_end,
            None,
            PeriodKind::Instant,
            "0000320193-17-000070",
            NaiveDate::from_ymd_opt(2017, 11, 3).unwrap(),
        );
        let facts = vec![original.clone(), restated];
        let form_types = HashMap::new();

        let engine = ContextEngine;
        let cutoff = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let selected = engine.select(&facts, target, cutoff, &form_types).unwrap();
        assert_eq!(selected.accession, original.accession);
    }

    #[test]
    fn endpoint_within_tolerance_matches_but_four_days_does_not() {
        let target = TargetPeriod {
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            kind: PeriodKind::Instant,
        };
        let near = fact(
            1.0,
            NaiveDate::from_ymd_opt(2016, 9, 27).unwrap(),
            None,
            PeriodKind::Instant,
            "acc-1",
            NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
        );
        let far = fact(
            2.0,
            NaiveDate::from_ymd_opt(2016, 9, 28).unwrap(),
            None,
            PeriodKind::Instant,
            "acc-2",
            NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
        );

        assert!(matches_period(&near, &target));
        assert!(!matches_period(&far, &target));
    }

    #[test]
    fn segment_dimensioned_facts_are_excluded() {
        let target = TargetPeriod {
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            kind: PeriodKind::Instant,
        };
        let mut segment = fact(
            1.0,
            target.period_end,
            None,
            PeriodKind::Instant,
            "acc-1",
            NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
        );
        segment
            .dimensions
            .insert("srt:ProductOrServiceAxis".to_string(), "aapl:IPhoneMember".to_string());

        let engine = ContextEngine;
        let cutoff = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        let selected = engine.select(&[segment], target, cutoff, &HashMap::new());
        assert!(selected.is_none());
    }
}
