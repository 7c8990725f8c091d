//! The Snapshot Builder: concurrent per-ticker orchestration, coverage
//! reporting, and the final cross-ticker validation pass.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use pit_core::{
    BalanceSheetRow, CashFlowRow, CompanyMasterRow, CoverageReport, DerivedMetricsRow,
    EngineConfig, FilingRow, FormType, IncomeStatementRow, IssueKind, PeriodType, PitError,
    Result, ResponseCache, SnapshotRequest, SnapshotResult, Ticker, TickerIssue,
};
use pit_edgar::{CikMap, FilingsIndex, RegulatorClient, XbrlFetcher};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::context::TargetPeriod;
use crate::select::FilingSelector;
use crate::assemble::StatementAssembler;

const IDENTITY_TOLERANCE: f64 = 0.01;

/// Orchestrates a full [`SnapshotRequest`] across many tickers, bounded by
/// `config.max_concurrency()`, and assembles the final [`SnapshotResult`].
#[derive(Debug)]
pub struct SnapshotBuilder {
    config: EngineConfig,
    client: RegulatorClient,
    cik_map: Arc<CikMap>,
}

/// Everything one ticker's pipeline produced, folded into the accumulators
/// by [`SnapshotBuilder::build`].
#[derive(Default)]
struct TickerOutput {
    ticker: Ticker,
    company_master: Option<CompanyMasterRow>,
    filings: Vec<FilingRow>,
    income: Vec<IncomeStatementRow>,
    balance: Vec<BalanceSheetRow>,
    cashflow: Vec<CashFlowRow>,
    derived: Vec<DerivedMetricsRow>,
    issues: Vec<TickerIssue>,
}

impl SnapshotBuilder {
    /// Builds a snapshot builder from configuration, a shared response
    /// cache, and a freshly loaded ticker→issuer registry.
    ///
    /// # Errors
    /// Propagates [`PitError::Auth`] if the HTTP client cannot be built, or
    /// any network/parse error from loading the ticker registry.
    pub async fn new(config: EngineConfig, cache: Arc<dyn ResponseCache>) -> Result<Self> {
        let client = RegulatorClient::new(&config, cache)?;
        let cik_map = CikMap::load(&client).await?.into_shared();
        Ok(Self {
            config,
            client,
            cik_map,
        })
    }

    /// Runs `request` to completion, processing up to
    /// `config.max_concurrency()` tickers in parallel. On cancellation via
    /// `cancel`, no new ticker tasks are dispatched, in-flight ones are
    /// allowed to finish or are abandoned, and no partial
    /// [`SnapshotResult`] is returned.
    ///
    /// # Errors
    /// Returns [`PitError::CutoffViolation`] if any selected filing's
    /// acceptance date is found to exceed `request.cutoff_date` (a
    /// programming-error signal upstream filtering should have prevented),
    /// or [`PitError::Other`] if the run was canceled.
    #[instrument(skip(self, request, cancel))]
    pub async fn build(
        &self,
        request: SnapshotRequest,
        cancel: CancellationToken,
    ) -> Result<SnapshotResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency().max(1)));
        let requested = request.tickers.clone();

        let tasks = requested.iter().cloned().map(|ticker| {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let cutoff_date = request.cutoff_date;
            let period_type = request.period_type;
            let this = self;
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                if cancel.is_cancelled() {
                    return None;
                }
                Some(this.run_ticker(ticker, cutoff_date, period_type).await)
            }
        });

        let outputs: Vec<TickerOutput> = join_all(tasks).await.into_iter().flatten().collect();

        if cancel.is_cancelled() {
            return Err(PitError::Other("snapshot build was canceled".to_string()));
        }

        Ok(self.merge(requested, outputs, request.cutoff_date))
    }

    #[instrument(skip(self))]
    async fn run_ticker(
        &self,
        ticker: Ticker,
        cutoff_date: NaiveDate,
        period_type: PeriodType,
    ) -> TickerOutput {
        let mut out = TickerOutput {
            ticker: ticker.clone(),
            ..Default::default()
        };

        let Some(issuer) = self.cik_map.resolve(&ticker).cloned() else {
            out.issues.push(TickerIssue {
                ticker: ticker.clone(),
                kind: IssueKind::NotFound,
                message: "ticker did not resolve to a regulator issuer id".to_string(),
            });
            return out;
        };

        let filtered_filings = match FilingsIndex::fetch(
            &self.client,
            &issuer,
            cutoff_date,
            period_type,
            self.config.cutoff_timezone(),
        )
        .await
        {
            Ok(filings) if filings.is_empty() => {
                out.issues.push(TickerIssue {
                    ticker: ticker.clone(),
                    kind: IssueKind::NotFound,
                    message: "no point-in-time filings found for this period type".to_string(),
                });
                return out;
            }
            Ok(filings) => filings,
            Err(e) => {
                out.issues.push(ticker_issue(&ticker, &e));
                return out;
            }
        };

        let selected = match FilingSelector.select(
            &filtered_filings,
            cutoff_date,
            self.config.cutoff_timezone(),
        ) {
            Ok(selected) => selected,
            Err(e) => {
                warn!(%ticker, %e, "cutoff violation during filing selection");
                out.issues.push(ticker_issue(&ticker, &e));
                return out;
            }
        };

        let facts = match XbrlFetcher::fetch(&self.client, &issuer).await {
            Ok(facts) => facts,
            Err(e) => {
                out.issues.push(ticker_issue(&ticker, &e));
                return out;
            }
        };

        out.company_master = Some(CompanyMasterRow {
            ticker: ticker.clone(),
            issuer_id: issuer.clone(),
        });

        let mut filing_form_types: HashMap<String, FormType> = HashMap::new();
        let mut filing_acceptance: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut periods: Vec<NaiveDate> = Vec::new();
        for filing in &selected {
            filing_form_types.insert(filing.accession.clone(), filing.form_type);
            filing_acceptance.insert(filing.accession.clone(), filing.acceptance_datetime);
            periods.push(filing.period_end);
            out.filings.push(FilingRow {
                ticker: ticker.clone(),
                issuer_id: issuer.clone(),
                accession: filing.accession.clone(),
                form_type: filing.form_type,
                period_end: filing.period_end,
                filing_date: filing.filing_date,
                acceptance_datetime: filing.acceptance_datetime,
            });
        }
        periods.sort();
        periods.dedup();

        let assembler = StatementAssembler::default();
        let mut previous_balance: Option<BalanceSheetRow> = None;
        for period_end in periods {
            let duration_target = TargetPeriod {
                period_start: fiscal_period_start(period_type, period_end),
                period_end,
                kind: pit_core::PeriodKind::Duration,
            };
            let instant_target = TargetPeriod {
                period_start: None,
                period_end,
                kind: pit_core::PeriodKind::Instant,
            };

            let income = assembler.assemble_income(
                &ticker,
                duration_target,
                &facts,
                cutoff_date,
                &filing_form_types,
                &filing_acceptance,
            );
            let balance = assembler.assemble_balance(
                &ticker,
                instant_target,
                &facts,
                cutoff_date,
                &filing_form_types,
                &filing_acceptance,
            );
            let cashflow = assembler.assemble_cashflow(
                &ticker,
                duration_target,
                &facts,
                cutoff_date,
                &filing_form_types,
                &filing_acceptance,
            );
            let derived = assembler.assemble_derived(
                &ticker,
                period_end,
                income.as_ref(),
                balance.as_ref(),
                cashflow.as_ref(),
            );

            if let Err(message) =
                validate_period(balance.as_ref(), cashflow.as_ref(), previous_balance.as_ref())
            {
                out.issues.push(TickerIssue {
                    ticker: ticker.clone(),
                    kind: IssueKind::ValidationWarning,
                    message,
                });
            }

            if let Some(balance) = &balance {
                previous_balance = Some(balance.clone());
            }

            out.income.extend(income);
            out.balance.extend(balance);
            out.cashflow.extend(cashflow);
            out.derived.extend(derived);
        }

        out
    }

    fn merge(
        &self,
        requested: Vec<Ticker>,
        outputs: Vec<TickerOutput>,
        cutoff_date: NaiveDate,
    ) -> SnapshotResult {
        let mut result = SnapshotResult {
            cutoff_date,
            coverage: CoverageReport {
                requested: requested.clone(),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut income_by_key: BTreeMap<(Ticker, NaiveDate), IncomeStatementRow> = BTreeMap::new();
        let mut balance_by_key: BTreeMap<(Ticker, NaiveDate), BalanceSheetRow> = BTreeMap::new();
        let mut cashflow_by_key: BTreeMap<(Ticker, NaiveDate), CashFlowRow> = BTreeMap::new();
        let mut derived_by_key: BTreeMap<(Ticker, NaiveDate), DerivedMetricsRow> = BTreeMap::new();

        for output in outputs {
            if let Some(company_master) = output.company_master {
                result.coverage.resolved.push(output.ticker.clone());
                result.company_master.push(company_master);
            } else {
                result.coverage.missing_tickers.push(output.ticker.clone());
            }
            result.filings.extend(output.filings);
            result.coverage.per_ticker_issues.extend(output.issues);

            merge_latest(&mut income_by_key, output.income, |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);
            merge_latest(&mut balance_by_key, output.balance, |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);
            merge_latest(&mut cashflow_by_key, output.cashflow, |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);
            merge_latest(&mut derived_by_key, output.derived, |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);
        }

        result.statements_income = income_by_key.into_values().collect();
        result.statements_balance = balance_by_key.into_values().collect();
        result.statements_cashflow = cashflow_by_key.into_values().collect();
        result.derived_metrics = derived_by_key.into_values().collect();

        info!(
            resolved = result.coverage.resolved.len(),
            missing = result.coverage.missing_tickers.len(),
            "snapshot build complete"
        );

        result
    }
}

fn merge_latest<K: Ord, R: Clone>(
    map: &mut BTreeMap<K, R>,
    rows: Vec<R>,
    key_of: impl Fn(&R) -> K,
    asof_of: impl Fn(&R) -> DateTime<Utc>,
) {
    for row in rows {
        let key = key_of(&row);
        match map.get(&key) {
            Some(existing) if asof_of(existing) >= asof_of(&row) => {}
            _ => {
                map.insert(key, row);
            }
        }
    }
}

fn fiscal_period_start(period_type: PeriodType, period_end: NaiveDate) -> Option<NaiveDate> {
    match period_type {
        PeriodType::Annual => period_end.checked_sub_months(chrono::Months::new(12)),
        PeriodType::Quarterly => period_end.checked_sub_months(chrono::Months::new(3)),
    }
}

fn ticker_issue(ticker: &Ticker, error: &PitError) -> TickerIssue {
    let kind = match error {
        PitError::Network(_) => IssueKind::Network,
        PitError::Parse(_) => IssueKind::Parse,
        PitError::NotFound(_) => IssueKind::NotFound,
        _ => IssueKind::Network,
    };
    TickerIssue {
        ticker: ticker.clone(),
        kind,
        message: error.to_string(),
    }
}

/// Soft post-hoc validation: balance sheet identity and the cashflow
/// identity. Both are warnings, never errors, a drift beyond tolerance is
/// recorded as a [`TickerIssue`], the row is still emitted.
///
/// `previous_balance` is the prior fiscal period's balance row (periods are
/// processed in ascending `period_end` order in `run_ticker`), its
/// `cash_and_equivalents` is the opening cash the cashflow identity checks
/// against this period's net change in cash.
fn validate_period(
    balance: Option<&BalanceSheetRow>,
    cashflow: Option<&CashFlowRow>,
    previous_balance: Option<&BalanceSheetRow>,
) -> std::result::Result<(), String> {
    if let Some(balance) = balance {
        if let (Some(assets), Some(liabilities), Some(equity)) =
            (balance.total_assets, balance.total_liabilities, balance.stockholders_equity)
        {
            let drift = (assets - (liabilities + equity)).abs();
            let tolerance = assets.abs() * IDENTITY_TOLERANCE;
            if drift > tolerance {
                return Err(format!(
                    "balance sheet identity off by {drift:.2} (tolerance {tolerance:.2}) for period {}",
                    balance.period_end
                ));
            }
        }
    }

    if let (Some(cashflow), Some(balance), Some(previous_balance)) =
        (cashflow, balance, previous_balance)
    {
        if let (Some(opening_cash), Some(closing_cash), Some(ocf), Some(icf), Some(fcf)) = (
            previous_balance.cash_and_equivalents,
            balance.cash_and_equivalents,
            cashflow.operating_cash_flow,
            cashflow.investing_cash_flow,
            cashflow.financing_cash_flow,
        ) {
            let implied_closing = opening_cash + ocf + icf + fcf;
            let drift = (implied_closing - closing_cash).abs();
            let tolerance = closing_cash.abs() * IDENTITY_TOLERANCE;
            if drift > tolerance {
                return Err(format!(
                    "cashflow identity off by {drift:.2} (tolerance {tolerance:.2}) for period {}",
                    balance.period_end
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn merge_latest_keeps_the_later_asof_date() {
        let mut map = BTreeMap::new();
        let ticker = Ticker::new("AAPL");
        let period_end = NaiveDate::from_ymd_opt(2016, 9, 24).unwrap();
        let older = IncomeStatementRow {
            ticker: ticker.clone(),
            period_end,
            asof_date: chrono::Utc.with_ymd_and_hms(2017, 2, 15, 0, 0, 0).unwrap(),
            accession: "older".to_string(),
            ..Default::default()
        };
        let newer = IncomeStatementRow {
            ticker: ticker.clone(),
            period_end,
            asof_date: chrono::Utc.with_ymd_and_hms(2017, 11, 3, 0, 0, 0).unwrap(),
            accession: "newer".to_string(),
            ..Default::default()
        };

        merge_latest(&mut map, vec![older], |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);
        merge_latest(&mut map, vec![newer], |r| (r.ticker.clone(), r.period_end), |r| r.asof_date);

        assert_eq!(map.len(), 1);
        assert_eq!(map.values().next().unwrap().accession, "newer");
    }

    #[test]
    fn balance_identity_within_tolerance_is_not_flagged() {
        let balance = BalanceSheetRow {
            total_assets: Some(100.0),
            total_liabilities: Some(60.0),
            stockholders_equity: Some(40.5),
            ..Default::default()
        };
        assert!(validate_period(Some(&balance), None, None).is_ok());
    }

    #[test]
    fn balance_identity_outside_tolerance_is_flagged() {
        let balance = BalanceSheetRow {
            total_assets: Some(100.0),
            total_liabilities: Some(60.0),
            stockholders_equity: Some(30.0),
            ..Default::default()
        };
        assert!(validate_period(Some(&balance), None, None).is_err());
    }

    #[test]
    fn cashflow_identity_within_tolerance_is_not_flagged() {
        let previous_balance = BalanceSheetRow {
            cash_and_equivalents: Some(100.0),
            ..Default::default()
        };
        let balance = BalanceSheetRow {
            cash_and_equivalents: Some(130.0),
            ..Default::default()
        };
        let cashflow = CashFlowRow {
            operating_cash_flow: Some(50.0),
            investing_cash_flow: Some(-15.0),
            financing_cash_flow: Some(-5.0),
            ..Default::default()
        };
        assert!(
            validate_period(Some(&balance), Some(&cashflow), Some(&previous_balance)).is_ok()
        );
    }

    #[test]
    fn cashflow_identity_outside_tolerance_is_flagged() {
        let previous_balance = BalanceSheetRow {
            cash_and_equivalents: Some(100.0),
            ..Default::default()
        };
        let balance = BalanceSheetRow {
            cash_and_equivalents: Some(130.0),
            ..Default::default()
        };
        let cashflow = CashFlowRow {
            operating_cash_flow: Some(50.0),
            investing_cash_flow: Some(0.0),
            financing_cash_flow: Some(0.0),
            ..Default::default()
        };
        assert!(
            validate_period(Some(&balance), Some(&cashflow), Some(&previous_balance)).is_err()
        );
    }

    #[test]
    fn cashflow_identity_skipped_without_a_prior_period_balance() {
        let balance = BalanceSheetRow {
            cash_and_equivalents: Some(130.0),
            ..Default::default()
        };
        let cashflow = CashFlowRow {
            operating_cash_flow: Some(50.0),
            investing_cash_flow: Some(-1000.0),
            financing_cash_flow: Some(0.0),
            ..Default::default()
        };
        assert!(validate_period(Some(&balance), Some(&cashflow), None).is_ok());
    }

    #[test]
    fn missing_ticker_issue_classifies_as_network() {
        let ticker = Ticker::new("AAPL");
        let issue = ticker_issue(&ticker, &PitError::Network("boom".to_string()));
        assert_eq!(issue.kind, IssueKind::Network);
    }
}
