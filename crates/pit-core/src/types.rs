//! Core data types for the point-in-time fundamentals pipeline.
//!
//! This module defines the vocabulary shared by every downstream crate:
//!
//! - [`Ticker`] / [`IssuerId`], identity
//! - [`Filing`] / [`FormType`], the regulator's filing record and PIT gate
//! - [`XbrlFact`] / [`PeriodKind`], a single tagged regulator value
//! - [`StandardField`] / [`TagMapping`], the closed canonical schema
//! - [`SnapshotRequest`] / [`SnapshotResult`] / [`CoverageReport`], the
//!   engine's public input/output surface
//! - the typed statement rows: [`CompanyMasterRow`], [`FilingRow`],
//!   [`IncomeStatementRow`], [`BalanceSheetRow`], [`CashFlowRow`],
//!   [`DerivedMetricsRow`]

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An equity ticker symbol.
///
/// Tickers are normalized to uppercase on construction so lookups are
/// case-insensitive by default.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker, uppercasing the input.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The regulator's issuer identifier (CIK).
///
/// Stored as the fixed-width zero-padded string the regulator publishes, not
/// as an integer, leading zeros are significant in URLs and in the
/// ticker→issuer registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssuerId(String);

impl IssuerId {
    /// Creates an issuer id from a raw CIK, zero-padding to 10 digits.
    #[must_use]
    pub fn new(cik: impl Into<String>) -> Self {
        let raw = cik.into();
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        Self(format!("{digits:0>10}"))
    }

    /// Returns the zero-padded CIK string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssuerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of regulatory form a filing represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// An annual report (10-K).
    Annual,
    /// A quarterly report (10-Q).
    Quarterly,
    /// An amendment to either (10-K/A, 10-Q/A).
    Amendment,
    /// Any other form, not used for statement assembly.
    Other,
}

impl FormType {
    /// Classifies a raw SEC form string (e.g. `"10-K"`, `"10-Q/A"`).
    #[must_use]
    pub fn classify(form: &str) -> Self {
        let is_amendment = form.ends_with("/A");
        let base = form.trim_end_matches("/A");
        match (base, is_amendment) {
            ("10-K", true) | ("10-K405", true) => Self::Amendment,
            ("10-Q", true) => Self::Amendment,
            ("10-K" | "10-K405", false) => Self::Annual,
            ("10-Q", false) => Self::Quarterly,
            _ => Self::Other,
        }
    }

    /// Whether this form type matches a requested [`PeriodType`], including
    /// amendments of the matching base type.
    #[must_use]
    pub const fn matches_period_type(self, period_type: PeriodType) -> bool {
        matches!(
            (self, period_type),
            (Self::Annual | Self::Amendment, PeriodType::Annual)
                | (Self::Quarterly | Self::Amendment, PeriodType::Quarterly)
        )
    }
}

/// Whether a snapshot targets annual or quarterly statements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Fiscal-year statements (10-K).
    Annual,
    /// Fiscal-quarter statements (10-Q).
    Quarterly,
}

/// A single filing record as published by the regulator's filings index.
///
/// Invariant: `period_end <= filing_date <= acceptance_datetime`. Callers
/// that construct a `Filing` directly from regulator JSON should assert this
/// rather than silently accept malformed data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// The issuer this filing belongs to.
    pub issuer: IssuerId,
    /// The kind of form filed.
    pub form_type: FormType,
    /// The fiscal period end this filing reports on.
    pub period_end: NaiveDate,
    /// The date printed on the filing itself.
    pub filing_date: NaiveDate,
    /// The second-granular timestamp at which the regulator received the
    /// filing. The sole point-in-time availability gate.
    pub acceptance_datetime: DateTime<Utc>,
    /// The regulator's accession number, unique per filing.
    pub accession: String,
}

/// Whether an [`XbrlFact`] represents a point-in-time balance or a
/// duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    /// A balance as of a single instant (e.g. total assets).
    Instant,
    /// A flow accumulated over a start/end window (e.g. revenue).
    Duration,
}

/// One tagged numeric value reported by the regulator, with full provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XbrlFact {
    /// The regulator-specific taxonomy tag (e.g. `us-gaap:Revenues`).
    pub tag: String,
    /// The reported numeric value.
    pub value: f64,
    /// The unit of measure (e.g. `"USD"`, `"shares"`, `"USD-per-shares"`).
    pub unit: String,
    /// Start of the reporting window; `None` for instant facts.
    pub period_start: Option<NaiveDate>,
    /// End of the reporting window, or the instant date.
    pub period_end: NaiveDate,
    /// Whether this fact is an instant or a duration.
    pub period_kind: PeriodKind,
    /// The accession of the filing this fact was reported in.
    pub accession: String,
    /// The date the source filing was accepted by the regulator.
    pub filed_date: NaiveDate,
    /// Axis → member dimensional qualifiers. Empty (or containing only
    /// known "total" members) means the fact is consolidated.
    pub dimensions: BTreeMap<String, String>,
}

impl XbrlFact {
    /// A fact is consolidated iff it carries no dimensions, or only
    /// dimensions naming an explicit "total" member.
    #[must_use]
    pub fn is_consolidated(&self) -> bool {
        const TOTAL_MEMBERS: &[&str] = &["ConsolidatedEntitiesMember", "TotalMember"];
        self.dimensions
            .values()
            .all(|member| TOTAL_MEMBERS.contains(&member.as_str()))
    }
}

/// The closed set of canonical line items this pipeline produces.
///
/// Grouped by statement for readability; the variant order here has no
/// bearing on tag priority (that lives in [`TagMapping`] and in
/// `pit-engine`'s tag table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardField {
    // Income statement
    /// Total revenue.
    Revenue,
    /// Cost of revenue / cost of goods sold.
    CostOfRevenue,
    /// Gross profit.
    GrossProfit,
    /// Research and development expense.
    ResearchAndDevelopmentExpense,
    /// Selling, general and administrative expense.
    SellingGeneralAdministrativeExpense,
    /// Operating expenses.
    OperatingExpenses,
    /// Operating income.
    OperatingIncome,
    /// Net income.
    NetIncome,
    /// Earnings before interest, taxes, depreciation and amortization.
    Ebitda,
    /// Basic earnings per share.
    EpsBasic,
    /// Diluted earnings per share.
    EpsDiluted,
    /// Interest expense.
    InterestExpense,
    /// Interest income.
    InterestIncome,
    /// Income before income taxes.
    PretaxIncome,
    /// Income tax expense (or benefit).
    IncomeTaxExpense,

    // Balance sheet
    /// Total assets.
    TotalAssets,
    /// Current assets.
    CurrentAssets,
    /// Cash and cash equivalents.
    CashAndEquivalents,
    /// Short-term investments.
    ShortTermInvestments,
    /// Inventory.
    Inventory,
    /// Accounts receivable.
    AccountsReceivable,
    /// Net property, plant and equipment.
    PropertyPlantEquipmentNet,
    /// Goodwill.
    Goodwill,
    /// Total liabilities.
    TotalLiabilities,
    /// Current liabilities.
    CurrentLiabilities,
    /// Long-term debt.
    LongTermDebt,
    /// Short-term debt.
    ShortTermDebt,
    /// Total debt (long-term + short-term).
    TotalDebt,
    /// Accounts payable.
    AccountsPayable,
    /// Stockholders' equity.
    StockholdersEquity,

    // Cash flow statement
    /// Depreciation and amortization.
    DepreciationAndAmortization,
    /// Cash from operating activities.
    OperatingCashFlow,
    /// Cash used in investing activities.
    InvestingCashFlow,
    /// Cash from financing activities.
    FinancingCashFlow,
    /// Capital expenditures.
    CapitalExpenditures,
    /// Free cash flow (operating cash flow less capital expenditures).
    FreeCashFlow,
    /// Dividends paid.
    DividendsPaid,

    // Shares
    /// Basic weighted-average shares outstanding.
    SharesOutstanding,
    /// Diluted weighted-average shares outstanding.
    SharesOutstandingDiluted,
}

impl StandardField {
    /// Every canonical line item, in declaration order. Used by the tag
    /// mapper to assert its table has no gaps.
    pub const ALL: &'static [StandardField] = &[
        Self::Revenue,
        Self::CostOfRevenue,
        Self::GrossProfit,
        Self::ResearchAndDevelopmentExpense,
        Self::SellingGeneralAdministrativeExpense,
        Self::OperatingExpenses,
        Self::OperatingIncome,
        Self::NetIncome,
        Self::Ebitda,
        Self::EpsBasic,
        Self::EpsDiluted,
        Self::InterestExpense,
        Self::InterestIncome,
        Self::PretaxIncome,
        Self::IncomeTaxExpense,
        Self::TotalAssets,
        Self::CurrentAssets,
        Self::CashAndEquivalents,
        Self::ShortTermInvestments,
        Self::Inventory,
        Self::AccountsReceivable,
        Self::PropertyPlantEquipmentNet,
        Self::Goodwill,
        Self::TotalLiabilities,
        Self::CurrentLiabilities,
        Self::LongTermDebt,
        Self::ShortTermDebt,
        Self::TotalDebt,
        Self::AccountsPayable,
        Self::StockholdersEquity,
        Self::DepreciationAndAmortization,
        Self::OperatingCashFlow,
        Self::InvestingCashFlow,
        Self::FinancingCashFlow,
        Self::CapitalExpenditures,
        Self::FreeCashFlow,
        Self::DividendsPaid,
        Self::SharesOutstanding,
        Self::SharesOutstandingDiluted,
    ];
}

/// An ordered list of regulator tags that resolve to one [`StandardField`].
///
/// `priority_tags` order is semantically significant: the first tag with a
/// valid fact for the target period wins. The order is append-only by
/// contract, inserting ahead of an existing tag would silently change
/// historical backtest results.
#[derive(Clone, Debug)]
pub struct TagMapping {
    /// The canonical field this mapping resolves.
    pub field: StandardField,
    /// Candidate regulator tags, highest priority first.
    pub priority_tags: Vec<&'static str>,
    /// Whether the reported sign convention is a credit needing negation to
    /// match statement-as-reported convention.
    pub is_credit: bool,
    /// Whether this field is expected to resolve to an instant or a
    /// duration fact.
    pub expected_period_kind: PeriodKind,
}

/// A request to build one point-in-time snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotRequest {
    /// Tickers to resolve and build statements for.
    pub tickers: Vec<Ticker>,
    /// The historical date the snapshot is taken as of.
    pub cutoff_date: NaiveDate,
    /// Whether to build annual or quarterly statements.
    pub period_type: PeriodType,
    /// Always `false` for this core; reserved for a future estimates
    /// collaborator.
    pub allow_estimates: bool,
    /// Always `false` for this core; last-twelve-months is out of scope.
    pub allow_ltm: bool,
}

impl SnapshotRequest {
    /// Builds a request with `allow_estimates` and `allow_ltm` forced to
    /// `false`, as required by this core.
    #[must_use]
    pub fn new(tickers: Vec<Ticker>, cutoff_date: NaiveDate, period_type: PeriodType) -> Self {
        Self {
            tickers,
            cutoff_date,
            period_type,
            allow_estimates: false,
            allow_ltm: false,
        }
    }
}

/// A row in the `company_master` table: one per resolved ticker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyMasterRow {
    /// The requested ticker.
    pub ticker: Ticker,
    /// The resolved regulator issuer id.
    pub issuer_id: IssuerId,
}

/// A row in the `filings` table: one per filing selected as the best
/// version for a fiscal period (see `pit-engine`'s filing selector).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilingRow {
    /// Ticker this filing belongs to.
    pub ticker: Ticker,
    /// Resolved issuer id.
    pub issuer_id: IssuerId,
    /// Accession number of the selected filing.
    pub accession: String,
    /// Form type of the selected filing.
    pub form_type: FormType,
    /// Fiscal period end this filing reports on.
    pub period_end: NaiveDate,
    /// Date printed on the filing.
    pub filing_date: NaiveDate,
    /// Regulator acceptance timestamp; always `<= cutoff_date`.
    pub acceptance_datetime: DateTime<Utc>,
}

/// A row in the `statements_income` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatementRow {
    /// Ticker this row belongs to.
    pub ticker: Ticker,
    /// Fiscal period end.
    pub period_end: NaiveDate,
    /// Acceptance datetime of the contributing filing; the PIT timestamp.
    pub asof_date: DateTime<Utc>,
    /// Accession of the contributing filing.
    pub accession: String,
    /// Total revenue.
    pub revenue: Option<f64>,
    /// Cost of revenue.
    pub cost_of_revenue: Option<f64>,
    /// Gross profit.
    pub gross_profit: Option<f64>,
    /// Research and development expense.
    pub research_and_development_expense: Option<f64>,
    /// Selling, general and administrative expense.
    pub selling_general_administrative_expense: Option<f64>,
    /// Operating expenses.
    pub operating_expenses: Option<f64>,
    /// Operating income.
    pub operating_income: Option<f64>,
    /// Net income.
    pub net_income: Option<f64>,
    /// EBITDA.
    pub ebitda: Option<f64>,
    /// Basic earnings per share.
    pub eps_basic: Option<f64>,
    /// Diluted earnings per share.
    pub eps_diluted: Option<f64>,
    /// Interest expense.
    pub interest_expense: Option<f64>,
    /// Interest income.
    pub interest_income: Option<f64>,
    /// Income before income taxes.
    pub pretax_income: Option<f64>,
    /// Income tax expense (or benefit).
    pub income_tax_expense: Option<f64>,
}

/// A row in the `statements_balance` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetRow {
    /// Ticker this row belongs to.
    pub ticker: Ticker,
    /// Fiscal period end.
    pub period_end: NaiveDate,
    /// Acceptance datetime of the contributing filing.
    pub asof_date: DateTime<Utc>,
    /// Accession of the contributing filing.
    pub accession: String,
    /// Total assets.
    pub total_assets: Option<f64>,
    /// Current assets.
    pub current_assets: Option<f64>,
    /// Cash and cash equivalents.
    pub cash_and_equivalents: Option<f64>,
    /// Short-term investments.
    pub short_term_investments: Option<f64>,
    /// Inventory.
    pub inventory: Option<f64>,
    /// Accounts receivable.
    pub accounts_receivable: Option<f64>,
    /// Net property, plant and equipment.
    pub property_plant_equipment_net: Option<f64>,
    /// Goodwill.
    pub goodwill: Option<f64>,
    /// Total liabilities.
    pub total_liabilities: Option<f64>,
    /// Current liabilities.
    pub current_liabilities: Option<f64>,
    /// Long-term debt.
    pub long_term_debt: Option<f64>,
    /// Short-term debt.
    pub short_term_debt: Option<f64>,
    /// Total debt.
    pub total_debt: Option<f64>,
    /// Accounts payable.
    pub accounts_payable: Option<f64>,
    /// Stockholders' equity.
    pub stockholders_equity: Option<f64>,
}

/// A row in the `statements_cashflow` table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    /// Ticker this row belongs to.
    pub ticker: Ticker,
    /// Fiscal period end.
    pub period_end: NaiveDate,
    /// Acceptance datetime of the contributing filing.
    pub asof_date: DateTime<Utc>,
    /// Accession of the contributing filing.
    pub accession: String,
    /// Depreciation and amortization.
    pub depreciation_and_amortization: Option<f64>,
    /// Cash from operating activities.
    pub operating_cash_flow: Option<f64>,
    /// Cash used in investing activities.
    pub investing_cash_flow: Option<f64>,
    /// Cash from financing activities.
    pub financing_cash_flow: Option<f64>,
    /// Capital expenditures.
    pub capital_expenditures: Option<f64>,
    /// Free cash flow.
    pub free_cash_flow: Option<f64>,
    /// Dividends paid.
    pub dividends_paid: Option<f64>,
    /// Basic weighted-average shares outstanding.
    pub shares_outstanding: Option<f64>,
    /// Diluted weighted-average shares outstanding.
    pub shares_outstanding_diluted: Option<f64>,
}

/// A row in the `derived_metrics` table: ratios computed purely from the
/// already-assembled income/balance/cashflow rows of the same period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetricsRow {
    /// Ticker this row belongs to.
    pub ticker: Ticker,
    /// Fiscal period end.
    pub period_end: NaiveDate,
    /// Acceptance datetime of the contributing filing.
    pub asof_date: DateTime<Utc>,
    /// Accession of the contributing filing.
    pub accession: String,
    /// Gross profit / revenue.
    pub gross_margin: Option<f64>,
    /// Operating income / revenue.
    pub operating_margin: Option<f64>,
    /// Net income / revenue.
    pub net_margin: Option<f64>,
    /// Income tax expense / pretax income.
    pub effective_tax_rate: Option<f64>,
    /// Free cash flow (duplicated here for convenient single-table reads).
    pub free_cash_flow: Option<f64>,
    /// Total debt / stockholders' equity.
    pub debt_to_equity: Option<f64>,
    /// Current assets / current liabilities.
    pub current_ratio: Option<f64>,
}

/// The kind of non-fatal or per-ticker issue recorded in a
/// [`CoverageReport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The ticker did not resolve to an issuer, or the issuer had no
    /// filings index.
    NotFound,
    /// A network error occurred after retries were exhausted.
    Network,
    /// The company-facts payload could not be parsed.
    Parse,
    /// A row was emitted but failed a soft validation check (e.g. balance
    /// sheet identity off by more than 1%).
    ValidationWarning,
}

/// One recorded issue against a single ticker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickerIssue {
    /// The affected ticker.
    pub ticker: Ticker,
    /// The kind of issue.
    pub kind: IssueKind,
    /// A human-readable description.
    pub message: String,
}

/// The authoritative failure/coverage surface for a snapshot run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Every ticker that was requested.
    pub requested: Vec<Ticker>,
    /// Tickers that resolved to an issuer and produced at least the
    /// `company_master` row.
    pub resolved: Vec<Ticker>,
    /// Tickers that never resolved or never produced any rows.
    pub missing_tickers: Vec<Ticker>,
    /// Non-fatal per-ticker issues encountered during the run.
    pub per_ticker_issues: Vec<TickerIssue>,
}

/// The complete, typed output of a snapshot run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotResult {
    /// One row per resolved ticker.
    pub company_master: Vec<CompanyMasterRow>,
    /// One row per selected filing.
    pub filings: Vec<FilingRow>,
    /// Income statement rows, one per `(ticker, period_end)`.
    pub statements_income: Vec<IncomeStatementRow>,
    /// Balance sheet rows, one per `(ticker, period_end)`.
    pub statements_balance: Vec<BalanceSheetRow>,
    /// Cash flow rows, one per `(ticker, period_end)`.
    pub statements_cashflow: Vec<CashFlowRow>,
    /// Derived metric rows, one per `(ticker, period_end)`.
    pub derived_metrics: Vec<DerivedMetricsRow>,
    /// Coverage and per-ticker issue report for this run.
    pub coverage: CoverageReport,
    /// The cutoff date this snapshot was built against.
    pub cutoff_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_normalizes_to_uppercase() {
        assert_eq!(Ticker::new("aapl").as_str(), "AAPL");
    }

    #[test]
    fn issuer_id_zero_pads() {
        assert_eq!(IssuerId::new("320193").as_str(), "0000320193");
    }

    #[test]
    fn form_type_classifies_amendments() {
        assert_eq!(FormType::classify("10-K"), FormType::Annual);
        assert_eq!(FormType::classify("10-K/A"), FormType::Amendment);
        assert_eq!(FormType::classify("10-Q"), FormType::Quarterly);
        assert_eq!(FormType::classify("8-K"), FormType::Other);
    }

    #[test]
    fn amendment_matches_either_period_type() {
        assert!(FormType::Amendment.matches_period_type(PeriodType::Annual));
        assert!(FormType::Amendment.matches_period_type(PeriodType::Quarterly));
        assert!(!FormType::Other.matches_period_type(PeriodType::Annual));
    }

    #[test]
    fn consolidated_fact_has_no_segment_dimensions() {
        let fact = XbrlFact {
            tag: "us-gaap:Revenues".to_string(),
            value: 1000.0,
            unit: "USD".to_string(),
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
            period_kind: PeriodKind::Instant,
            accession: "0000320193-17-000009".to_string(),
            filed_date: NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
            dimensions: BTreeMap::new(),
        };
        assert!(fact.is_consolidated());
    }

    #[test]
    fn segment_dimensioned_fact_is_not_consolidated() {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(
            "srt:ProductOrServiceAxis".to_string(),
            "aapl:IPhoneMember".to_string(),
        );
        let fact = XbrlFact {
            tag: "us-gaap:Revenues".to_string(),
            value: 1000.0,
            unit: "USD".to_string(),
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
            period_kind: PeriodKind::Instant,
            accession: "0000320193-17-000009".to_string(),
            filed_date: NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
            dimensions,
        };
        assert!(!fact.is_consolidated());
    }
}
