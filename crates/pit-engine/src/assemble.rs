//! The Statement Assembler: turns selected facts into typed statement rows,
//! including derived metrics.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use pit_core::{
    BalanceSheetRow, CashFlowRow, DerivedMetricsRow, FormType, IncomeStatementRow, StandardField,
    Ticker, XbrlFact,
};
use tracing::instrument;

use crate::context::{ContextEngine, TargetPeriod};
use crate::tagmap;

/// One field resolved to a value and the accession that contributed it.
struct Resolved {
    value: f64,
    accession: String,
}

/// Assembles typed statement rows for one ticker and one target fiscal
/// period from the issuer's full flattened fact stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementAssembler {
    context: ContextEngine,
}

impl StatementAssembler {
    /// Resolves a single [`StandardField`] by trying its tag-mapper
    /// priority list against the Context Engine, returning the first tag
    /// with a surviving fact.
    fn resolve(
        &self,
        facts: &[XbrlFact],
        field: StandardField,
        target: TargetPeriod,
        cutoff_date: NaiveDate,
        filing_form_types: &HashMap<String, FormType>,
    ) -> Option<Resolved> {
        for tag in tagmap::tags_for(field) {
            let pool: Vec<&XbrlFact> = facts.iter().filter(|f| f.tag == *tag).collect();
            let by_ref: Vec<XbrlFact> = pool.into_iter().cloned().collect();
            if let Some(fact) = self.context.select(&by_ref, target, cutoff_date, filing_form_types) {
                return Some(Resolved {
                    value: fact.value,
                    accession: fact.accession.clone(),
                });
            }
        }
        None
    }

    /// Builds the income statement row for `ticker`/`target`, or `None` if
    /// no field resolved to a fact (no contributing filing to date the row
    /// against).
    #[instrument(skip(self, facts, filing_form_types, filing_acceptance))]
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_income(
        &self,
        ticker: &Ticker,
        target: TargetPeriod,
        facts: &[XbrlFact],
        cutoff_date: NaiveDate,
        filing_form_types: &HashMap<String, FormType>,
        filing_acceptance: &HashMap<String, DateTime<Utc>>,
    ) -> Option<IncomeStatementRow> {
        use StandardField::{
            CostOfRevenue, Ebitda, EpsBasic, EpsDiluted, GrossProfit, IncomeTaxExpense,
            InterestExpense, InterestIncome, NetIncome, OperatingExpenses, OperatingIncome,
            PretaxIncome, ResearchAndDevelopmentExpense, Revenue,
            SellingGeneralAdministrativeExpense,
        };

        let mut contributions = Vec::new();
        let mut field = |f: StandardField| -> Option<f64> {
            let resolved = self.resolve(facts, f, target, cutoff_date, filing_form_types)?;
            contributions.push(resolved.accession.clone());
            Some(resolved.value)
        };

        let revenue = field(Revenue);
        let cost_of_revenue = field(CostOfRevenue);
        let gross_profit = field(GrossProfit);
        let research_and_development_expense = field(ResearchAndDevelopmentExpense);
        let selling_general_administrative_expense = field(SellingGeneralAdministrativeExpense);
        let operating_expenses = field(OperatingExpenses);
        let operating_income = field(OperatingIncome);
        let net_income = field(NetIncome);
        let ebitda = field(Ebitda);
        let eps_basic = field(EpsBasic);
        let eps_diluted = field(EpsDiluted);
        let interest_expense = field(InterestExpense);
        let interest_income = field(InterestIncome);
        let pretax_income = field(PretaxIncome);
        let income_tax_expense = field(IncomeTaxExpense);

        let (accession, asof_date) = pick_contributor(&contributions, filing_acceptance)?;

        Some(IncomeStatementRow {
            ticker: ticker.clone(),
            period_end: target.period_end,
            asof_date,
            accession,
            revenue,
            cost_of_revenue,
            gross_profit,
            research_and_development_expense,
            selling_general_administrative_expense,
            operating_expenses,
            operating_income,
            net_income,
            ebitda,
            eps_basic,
            eps_diluted,
            interest_expense,
            interest_income,
            pretax_income,
            income_tax_expense,
        })
    }

    /// Builds the balance sheet row for `ticker`/`target`.
    #[instrument(skip(self, facts, filing_form_types, filing_acceptance))]
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_balance(
        &self,
        ticker: &Ticker,
        target: TargetPeriod,
        facts: &[XbrlFact],
        cutoff_date: NaiveDate,
        filing_form_types: &HashMap<String, FormType>,
        filing_acceptance: &HashMap<String, DateTime<Utc>>,
    ) -> Option<BalanceSheetRow> {
        use StandardField::{
            AccountsPayable, AccountsReceivable, CashAndEquivalents, CurrentAssets,
            CurrentLiabilities, Goodwill, Inventory, LongTermDebt, PropertyPlantEquipmentNet,
            ShortTermDebt, ShortTermInvestments, StockholdersEquity, TotalAssets, TotalDebt,
            TotalLiabilities,
        };

        let mut contributions = Vec::new();
        let mut field = |f: StandardField| -> Option<f64> {
            let resolved = self.resolve(facts, f, target, cutoff_date, filing_form_types)?;
            contributions.push(resolved.accession.clone());
            Some(resolved.value)
        };

        let total_assets = field(TotalAssets);
        let current_assets = field(CurrentAssets);
        let cash_and_equivalents = field(CashAndEquivalents);
        let short_term_investments = field(ShortTermInvestments);
        let inventory = field(Inventory);
        let accounts_receivable = field(AccountsReceivable);
        let property_plant_equipment_net = field(PropertyPlantEquipmentNet);
        let goodwill = field(Goodwill);
        let total_liabilities = field(TotalLiabilities);
        let current_liabilities = field(CurrentLiabilities);
        let long_term_debt = field(LongTermDebt);
        let short_term_debt = field(ShortTermDebt);
        let total_debt = field(TotalDebt);
        let accounts_payable = field(AccountsPayable);
        let stockholders_equity = field(StockholdersEquity);

        let (accession, asof_date) = pick_contributor(&contributions, filing_acceptance)?;

        Some(BalanceSheetRow {
            ticker: ticker.clone(),
            period_end: target.period_end,
            asof_date,
            accession,
            total_assets,
            current_assets,
            cash_and_equivalents,
            short_term_investments,
            inventory,
            accounts_receivable,
            property_plant_equipment_net,
            goodwill,
            total_liabilities,
            current_liabilities,
            long_term_debt,
            short_term_debt,
            total_debt,
            accounts_payable,
            stockholders_equity,
        })
    }

    /// Builds the cash flow row for `ticker`/`target`. `free_cash_flow` is
    /// derived here (operating cash flow less capital expenditures, see
    /// `FreeCashFlow`'s empty tag list in the tag mapper) rather than
    /// resolved against a regulator tag.
    #[instrument(skip(self, facts, filing_form_types, filing_acceptance))]
    #[allow(clippy::too_many_arguments)]
    pub fn assemble_cashflow(
        &self,
        ticker: &Ticker,
        target: TargetPeriod,
        facts: &[XbrlFact],
        cutoff_date: NaiveDate,
        filing_form_types: &HashMap<String, FormType>,
        filing_acceptance: &HashMap<String, DateTime<Utc>>,
    ) -> Option<CashFlowRow> {
        use StandardField::{
            CapitalExpenditures, DepreciationAndAmortization, DividendsPaid, FinancingCashFlow,
            InvestingCashFlow, OperatingCashFlow, SharesOutstanding, SharesOutstandingDiluted,
        };

        let mut contributions = Vec::new();
        let mut field = |f: StandardField| -> Option<f64> {
            let resolved = self.resolve(facts, f, target, cutoff_date, filing_form_types)?;
            contributions.push(resolved.accession.clone());
            Some(resolved.value)
        };

        let depreciation_and_amortization = field(DepreciationAndAmortization);
        let operating_cash_flow = field(OperatingCashFlow);
        let investing_cash_flow = field(InvestingCashFlow);
        let financing_cash_flow = field(FinancingCashFlow);
        let capital_expenditures = field(CapitalExpenditures);
        let dividends_paid = field(DividendsPaid);
        let shares_outstanding = field(SharesOutstanding);
        let shares_outstanding_diluted = field(SharesOutstandingDiluted);
        let free_cash_flow = match (operating_cash_flow, capital_expenditures) {
            (Some(ocf), Some(capex)) => Some(ocf - capex),
            _ => None,
        };

        let (accession, asof_date) = pick_contributor(&contributions, filing_acceptance)?;

        Some(CashFlowRow {
            ticker: ticker.clone(),
            period_end: target.period_end,
            asof_date,
            accession,
            depreciation_and_amortization,
            operating_cash_flow,
            investing_cash_flow,
            financing_cash_flow,
            capital_expenditures,
            free_cash_flow,
            dividends_paid,
            shares_outstanding,
            shares_outstanding_diluted,
        })
    }

    /// Derives margins and ratios purely from already-assembled rows of the
    /// same period; any missing input propagates as `None`. Takes
    /// `asof_date`/`accession` from whichever of the three statement rows
    /// has the latest `asof_date`, since derived metrics have no regulator
    /// tag of their own.
    #[must_use]
    pub fn assemble_derived(
        &self,
        ticker: &Ticker,
        period_end: NaiveDate,
        income: Option<&IncomeStatementRow>,
        balance: Option<&BalanceSheetRow>,
        cashflow: Option<&CashFlowRow>,
    ) -> Option<DerivedMetricsRow> {
        let latest = [
            income.map(|r| (&r.asof_date, &r.accession)),
            balance.map(|r| (&r.asof_date, &r.accession)),
            cashflow.map(|r| (&r.asof_date, &r.accession)),
        ]
        .into_iter()
        .flatten()
        .max_by_key(|(asof, _)| **asof)?;

        let (asof_date, accession) = (*latest.0, latest.1.clone());

        let gross_margin = ratio(income.and_then(|r| r.gross_profit), income.and_then(|r| r.revenue));
        let operating_margin =
            ratio(income.and_then(|r| r.operating_income), income.and_then(|r| r.revenue));
        let net_margin = ratio(income.and_then(|r| r.net_income), income.and_then(|r| r.revenue));
        let effective_tax_rate = ratio(
            income.and_then(|r| r.income_tax_expense),
            income.and_then(|r| r.pretax_income),
        );
        let free_cash_flow = cashflow.and_then(|r| r.free_cash_flow);
        let debt_to_equity = ratio(
            balance.and_then(|r| r.total_debt),
            balance.and_then(|r| r.stockholders_equity),
        );
        let current_ratio = ratio(
            balance.and_then(|r| r.current_assets),
            balance.and_then(|r| r.current_liabilities),
        );

        Some(DerivedMetricsRow {
            ticker: ticker.clone(),
            period_end,
            asof_date,
            accession,
            gross_margin,
            operating_margin,
            net_margin,
            effective_tax_rate,
            free_cash_flow,
            debt_to_equity,
            current_ratio,
        })
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// Picks the accession that contributed the most fields; ties broken by the
/// latest `acceptance_datetime` still on file for that accession.
fn pick_contributor(
    contributions: &[String],
    filing_acceptance: &HashMap<String, DateTime<Utc>>,
) -> Option<(String, DateTime<Utc>)> {
    if contributions.is_empty() {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for accession in contributions {
        *counts.entry(accession.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(accession, count)| {
            filing_acceptance
                .get(accession)
                .map(|accepted| (accession.to_string(), *accepted, count))
        })
        .max_by(|a, b| a.2.cmp(&b.2).then_with(|| a.1.cmp(&b.1)))
        .map(|(accession, accepted, _)| (accession, accepted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pit_core::PeriodKind;
    use std::collections::BTreeMap;

    fn fact(tag: &str, value: f64, period_end: NaiveDate, accession: &str, filed_date: NaiveDate) -> XbrlFact {
        XbrlFact {
            tag: tag.to_string(),
            value,
            unit: "USD".to_string(),
            period_start: Some(NaiveDate::from_ymd_opt(2015, 9, 27).unwrap()),
            period_end,
            period_kind: PeriodKind::Duration,
            accession: accession.to_string(),
            filed_date,
            dimensions: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_revenue_leaves_null_not_zero() {
        let assembler = StatementAssembler::default();
        let ticker = Ticker::new("AAPL");
        let period_end = NaiveDate::from_ymd_opt(2016, 9, 24).unwrap();
        let target = TargetPeriod {
            period_start: Some(NaiveDate::from_ymd_opt(2015, 9, 27).unwrap()),
            period_end,
            kind: PeriodKind::Duration,
        };
        let facts = vec![fact(
            "GrossProfit",
            84_263_000_000.0,
            period_end,
            "0000320193-17-000009",
            NaiveDate::from_ymd_opt(2017, 2, 15).unwrap(),
        )];
        let mut acceptance = HashMap::new();
        acceptance.insert(
            "0000320193-17-000009".to_string(),
            Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(),
        );

        let row = assembler
            .assemble_income(&ticker, target, &facts, NaiveDate::from_ymd_opt(2017, 3, 1).unwrap(), &HashMap::new(), &acceptance)
            .unwrap();

        assert_eq!(row.gross_profit, Some(84_263_000_000.0));
        assert_eq!(row.revenue, None);
    }

    #[test]
    fn derived_margin_propagates_null_when_revenue_missing() {
        let assembler = StatementAssembler::default();
        let ticker = Ticker::new("AAPL");
        let income = IncomeStatementRow {
            ticker: ticker.clone(),
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            asof_date: Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(),
            accession: "0000320193-17-000009".to_string(),
            gross_profit: Some(84_263_000_000.0),
            revenue: None,
            ..Default::default()
        };

        let row = assembler
            .assemble_derived(&ticker, income.period_end, Some(&income), None, None)
            .unwrap();

        assert_eq!(row.gross_margin, None);
    }

    #[test]
    fn debt_to_equity_computed_from_balance_sheet_row() {
        let assembler = StatementAssembler::default();
        let ticker = Ticker::new("AAPL");
        let balance = BalanceSheetRow {
            ticker: ticker.clone(),
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            asof_date: Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(),
            accession: "0000320193-17-000009".to_string(),
            total_debt: Some(100.0),
            stockholders_equity: Some(50.0),
            ..Default::default()
        };

        let row = assembler
            .assemble_derived(&ticker, balance.period_end, None, Some(&balance), None)
            .unwrap();

        assert_eq!(row.debt_to_equity, Some(2.0));
    }

    #[test]
    fn effective_tax_rate_computed_from_income_statement_row() {
        let assembler = StatementAssembler::default();
        let ticker = Ticker::new("AAPL");
        let income = IncomeStatementRow {
            ticker: ticker.clone(),
            period_end: NaiveDate::from_ymd_opt(2016, 9, 24).unwrap(),
            asof_date: Utc.with_ymd_and_hms(2017, 2, 15, 9, 0, 0).unwrap(),
            accession: "0000320193-17-000009".to_string(),
            pretax_income: Some(61_372_000_000.0),
            income_tax_expense: Some(15_685_000_000.0),
            ..Default::default()
        };

        let row = assembler
            .assemble_derived(&ticker, income.period_end, Some(&income), None, None)
            .unwrap();

        assert_eq!(row.effective_tax_rate, Some(15_685_000_000.0 / 61_372_000_000.0));
    }
}
