//! The Tag Mapper: the append-only, priority-ordered table of regulator
//! tags per standard field.
//!
//! Different filers, and the same filer across years, tag the same concept
//! under different `us-gaap` tags (`Revenues` vs
//! `RevenueFromContractWithCustomerExcludingAssessedTax`, `InventoryNet` vs
//! `Inventories`, and so on). The table below is the single place that
//! knowledge lives. Entries are looked up in priority order and the first
//! tag with a [`ContextEngine`](crate::context::ContextEngine) match wins.
//! Append new tags to the end of a field's list, never reorder or remove an
//! existing one, or a backtest run against the same cutoff date can change
//! its answer after the fact.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use pit_core::{PeriodKind, StandardField, TagMapping};

use StandardField::{
    AccountsPayable, AccountsReceivable, CapitalExpenditures, CashAndEquivalents, CostOfRevenue,
    CurrentAssets, CurrentLiabilities, DepreciationAndAmortization, DividendsPaid, Ebitda,
    EpsBasic, EpsDiluted, FinancingCashFlow, FreeCashFlow, Goodwill, GrossProfit,
    IncomeTaxExpense, InterestExpense, InterestIncome, Inventory, InvestingCashFlow, LongTermDebt,
    NetIncome, OperatingCashFlow, OperatingExpenses, OperatingIncome, PretaxIncome,
    PropertyPlantEquipmentNet, ResearchAndDevelopmentExpense,
    SellingGeneralAdministrativeExpense, Revenue, SharesOutstanding, SharesOutstandingDiluted,
    ShortTermDebt, ShortTermInvestments, StockholdersEquity, TotalAssets, TotalDebt,
    TotalLiabilities,
};

/// Maps every [`StandardField`] this pipeline fills to its priority-ordered
/// regulator tags, whether the field is "credit" natured (for
/// balance-identity checks), and the period kind the field is reported as.
pub static TAG_TABLE: Lazy<HashMap<StandardField, TagMapping>> = Lazy::new(build_table);

fn mapping(field: StandardField, priority_tags: &[&'static str], is_credit: bool, kind: PeriodKind) -> TagMapping {
    TagMapping {
        field,
        priority_tags: priority_tags.to_vec(),
        is_credit,
        expected_period_kind: kind,
    }
}

fn build_table() -> HashMap<StandardField, TagMapping> {
    use PeriodKind::{Duration, Instant};

    let entries = [
        // Income statement
        mapping(
            Revenue,
            &[
                "Revenues",
                "RevenueFromContractWithCustomerExcludingAssessedTax",
                "RevenueFromContractWithCustomerIncludingAssessedTax",
                "SalesRevenueNet",
            ],
            true,
            Duration,
        ),
        mapping(
            CostOfRevenue,
            &["CostOfRevenue", "CostOfGoodsAndServicesSold", "CostOfGoodsSold"],
            false,
            Duration,
        ),
        mapping(GrossProfit, &["GrossProfit"], true, Duration),
        mapping(
            ResearchAndDevelopmentExpense,
            &["ResearchAndDevelopmentExpense"],
            false,
            Duration,
        ),
        mapping(
            SellingGeneralAdministrativeExpense,
            &["SellingGeneralAndAdministrativeExpense", "GeneralAndAdministrativeExpense"],
            false,
            Duration,
        ),
        mapping(OperatingExpenses, &["OperatingExpenses", "CostsAndExpenses"], false, Duration),
        mapping(
            OperatingIncome,
            &[
                "OperatingIncomeLoss",
                "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
            ],
            true,
            Duration,
        ),
        mapping(
            NetIncome,
            &["NetIncomeLoss", "ProfitLoss", "NetIncomeLossAvailableToCommonStockholdersBasic"],
            true,
            Duration,
        ),
        mapping(
            Ebitda,
            &["EarningsBeforeInterestTaxesDepreciationAndAmortization"],
            true,
            Duration,
        ),
        mapping(EpsBasic, &["EarningsPerShareBasic"], true, Duration),
        mapping(EpsDiluted, &["EarningsPerShareDiluted"], true, Duration),
        mapping(InterestExpense, &["InterestExpense", "InterestPaid"], false, Duration),
        mapping(
            InterestIncome,
            &["InvestmentIncomeInterest", "InterestIncomeOther"],
            true,
            Duration,
        ),
        mapping(
            PretaxIncome,
            &[
                "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
                "IncomeLossFromContinuingOperationsBeforeIncomeTaxesMinorityInterestAndIncomeLossFromEquityMethodInvestments",
            ],
            true,
            Duration,
        ),
        mapping(IncomeTaxExpense, &["IncomeTaxExpenseBenefit"], false, Duration),
        // Balance sheet
        mapping(TotalAssets, &["Assets"], true, Instant),
        mapping(CurrentAssets, &["AssetsCurrent"], true, Instant),
        mapping(
            CashAndEquivalents,
            &[
                "CashAndCashEquivalentsAtCarryingValue",
                "CashCashEquivalentsAndShortTermInvestments",
                "Cash",
            ],
            true,
            Instant,
        ),
        mapping(
            ShortTermInvestments,
            &["ShortTermInvestments", "MarketableSecuritiesCurrent"],
            true,
            Instant,
        ),
        mapping(Inventory, &["InventoryNet", "Inventories"], true, Instant),
        mapping(
            AccountsReceivable,
            &["AccountsReceivableNetCurrent", "AccountsReceivableNet", "ReceivablesNetCurrent"],
            true,
            Instant,
        ),
        mapping(
            PropertyPlantEquipmentNet,
            &["PropertyPlantAndEquipmentNet"],
            true,
            Instant,
        ),
        mapping(Goodwill, &["Goodwill"], true, Instant),
        mapping(
            TotalLiabilities,
            &["Liabilities", "LiabilitiesAndStockholdersEquity"],
            false,
            Instant,
        ),
        mapping(CurrentLiabilities, &["LiabilitiesCurrent"], false, Instant),
        mapping(
            LongTermDebt,
            &["LongTermDebt", "LongTermDebtNoncurrent", "LongTermDebtAndCapitalLeaseObligations"],
            false,
            Instant,
        ),
        mapping(
            ShortTermDebt,
            &["ShortTermBorrowings", "DebtCurrent", "CurrentPortionOfLongTermDebt"],
            false,
            Instant,
        ),
        mapping(TotalDebt, &["DebtCurrent", "DebtLongtermAndShorttermCombinedAmount"], false, Instant),
        mapping(
            AccountsPayable,
            &["AccountsPayableCurrent", "AccountsPayableAndAccruedLiabilitiesCurrent"],
            false,
            Instant,
        ),
        mapping(
            StockholdersEquity,
            &["StockholdersEquity", "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest"],
            true,
            Instant,
        ),
        // Cash flow
        mapping(
            DepreciationAndAmortization,
            &["DepreciationDepletionAndAmortization", "DepreciationAmortizationAndAccretionNet"],
            false,
            Duration,
        ),
        mapping(
            OperatingCashFlow,
            &["NetCashProvidedByUsedInOperatingActivities", "CashProvidedByUsedInOperatingActivities"],
            true,
            Duration,
        ),
        mapping(InvestingCashFlow, &["NetCashProvidedByUsedInInvestingActivities"], true, Duration),
        mapping(FinancingCashFlow, &["NetCashProvidedByUsedInFinancingActivities"], true, Duration),
        mapping(
            CapitalExpenditures,
            &[
                "PaymentsToAcquirePropertyPlantAndEquipment",
                "PaymentsForCapitalImprovements",
                "CapitalExpendituresIncurredButNotYetPaid",
            ],
            false,
            Duration,
        ),
        // FreeCashFlow has no regulator tag; it is always derived by the
        // assembler from OperatingCashFlow minus CapitalExpenditures.
        mapping(FreeCashFlow, &[], true, Duration),
        mapping(DividendsPaid, &["PaymentsOfDividends", "PaymentsOfDividendsCommonStock"], false, Duration),
        mapping(
            SharesOutstanding,
            &["CommonStockSharesOutstanding", "CommonStockSharesIssued"],
            true,
            Instant,
        ),
        mapping(
            SharesOutstandingDiluted,
            &["WeightedAverageNumberOfDilutedSharesOutstanding"],
            true,
            Duration,
        ),
    ];

    entries.into_iter().map(|m| (m.field, m)).collect()
}

/// Looks up the priority-ordered tags for `field`.
#[must_use]
pub fn tags_for(field: StandardField) -> &'static [&'static str] {
    TAG_TABLE
        .get(&field)
        .map(|m| m.priority_tags.as_slice())
        .unwrap_or(&[])
}

/// Looks up the full mapping for `field`, including credit-nature and
/// expected period kind.
#[must_use]
pub fn mapping_for(field: StandardField) -> Option<&'static TagMapping> {
    TAG_TABLE.get(&field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_standard_field() {
        for field in StandardField::ALL {
            assert!(
                TAG_TABLE.contains_key(field),
                "missing tag mapping for {field:?}"
            );
        }
    }

    #[test]
    fn revenue_prefers_modern_contract_tag_over_legacy_sales_tag() {
        let tags = tags_for(Revenue);
        let modern = tags.iter().position(|t| *t == "RevenueFromContractWithCustomerExcludingAssessedTax");
        let legacy = tags.iter().position(|t| *t == "SalesRevenueNet");
        assert!(modern.is_some() && legacy.is_some());
        assert!(modern < legacy);
    }

    #[test]
    fn free_cash_flow_has_no_regulator_tags() {
        assert!(tags_for(FreeCashFlow).is_empty());
    }

    #[test]
    fn balance_sheet_fields_expect_instant_facts() {
        assert_eq!(mapping_for(TotalAssets).unwrap().expected_period_kind, PeriodKind::Instant);
        assert_eq!(mapping_for(Revenue).unwrap().expected_period_kind, PeriodKind::Duration);
    }
}
