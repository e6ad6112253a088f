use crate::error::{BalanceSheetError, Result};
use crate::schema::{BalanceSheet, Category, Section};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionTotals {
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
}

impl SectionTotals {
    pub fn of(sheet: &BalanceSheet) -> Self {
        let mut assets = 0.0;
        let mut liabilities = 0.0;
        let mut equity = 0.0;

        for category in Category::ALL {
            let total = sheet.leaves(category).total();
            match category.section() {
                Section::Assets => assets += total,
                Section::Liabilities => liabilities += total,
                Section::Equity => equity += total,
            }
        }

        Self {
            assets,
            liabilities,
            equity,
        }
    }

    /// Assets minus liabilities minus equity; zero when the sheet balances.
    pub fn overall_balance(&self) -> f64 {
        self.assets - self.liabilities - self.equity
    }
}

/// Checks Assets = Liabilities + Equity within `tolerance`.
///
/// The result is advisory: callers display it, nothing is blocked on it.
pub fn check_equation(sheet: &BalanceSheet, tolerance: f64) -> Result<SectionTotals> {
    let totals = SectionTotals::of(sheet);
    let difference = totals.overall_balance();

    if difference.abs() > tolerance {
        return Err(BalanceSheetError::EquationImbalance {
            assets: totals.assets,
            liabilities: totals.liabilities,
            equity: totals.equity,
            difference,
        });
    }

    Ok(totals)
}

/// An unbalanced sheet, for display next to the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationWarning {
    pub sheet_id: u32,
    pub sheet_year: i32,
    pub totals: SectionTotals,
}

impl EquationWarning {
    pub fn message(&self) -> String {
        format!(
            "Balance Sheet {}: the balance sheet equation is not satisfied (Assets \u{2260} Liabilities + Equity), balance {:.2}",
            self.sheet_year,
            self.totals.overall_balance()
        )
    }
}

pub fn equation_warnings<'a, I>(sheets: I, tolerance: f64) -> Vec<EquationWarning>
where
    I: IntoIterator<Item = &'a BalanceSheet>,
{
    sheets
        .into_iter()
        .filter_map(|sheet| match check_equation(sheet, tolerance) {
            Ok(_) => None,
            Err(_) => Some(EquationWarning {
                sheet_id: sheet.id,
                sheet_year: sheet.year,
                totals: SectionTotals::of(sheet),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_sheet() -> BalanceSheet {
        let mut sheet = BalanceSheet::new(1, 2023, "Test Corp");
        sheet.set_leaf(Category::CurrentAssets, "Cash and cash equivalents", 10_000.0);
        sheet.set_leaf(Category::NonCurrentAssets, "Goodwill", 5_000.0);
        sheet.set_leaf(Category::CurrentLiabilities, "Accounts payable", 4_000.0);
        sheet.set_leaf(Category::LongTermLiabilities, "Long-term debt", 6_000.0);
        sheet.set_leaf(Category::CommonEquity, "Common stock", 4_500.0);
        sheet.set_leaf(
            Category::ComprehensiveEquity,
            "Foreign currency translation adjustments",
            500.0,
        );
        sheet
    }

    #[test]
    fn test_section_totals() {
        let totals = SectionTotals::of(&balanced_sheet());
        assert_eq!(totals.assets, 15_000.0);
        assert_eq!(totals.liabilities, 10_000.0);
        assert_eq!(totals.equity, 5_000.0);
        assert_eq!(totals.overall_balance(), 0.0);
    }

    #[test]
    fn test_balanced_sheet_passes() {
        assert!(check_equation(&balanced_sheet(), 0.01).is_ok());
    }

    #[test]
    fn test_accounting_equation_violation() {
        let mut sheet = balanced_sheet();
        sheet.set_leaf(Category::CurrentAssets, "Inventories", 300.0);

        let result = check_equation(&sheet, 0.01);
        match result {
            Err(BalanceSheetError::EquationImbalance { difference, .. }) => {
                assert!((difference - 300.0).abs() < 1e-9)
            }
            other => panic!("expected imbalance, got {:?}", other),
        }
    }

    #[test]
    fn test_equation_warnings_only_for_unbalanced() {
        let good = balanced_sheet();
        let mut bad = balanced_sheet();
        bad.id = 2;
        bad.year = 2024;
        bad.set_leaf(Category::CommonEquity, "Retained earnings", 1.0);

        let warnings = equation_warnings([&good, &bad], 0.01);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].sheet_id, 2);
        assert!(warnings[0].message().contains("Balance Sheet 2024"));
    }
}
