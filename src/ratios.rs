//! Ratio series shown on the visualization stage.
//!
//! Every ratio is `None` when its denominator is zero, so charts get a gap
//! instead of an infinity.

use crate::company::Company;
use crate::schema::{BalanceSheet, Category, Metric};
use serde::{Deserialize, Serialize};

pub const EBITDA_FORMULA: &str =
    "EBITDA = Net Income + Interest Expenses + Income Taxes + Depreciation + Amortization";

const INVENTORIES: &str = "Inventories";

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRatios {
    pub year: i32,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub debt_equity_ratio: Option<f64>,
    pub net_profit_margin: Option<f64>,
    pub roa: Option<f64>,
    pub ebitda: f64,
    pub ebitda_margin: Option<f64>,
}

pub fn ebitda(sheet: &BalanceSheet) -> f64 {
    [
        Metric::NetIncome,
        Metric::InterestExpense,
        Metric::IncomeTaxes,
        Metric::Depreciation,
        Metric::Amortization,
    ]
    .iter()
    .map(|m| sheet.metric(*m))
    .sum()
}

impl SheetRatios {
    pub fn of(sheet: &BalanceSheet) -> Self {
        let current_assets = sheet.leaves(Category::CurrentAssets).total();
        let total_assets = current_assets + sheet.leaves(Category::NonCurrentAssets).total();
        let current_liabilities = sheet.leaves(Category::CurrentLiabilities).total();
        let total_liabilities =
            current_liabilities + sheet.leaves(Category::LongTermLiabilities).total();
        let common_equity = sheet.leaves(Category::CommonEquity).total();
        let inventories = sheet
            .leaves(Category::CurrentAssets)
            .get(INVENTORIES)
            .unwrap_or(0.0);
        let ebitda = ebitda(sheet);

        Self {
            year: sheet.year,
            current_ratio: ratio(current_assets, current_liabilities),
            quick_ratio: ratio(current_assets - inventories, current_liabilities),
            debt_ratio: ratio(total_liabilities, total_assets),
            debt_equity_ratio: ratio(total_liabilities, common_equity),
            net_profit_margin: ratio(sheet.profit, sheet.revenue),
            roa: ratio(sheet.net_income, total_assets),
            ebitda,
            ebitda_margin: ratio(ebitda, sheet.revenue),
        }
    }
}

/// Per-year ratios for one company, in the company's year order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRatios {
    pub company_id: u32,
    pub name: String,
    pub years: Vec<SheetRatios>,
}

impl CompanyRatios {
    pub fn of(company: &Company) -> Self {
        Self {
            company_id: company.id,
            name: company.name.clone(),
            years: company.sheets().iter().map(SheetRatios::of).collect(),
        }
    }

    pub fn series<F>(&self, pick: F) -> Vec<(i32, Option<f64>)>
    where
        F: Fn(&SheetRatios) -> Option<f64>,
    {
        self.years.iter().map(|r| (r.year, pick(r))).collect()
    }
}

pub fn calculate_financial_ratios(companies: &[Company]) -> Vec<CompanyRatios> {
    companies.iter().map(CompanyRatios::of).collect()
}
