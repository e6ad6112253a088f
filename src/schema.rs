use crate::input::{deserialize_amount, deserialize_year, Amount};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Assets,
    Liabilities,
    Equity,
}

impl Section {
    pub fn key(&self) -> &'static str {
        match self {
            Section::Assets => "assets",
            Section::Liabilities => "liabilities",
            Section::Equity => "equity",
        }
    }
}

/// The six fixed groupings of leaf fields, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    CurrentAssets,
    NonCurrentAssets,
    CurrentLiabilities,
    LongTermLiabilities,
    CommonEquity,
    ComprehensiveEquity,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::CurrentAssets,
        Category::NonCurrentAssets,
        Category::CurrentLiabilities,
        Category::LongTermLiabilities,
        Category::CommonEquity,
        Category::ComprehensiveEquity,
    ];

    pub fn section(&self) -> Section {
        match self {
            Category::CurrentAssets | Category::NonCurrentAssets => Section::Assets,
            Category::CurrentLiabilities | Category::LongTermLiabilities => Section::Liabilities,
            Category::CommonEquity | Category::ComprehensiveEquity => Section::Equity,
        }
    }

    pub fn subsection_key(&self) -> &'static str {
        match self {
            Category::CurrentAssets | Category::CurrentLiabilities => "current",
            Category::NonCurrentAssets => "nonCurrent",
            Category::LongTermLiabilities => "longTerm",
            Category::CommonEquity => "common",
            Category::ComprehensiveEquity => "comprehensive",
        }
    }

    /// Dotted path used inside field ids, e.g. `assets.nonCurrent`.
    pub fn path(&self) -> String {
        format!("{}.{}", self.section().key(), self.subsection_key())
    }

    /// Location prefix used in validation records, e.g. `assets > nonCurrent`.
    pub fn location(&self) -> String {
        format!("{} > {}", self.section().key(), self.subsection_key())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::CurrentAssets => "Current Assets",
            Category::NonCurrentAssets => "Non-Current Assets",
            Category::CurrentLiabilities => "Current Liabilities",
            Category::LongTermLiabilities => "Long-Term Liabilities",
            Category::CommonEquity => "Common Stock & Retained Earnings",
            Category::ComprehensiveEquity => "Accumulated Other Comprehensive Loss",
        }
    }

    /// Case-insensitive lookup from the section and subsection keys.
    pub fn from_keys(section: &str, subsection: &str) -> Option<Self> {
        let section = section.trim();
        let subsection = subsection.trim();
        Category::ALL.into_iter().find(|c| {
            c.section().key().eq_ignore_ascii_case(section)
                && c.subsection_key().eq_ignore_ascii_case(subsection)
        })
    }

    pub fn default_labels(&self) -> &'static [&'static str] {
        match self {
            Category::CurrentAssets => &[
                "Cash and cash equivalents",
                "Receivables, net",
                "Inventories",
                "Prepaid expenses & other",
            ],
            Category::NonCurrentAssets => &[
                "Property and equipment, net",
                "Goodwill",
                "Long-term lease assets",
            ],
            Category::CurrentLiabilities => &[
                "Short-term borrowings",
                "Accounts payable",
                "Accrued liabilities",
            ],
            Category::LongTermLiabilities => &[
                "Long-term debt",
                "Deferred income taxes",
                "Finance & operating lease obligations",
            ],
            Category::CommonEquity => &[
                "Common stock",
                "Capital in excess of par value",
                "Retained earnings",
            ],
            Category::ComprehensiveEquity => &[
                "Foreign currency translation adjustments",
                "Unrealized gains/losses on securities",
            ],
        }
    }
}

/// The flat scalar metrics carried by every sheet, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Income,
    Revenue,
    Profit,
    OperatingIncome,
    NetIncome,
    InterestExpense,
    IncomeTaxes,
    Depreciation,
    Amortization,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Income,
        Metric::Revenue,
        Metric::Profit,
        Metric::OperatingIncome,
        Metric::NetIncome,
        Metric::InterestExpense,
        Metric::IncomeTaxes,
        Metric::Depreciation,
        Metric::Amortization,
    ];

    /// Serialized field name, also the last segment of the metric's field id.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Income => "income",
            Metric::Revenue => "revenue",
            Metric::Profit => "profit",
            Metric::OperatingIncome => "operatingIncome",
            Metric::NetIncome => "netIncome",
            Metric::InterestExpense => "interestExpense",
            Metric::IncomeTaxes => "incomeTaxes",
            Metric::Depreciation => "depreciation",
            Metric::Amortization => "amortization",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Income => "Income",
            Metric::Revenue => "Revenue",
            Metric::Profit => "Profit",
            Metric::OperatingIncome => "Operating Income",
            Metric::NetIncome => "Net Income",
            Metric::InterestExpense => "Interest Expense",
            Metric::IncomeTaxes => "Income Taxes",
            Metric::Depreciation => "Depreciation",
            Metric::Amortization => "Amortization",
        }
    }
}

/// Named numeric line items of one category.
///
/// Insertion order is significant: it drives the validation scan and the
/// order fields are rendered in, so it is kept through edits, merges and
/// JSON round trips. Setting an existing label updates it in place; a new
/// label is appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafStore {
    items: Vec<(String, f64)>,
}

impl LeafStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            items: labels.iter().map(|l| (l.to_string(), 0.0)).collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.items
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| *value)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.items.iter().any(|(name, _)| name == label)
    }

    pub fn set(&mut self, label: impl Into<String>, value: f64) {
        let label = label.into();
        match self.items.iter_mut().find(|(name, _)| *name == label) {
            Some(entry) => entry.1 = value,
            None => self.items.push((label, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(|(_, value)| value).sum()
    }
}

impl Serialize for LeafStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for (label, value) in &self.items {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LeafStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LeafStoreVisitor;

        impl<'de> Visitor<'de> for LeafStoreVisitor {
            type Value = LeafStore;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of line item labels to amounts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LeafStore, A::Error> {
                let mut store = LeafStore::new();
                while let Some((label, amount)) = access.next_entry::<String, Amount>()? {
                    let value = amount.resolve().map_err(serde::de::Error::custom)?;
                    store.set(label, value);
                }
                Ok(store)
            }
        }

        deserializer.deserialize_map(LeafStoreVisitor)
    }
}

impl JsonSchema for LeafStore {
    fn schema_name() -> String {
        "LeafStore".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <BTreeMap<String, f64>>::json_schema(gen)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assets {
    #[serde(default)]
    pub current: LeafStore,
    #[serde(default)]
    pub non_current: LeafStore,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            current: LeafStore::with_labels(Category::CurrentAssets.default_labels()),
            non_current: LeafStore::with_labels(Category::NonCurrentAssets.default_labels()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Liabilities {
    #[serde(default)]
    pub current: LeafStore,
    #[serde(default)]
    pub long_term: LeafStore,
}

impl Default for Liabilities {
    fn default() -> Self {
        Self {
            current: LeafStore::with_labels(Category::CurrentLiabilities.default_labels()),
            long_term: LeafStore::with_labels(Category::LongTermLiabilities.default_labels()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equity {
    #[serde(default)]
    pub common: LeafStore,
    #[serde(default)]
    pub comprehensive: LeafStore,
}

impl Default for Equity {
    fn default() -> Self {
        Self {
            common: LeafStore::with_labels(Category::CommonEquity.default_labels()),
            comprehensive: LeafStore::with_labels(Category::ComprehensiveEquity.default_labels()),
        }
    }
}

/// One year of balance sheet data for a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    #[schemars(description = "Sheet id, unique within the owning company")]
    pub id: u32,

    #[serde(rename = "name", default)]
    #[schemars(description = "Name of the owning company")]
    pub company_name: String,

    #[serde(deserialize_with = "deserialize_year")]
    #[schemars(description = "Fiscal year of the sheet, e.g. 2023")]
    pub year: i32,

    #[serde(default)]
    #[schemars(description = "Derived display key, `{name}-{year}`")]
    pub identifier: String,

    #[serde(default)]
    pub assets: Assets,
    #[serde(default)]
    pub liabilities: Liabilities,
    #[serde(default)]
    pub equity: Equity,

    #[serde(default, deserialize_with = "deserialize_amount")]
    pub income: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub revenue: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub profit: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub operating_income: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub net_income: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub interest_expense: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub income_taxes: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub depreciation: f64,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amortization: f64,

    /// In-memory edit counter, bumped on every committed change.
    #[serde(skip)]
    pub revision: u64,
}

impl BalanceSheet {
    /// Creates a sheet with every line item and metric zeroed.
    pub fn new(id: u32, year: i32, company_name: impl Into<String>) -> Self {
        let company_name = company_name.into();
        Self {
            id,
            identifier: Self::identifier_for(&company_name, year),
            company_name,
            year,
            assets: Assets::default(),
            liabilities: Liabilities::default(),
            equity: Equity::default(),
            income: 0.0,
            revenue: 0.0,
            profit: 0.0,
            operating_income: 0.0,
            net_income: 0.0,
            interest_expense: 0.0,
            income_taxes: 0.0,
            depreciation: 0.0,
            amortization: 0.0,
            revision: 0,
        }
    }

    pub fn identifier_for(company_name: &str, year: i32) -> String {
        if company_name.is_empty() {
            year.to_string()
        } else {
            format!("{}-{}", company_name, year)
        }
    }

    pub fn refresh_identifier(&mut self) {
        self.identifier = Self::identifier_for(&self.company_name, self.year);
    }

    pub fn leaves(&self, category: Category) -> &LeafStore {
        match category {
            Category::CurrentAssets => &self.assets.current,
            Category::NonCurrentAssets => &self.assets.non_current,
            Category::CurrentLiabilities => &self.liabilities.current,
            Category::LongTermLiabilities => &self.liabilities.long_term,
            Category::CommonEquity => &self.equity.common,
            Category::ComprehensiveEquity => &self.equity.comprehensive,
        }
    }

    pub fn leaves_mut(&mut self, category: Category) -> &mut LeafStore {
        match category {
            Category::CurrentAssets => &mut self.assets.current,
            Category::NonCurrentAssets => &mut self.assets.non_current,
            Category::CurrentLiabilities => &mut self.liabilities.current,
            Category::LongTermLiabilities => &mut self.liabilities.long_term,
            Category::CommonEquity => &mut self.equity.common,
            Category::ComprehensiveEquity => &mut self.equity.comprehensive,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Income => self.income,
            Metric::Revenue => self.revenue,
            Metric::Profit => self.profit,
            Metric::OperatingIncome => self.operating_income,
            Metric::NetIncome => self.net_income,
            Metric::InterestExpense => self.interest_expense,
            Metric::IncomeTaxes => self.income_taxes,
            Metric::Depreciation => self.depreciation,
            Metric::Amortization => self.amortization,
        }
    }

    fn metric_mut(&mut self, metric: Metric) -> &mut f64 {
        match metric {
            Metric::Income => &mut self.income,
            Metric::Revenue => &mut self.revenue,
            Metric::Profit => &mut self.profit,
            Metric::OperatingIncome => &mut self.operating_income,
            Metric::NetIncome => &mut self.net_income,
            Metric::InterestExpense => &mut self.interest_expense,
            Metric::IncomeTaxes => &mut self.income_taxes,
            Metric::Depreciation => &mut self.depreciation,
            Metric::Amortization => &mut self.amortization,
        }
    }

    pub fn set_metric(&mut self, metric: Metric, value: f64) {
        *self.metric_mut(metric) = value;
        self.touch();
    }

    pub fn set_leaf(&mut self, category: Category, label: impl Into<String>, value: f64) {
        self.leaves_mut(category).set(label, value);
        self.touch();
    }

    pub fn set_company_name(&mut self, company_name: impl Into<String>) {
        self.company_name = company_name.into();
        self.refresh_identifier();
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// JSON schema of the payload shape accepted by the analysis merge.
    pub fn payload_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(BalanceSheet)
    }

    pub fn payload_schema_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::payload_schema())
    }
}
