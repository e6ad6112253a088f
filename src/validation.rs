use crate::schema::{BalanceSheet, Category, Metric};
use serde::{Deserialize, Serialize};

/// A field whose value is exactly zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub sheet_id: u32,
    pub sheet_year: i32,
    /// `Year`, `{section} > {subsection} > {label}`, or a metric label.
    pub location: String,
    /// Fully qualified dotted path, e.g. `sheet-2.assets.current.Inventories`.
    pub field_id: String,
}

pub fn year_field_id(sheet_id: u32) -> String {
    format!("sheet-{}.year", sheet_id)
}

pub fn leaf_field_id(sheet_id: u32, category: Category, label: &str) -> String {
    format!("sheet-{}.{}.{}", sheet_id, category.path(), label)
}

pub fn metric_field_id(sheet_id: u32, metric: Metric) -> String {
    format!("sheet-{}.{}", sheet_id, metric.key())
}

/// Scans one sheet for zero-valued fields.
///
/// Order is fixed: year, the six categories in `Category::ALL` order (each
/// in insertion order), then the metrics in `Metric::ALL` order. The scan
/// never stops early.
pub fn find_zero_fields(sheet: &BalanceSheet) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let record = |location: String, field_id: String| ValidationError {
        sheet_id: sheet.id,
        sheet_year: sheet.year,
        location,
        field_id,
    };

    if sheet.year == 0 {
        errors.push(record("Year".to_string(), year_field_id(sheet.id)));
    }

    for category in Category::ALL {
        for (label, value) in sheet.leaves(category).iter() {
            if value == 0.0 {
                errors.push(record(
                    format!("{} > {}", category.location(), label),
                    leaf_field_id(sheet.id, category, label),
                ));
            }
        }
    }

    for metric in Metric::ALL {
        if sheet.metric(metric) == 0.0 {
            errors.push(record(
                metric.label().to_string(),
                metric_field_id(sheet.id, metric),
            ));
        }
    }

    errors
}

/// Scans every sheet, concatenating results in sheet order.
pub fn find_zero_fields_in<'a, I>(sheets: I) -> Vec<ValidationError>
where
    I: IntoIterator<Item = &'a BalanceSheet>,
{
    sheets.into_iter().flat_map(find_zero_fields).collect()
}
