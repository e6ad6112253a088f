use crate::error::{BalanceSheetError, Result};
use crate::schema::BalanceSheet;
use log::debug;
use serde_json::{Map, Value};

/// Drops `null` members recursively. A merge patch would otherwise read
/// them as deletions; the analysis service uses them for "not found".
fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Returns `sheet` with `payload` deep-merged into it.
///
/// Nested objects merge key by key, scalars overwrite, unknown line item
/// labels are appended to their category. The sheet id is never taken from
/// the payload. The input sheet is not modified, so a payload that fails
/// to parse leaves no partial state behind.
pub fn merged_sheet(sheet: &BalanceSheet, payload: &Value) -> Result<BalanceSheet> {
    if !payload.is_object() {
        return Err(BalanceSheetError::ExternalCall(
            "analysis payload must be a JSON object".to_string(),
        ));
    }

    let mut document = serde_json::to_value(sheet)?;
    json_patch::merge(&mut document, &strip_nulls(payload));

    let mut merged: BalanceSheet = serde_json::from_value(document)?;
    merged.id = sheet.id;
    merged.refresh_identifier();
    merged.revision = sheet.revision + 1;

    debug!(
        "Merged analysis payload into sheet {} ({})",
        merged.id, merged.identifier
    );
    Ok(merged)
}

/// Deep-merges `payload` into `sheet` in place.
pub fn merge_analysis(sheet: &mut BalanceSheet, payload: &Value) -> Result<()> {
    *sheet = merged_sheet(sheet, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;
    use serde_json::json;

    #[test]
    fn test_nested_merge_keeps_untouched_fields() {
        let mut sheet = BalanceSheet::new(1, 2023, "Acme");
        sheet.set_leaf(Category::CurrentAssets, "Inventories", 75.0);

        let payload = json!({
            "assets": { "current": { "Cash and cash equivalents": 1200 } },
            "revenue": 5000
        });
        merge_analysis(&mut sheet, &payload).unwrap();

        assert_eq!(sheet.assets.current.get("Cash and cash equivalents"), Some(1200.0));
        assert_eq!(sheet.assets.current.get("Inventories"), Some(75.0));
        assert_eq!(sheet.revenue, 5000.0);
        assert_eq!(sheet.liabilities.current.len(), 3);
    }

    #[test]
    fn test_merge_appends_new_labels_in_order() {
        let mut sheet = BalanceSheet::new(1, 2023, "Acme");
        let payload = json!({ "equity": { "common": { "Treasury stock": -300 } } });

        merge_analysis(&mut sheet, &payload).unwrap();

        assert_eq!(
            sheet.equity.common.labels(),
            vec![
                "Common stock",
                "Capital in excess of par value",
                "Retained earnings",
                "Treasury stock"
            ]
        );
    }

    #[test]
    fn test_merge_recomputes_identifier_and_ignores_id() {
        let mut sheet = BalanceSheet::new(4, 2023, "Acme");
        let payload = json!({ "id": 99, "name": "Globex", "year": 2019, "identifier": "junk" });

        merge_analysis(&mut sheet, &payload).unwrap();

        assert_eq!(sheet.id, 4);
        assert_eq!(sheet.identifier, "Globex-2019");
        assert_eq!(sheet.revision, 1);
    }

    #[test]
    fn test_nulls_do_not_erase_fields() {
        let mut sheet = BalanceSheet::new(1, 2023, "Acme");
        sheet.income = 10.0;

        merge_analysis(&mut sheet, &json!({ "income": null, "assets": null })).unwrap();

        assert_eq!(sheet.income, 10.0);
        assert_eq!(sheet.assets.current.len(), 4);
    }

    #[test]
    fn test_failed_merge_leaves_sheet_untouched() {
        let mut sheet = BalanceSheet::new(1, 2023, "Acme");
        let before = sheet.clone();

        let result = merge_analysis(&mut sheet, &json!({ "revenue": "lots" }));

        assert!(result.is_err());
        assert_eq!(sheet, before);
        assert!(merge_analysis(&mut sheet, &json!([1, 2])).is_err());
    }
}
