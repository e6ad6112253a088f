use crate::error::{BalanceSheetError, Result};
use crate::schema::{BalanceSheet, Category, Metric};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// A named, year-ordered collection of balance sheets.
///
/// Sheets are unique by year and always sorted ascending by year. Every
/// mutation goes through a method here so those invariants hold; a rejected
/// operation leaves the company untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CompanyRecord")]
pub struct Company {
    pub id: u32,
    pub name: String,
    sheets: Vec<BalanceSheet>,
}

/// Wire form of a company; always rebuilt through `Company::from_sheets`.
#[derive(Deserialize)]
struct CompanyRecord {
    id: u32,
    name: String,
    #[serde(default)]
    sheets: Vec<BalanceSheet>,
}

impl From<CompanyRecord> for Company {
    fn from(record: CompanyRecord) -> Self {
        Company::from_sheets(record.id, record.name, record.sheets)
    }
}

impl Company {
    /// A company holding a single zeroed sheet for `first_year`.
    pub fn new(id: u32, name: impl Into<String>, first_year: i32) -> Self {
        let name = name.into();
        Self {
            sheets: vec![BalanceSheet::new(1, first_year, name.clone())],
            id,
            name,
        }
    }

    pub fn empty(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    /// Rebuilds a company from already-existing sheets, restoring the
    /// ordering and name invariants. Duplicate years keep the first sheet;
    /// a repeated sheet id is replaced by a fresh one.
    pub fn from_sheets(id: u32, name: impl Into<String>, sheets: Vec<BalanceSheet>) -> Self {
        let mut company = Self::empty(id, name);
        for mut sheet in sheets {
            if company.has_year(sheet.year, None) {
                warn!(
                    "Dropping sheet {} of '{}': year {} already present",
                    sheet.id, company.name, sheet.year
                );
                continue;
            }
            if company.sheet(sheet.id).is_some() {
                let fresh = company.next_sheet_id();
                warn!(
                    "Sheet id {} of '{}' is already taken, reassigned to {}",
                    sheet.id, company.name, fresh
                );
                sheet.id = fresh;
            }
            sheet.company_name = company.name.clone();
            sheet.refresh_identifier();
            company.sheets.push(sheet);
        }
        company.sort_sheets();
        company
    }

    pub fn sheets(&self) -> &[BalanceSheet] {
        &self.sheets
    }

    pub fn sheet(&self, sheet_id: u32) -> Option<&BalanceSheet> {
        self.sheets.iter().find(|s| s.id == sheet_id)
    }

    pub fn years(&self) -> Vec<i32> {
        self.sheets.iter().map(|s| s.year).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// True when a sheet other than `excluding` already uses `year`.
    pub fn has_year(&self, year: i32, excluding: Option<u32>) -> bool {
        self.sheets
            .iter()
            .any(|s| Some(s.id) != excluding && s.year == year)
    }

    fn next_sheet_id(&self) -> u32 {
        self.sheets.iter().map(|s| s.id).max().map_or(1, |id| id + 1)
    }

    fn sheet_mut(&mut self, sheet_id: u32) -> Result<&mut BalanceSheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.id == sheet_id)
            .ok_or(BalanceSheetError::SheetNotFound(sheet_id))
    }

    fn sort_sheets(&mut self) {
        self.sheets.sort_by_key(|s| s.year);
    }

    /// Inserts a zeroed sheet for `year` and returns its id.
    pub fn insert_sheet_for_year(&mut self, year: i32, max_sheets: usize) -> Result<u32> {
        if self.sheets.len() >= max_sheets {
            return Err(BalanceSheetError::SheetCapacityExceeded {
                company: self.name.clone(),
                max: max_sheets,
            });
        }
        if self.has_year(year, None) {
            return Err(BalanceSheetError::DuplicateYear {
                year,
                sheet_id: None,
            });
        }

        let id = self.next_sheet_id();
        self.sheets.push(BalanceSheet::new(id, year, self.name.clone()));
        self.sort_sheets();
        info!("Added balance sheet {} ({}) to '{}'", id, year, self.name);
        Ok(id)
    }

    pub fn add_previous_sheet(&mut self, year: i32, max_sheets: usize) -> Result<u32> {
        let previous = year
            .checked_sub(1)
            .ok_or(BalanceSheetError::YearOutOfRange(year))?;
        self.insert_sheet_for_year(previous, max_sheets)
    }

    pub fn add_next_sheet(&mut self, year: i32, max_sheets: usize) -> Result<u32> {
        let next = year
            .checked_add(1)
            .ok_or(BalanceSheetError::YearOutOfRange(year))?;
        self.insert_sheet_for_year(next, max_sheets)
    }

    /// Adds a sheet one year after the latest, or for `default_year` when
    /// the company has none.
    pub fn add_sheet(&mut self, default_year: i32, max_sheets: usize) -> Result<u32> {
        let year = match self.sheets.iter().map(|s| s.year).max() {
            Some(latest) => latest
                .checked_add(1)
                .ok_or(BalanceSheetError::YearOutOfRange(latest))?,
            None => default_year,
        };
        self.insert_sheet_for_year(year, max_sheets)
    }

    pub fn set_year(&mut self, sheet_id: u32, year: i32) -> Result<()> {
        if self.sheet(sheet_id).is_none() {
            return Err(BalanceSheetError::SheetNotFound(sheet_id));
        }
        if self.has_year(year, Some(sheet_id)) {
            return Err(BalanceSheetError::DuplicateYear {
                year,
                sheet_id: Some(sheet_id),
            });
        }

        let sheet = self.sheet_mut(sheet_id)?;
        sheet.year = year;
        sheet.refresh_identifier();
        sheet.touch();
        self.sort_sheets();
        Ok(())
    }

    /// Replaces a sheet wholesale, as after a bulk merge. The replacement
    /// keeps the company's name and is subject to the duplicate-year guard.
    pub fn replace_sheet(&mut self, mut updated: BalanceSheet) -> Result<()> {
        if self.sheet(updated.id).is_none() {
            return Err(BalanceSheetError::SheetNotFound(updated.id));
        }
        if self.has_year(updated.year, Some(updated.id)) {
            return Err(BalanceSheetError::DuplicateYear {
                year: updated.year,
                sheet_id: Some(updated.id),
            });
        }

        updated.company_name = self.name.clone();
        updated.refresh_identifier();
        let slot = self.sheet_mut(updated.id)?;
        updated.revision = slot.revision + 1;
        *slot = updated;
        self.sort_sheets();
        Ok(())
    }

    pub fn set_leaf(
        &mut self,
        sheet_id: u32,
        category: Category,
        label: &str,
        value: f64,
    ) -> Result<()> {
        self.sheet_mut(sheet_id)?.set_leaf(category, label, value);
        Ok(())
    }

    pub fn set_metric(&mut self, sheet_id: u32, metric: Metric, value: f64) -> Result<()> {
        self.sheet_mut(sheet_id)?.set_metric(metric, value);
        Ok(())
    }

    pub fn delete_sheet(&mut self, sheet_id: u32) -> Result<BalanceSheet> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == sheet_id)
            .ok_or(BalanceSheetError::SheetNotFound(sheet_id))?;
        info!("Deleted balance sheet {} from '{}'", sheet_id, self.name);
        Ok(self.sheets.remove(index))
    }

    /// Renames the company and every sheet it owns.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        for sheet in &mut self.sheets {
            sheet.set_company_name(self.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10;

    fn company_with_years(years: &[i32]) -> Company {
        let mut company = Company::empty(1, "Company A");
        for year in years {
            company.insert_sheet_for_year(*year, MAX).unwrap();
        }
        company
    }

    #[test]
    fn test_add_previous_sheet_fills_gap_in_order() {
        let mut company = company_with_years(&[2021, 2023]);

        let id = company.add_previous_sheet(2023, MAX).unwrap();

        assert_eq!(company.years(), vec![2021, 2022, 2023]);
        assert_eq!(id, 3);
        assert_eq!(company.sheet(id).unwrap().identifier, "Company A-2022");
    }

    #[test]
    fn test_add_next_sheet_rejects_existing_year() {
        let mut company = company_with_years(&[2022, 2023]);
        let before = company.clone();

        let result = company.add_next_sheet(2022, MAX);

        assert!(matches!(
            result,
            Err(BalanceSheetError::DuplicateYear { year: 2023, .. })
        ));
        assert_eq!(company, before);
    }

    #[test]
    fn test_add_sheet_uses_latest_year_or_default() {
        let mut company = Company::empty(1, "Acme");
        company.add_sheet(2020, MAX).unwrap();
        company.add_sheet(2020, MAX).unwrap();
        assert_eq!(company.years(), vec![2020, 2021]);
    }

    #[test]
    fn test_sheet_capacity() {
        let years: Vec<i32> = (2010..2020).collect();
        let mut company = company_with_years(&years);
        let before = company.clone();

        let result = company.add_next_sheet(2019, MAX);

        assert!(matches!(
            result,
            Err(BalanceSheetError::SheetCapacityExceeded { max: 10, .. })
        ));
        assert_eq!(company, before);
    }

    #[test]
    fn test_new_ids_follow_max_not_count() {
        let mut company = company_with_years(&[2020, 2021, 2022]);
        company.delete_sheet(1).unwrap();

        let id = company.add_sheet(2000, MAX).unwrap();
        assert_eq!(id, 4);
    }

    #[test]
    fn test_set_year_duplicate_is_rejected() {
        let mut company = company_with_years(&[2021, 2022]);

        let result = company.set_year(2, 2021);

        assert!(matches!(
            result,
            Err(BalanceSheetError::DuplicateYear {
                year: 2021,
                sheet_id: Some(2)
            })
        ));
        assert_eq!(company.sheet(2).unwrap().year, 2022);
    }

    #[test]
    fn test_set_year_resorts_and_refreshes_identifier() {
        let mut company = company_with_years(&[2021, 2022]);

        company.set_year(1, 2025).unwrap();

        assert_eq!(company.years(), vec![2022, 2025]);
        assert_eq!(company.sheet(1).unwrap().identifier, "Company A-2025");
    }

    #[test]
    fn test_set_year_to_own_year_is_allowed() {
        let mut company = company_with_years(&[2021]);
        assert!(company.set_year(1, 2021).is_ok());
    }

    #[test]
    fn test_rename_propagates_to_sheets() {
        let mut company = company_with_years(&[2021, 2022]);

        company.rename("Globex");

        for sheet in company.sheets() {
            assert_eq!(sheet.company_name, "Globex");
            assert!(sheet.identifier.starts_with("Globex-"));
        }
    }

    #[test]
    fn test_replace_sheet_keeps_company_name() {
        let mut company = company_with_years(&[2021, 2022]);
        let mut updated = company.sheet(1).unwrap().clone();
        updated.company_name = "Other".to_string();
        updated.year = 2030;
        updated.income = 5.0;

        company.replace_sheet(updated).unwrap();

        let sheet = company.sheet(1).unwrap();
        assert_eq!(sheet.company_name, "Company A");
        assert_eq!(sheet.identifier, "Company A-2030");
        assert_eq!(sheet.income, 5.0);
        assert_eq!(company.years(), vec![2022, 2030]);
    }

    #[test]
    fn test_from_sheets_sorts_and_drops_duplicates() {
        let sheets = vec![
            BalanceSheet::new(1, 2023, "x"),
            BalanceSheet::new(2, 2021, "x"),
            BalanceSheet::new(3, 2023, "x"),
        ];

        let company = Company::from_sheets(9, "Acme", sheets);

        assert_eq!(company.years(), vec![2021, 2023]);
        assert_eq!(company.sheet(1).unwrap().identifier, "Acme-2023");
        assert!(company.sheet(3).is_none());
    }

    #[test]
    fn test_adjacent_year_at_i32_bounds_is_rejected() {
        let mut company = company_with_years(&[i32::MIN, i32::MAX]);
        let before = company.clone();

        assert!(matches!(
            company.add_next_sheet(i32::MAX, MAX),
            Err(BalanceSheetError::YearOutOfRange(i32::MAX))
        ));
        assert!(matches!(
            company.add_previous_sheet(i32::MIN, MAX),
            Err(BalanceSheetError::YearOutOfRange(i32::MIN))
        ));
        assert!(matches!(
            company.add_sheet(2020, MAX),
            Err(BalanceSheetError::YearOutOfRange(i32::MAX))
        ));
        assert_eq!(company, before);
    }

    #[test]
    fn test_from_sheets_reassigns_duplicate_ids() {
        let sheets = vec![
            BalanceSheet::new(1, 2021, "x"),
            BalanceSheet::new(1, 2022, "x"),
            BalanceSheet::new(2, 2023, "x"),
        ];

        let company = Company::from_sheets(1, "Acme", sheets);

        let mut ids: Vec<u32> = company.sheets().iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(company.sheet(1).unwrap().year, 2021);
        assert_eq!(company.sheet(2).unwrap().year, 2022);
        assert_eq!(company.sheet(3).unwrap().year, 2023);
    }

    #[test]
    fn test_deserialize_restores_invariants() {
        let mut first = serde_json::to_value(BalanceSheet::new(1, 2023, "Old")).unwrap();
        let second = serde_json::to_value(BalanceSheet::new(2, 2021, "Old")).unwrap();
        let duplicate = serde_json::to_value(BalanceSheet::new(3, 2023, "Old")).unwrap();
        first["income"] = serde_json::json!(7);
        let json = serde_json::json!({
            "id": 4,
            "name": "Acme",
            "sheets": [first, second, duplicate]
        });

        let company: Company = serde_json::from_value(json).unwrap();

        assert_eq!(company.years(), vec![2021, 2023]);
        assert_eq!(company.sheet(1).unwrap().income, 7.0);
        assert_eq!(company.sheet(1).unwrap().identifier, "Acme-2023");
        assert!(company.sheet(3).is_none());
    }

    #[test]
    fn test_delete_missing_sheet() {
        let mut company = company_with_years(&[2021]);
        assert!(matches!(
            company.delete_sheet(5),
            Err(BalanceSheetError::SheetNotFound(5))
        ));
    }
}
