use crate::company::Company;
use crate::schema::BalanceSheet;
use serde::{Deserialize, Serialize};

/// A sheet tagged with the identity of the company that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSheet {
    pub company_id: u32,
    pub company_name: String,
    #[serde(flatten)]
    pub sheet: BalanceSheet,
}

/// Flattens companies into one list, company-major and sheet-minor.
pub fn flatten_companies(companies: &[Company]) -> Vec<ExportedSheet> {
    companies
        .iter()
        .flat_map(|company| {
            company.sheets().iter().map(move |sheet| ExportedSheet {
                company_id: company.id,
                company_name: company.name.clone(),
                sheet: sheet.clone(),
            })
        })
        .collect()
}

/// Regroups an export into companies, in first-seen company order.
pub fn companies_from_export(exported: Vec<ExportedSheet>) -> Vec<Company> {
    let mut grouped: Vec<(u32, String, Vec<BalanceSheet>)> = Vec::new();

    for record in exported {
        match grouped.iter_mut().find(|(id, _, _)| *id == record.company_id) {
            Some((_, _, sheets)) => sheets.push(record.sheet),
            None => grouped.push((record.company_id, record.company_name, vec![record.sheet])),
        }
    }

    grouped
        .into_iter()
        .map(|(id, name, sheets)| Company::from_sheets(id, name, sheets))
        .collect()
}
