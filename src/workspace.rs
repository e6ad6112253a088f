//! The application state behind the balance sheet editor.
//!
//! `Workspace` owns every company, the active company, the set of field ids
//! currently marked as erroneous, and the confirmation gate. All mutations
//! are synchronous `&mut self` calls; a rejected call leaves the workspace
//! as it was.

use crate::balancer::{equation_warnings, EquationWarning};
use crate::company::Company;
use crate::config::WorkspaceConfig;
use crate::confirmation::{ConfirmationGate, ConfirmationPrompt, GateDecision};
use crate::error::{BalanceSheetError, Result};
use crate::export::{companies_from_export, flatten_companies, ExportedSheet};
use crate::input::{parse_amount, parse_year};
use crate::merge::merged_sheet;
use crate::persistence::{load_state, save_state, PersistedState, Storage};
use crate::ratios::{calculate_financial_ratios, CompanyRatios};
use crate::schema::{BalanceSheet, Category, Metric};
use crate::validation::{find_zero_fields_in, year_field_id, ValidationError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A deferred operation, run only once the user confirms past a warning.
pub type PendingAction = Box<dyn FnOnce(&mut Workspace) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Sheets,
    Visualization,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProceedOutcome {
    /// The action ran.
    Completed,
    /// Zero-valued fields were found; the action waits for `confirm`.
    AwaitingConfirmation(ConfirmationPrompt),
}

pub struct Workspace {
    config: WorkspaceConfig,
    companies: Vec<Company>,
    current_company_id: u32,
    validation_markers: BTreeSet<String>,
    gate: ConfirmationGate<PendingAction>,
    stage: Stage,
}

fn company_name_for(index: usize) -> String {
    let letter = (b'A' + index as u8) as char;
    format!("Company {}", letter)
}

impl Workspace {
    /// A workspace with a single "Company A" holding one sheet for the
    /// default year.
    pub fn new(config: WorkspaceConfig) -> Result<Self> {
        config.validate()?;
        let first = Company::new(1, company_name_for(0), config.effective_default_year());
        Ok(Self::assemble(config, vec![first]))
    }

    /// Restores a workspace from existing companies. The first company
    /// becomes active; an empty list starts fresh.
    pub fn from_companies(config: WorkspaceConfig, companies: Vec<Company>) -> Result<Self> {
        config.validate()?;
        if companies.is_empty() {
            return Self::new(config);
        }
        if companies.len() > config.max_companies {
            return Err(BalanceSheetError::CompanyCapacityExceeded {
                max: config.max_companies,
            });
        }
        if let Some(company) = companies
            .iter()
            .find(|c| c.len() > config.max_sheets_per_company)
        {
            return Err(BalanceSheetError::SheetCapacityExceeded {
                company: company.name.clone(),
                max: config.max_sheets_per_company,
            });
        }
        Ok(Self::assemble(config, companies))
    }

    fn assemble(config: WorkspaceConfig, companies: Vec<Company>) -> Self {
        let current_company_id = companies.first().map_or(1, |c| c.id);
        Self {
            config,
            companies,
            current_company_id,
            validation_markers: BTreeSet::new(),
            gate: ConfirmationGate::new(),
            stage: Stage::Sheets,
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn company(&self, company_id: u32) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == company_id)
    }

    pub fn current_company_id(&self) -> u32 {
        self.current_company_id
    }

    pub fn current_company(&self) -> Result<&Company> {
        self.company(self.current_company_id)
            .ok_or(BalanceSheetError::CompanyNotFound(self.current_company_id))
    }

    fn company_mut(&mut self, company_id: u32) -> Result<&mut Company> {
        self.companies
            .iter_mut()
            .find(|c| c.id == company_id)
            .ok_or(BalanceSheetError::CompanyNotFound(company_id))
    }

    fn current_company_mut(&mut self) -> Result<&mut Company> {
        let id = self.current_company_id;
        self.company_mut(id)
    }

    pub fn select_company(&mut self, company_id: u32) -> Result<()> {
        if self.company(company_id).is_none() {
            return Err(BalanceSheetError::CompanyNotFound(company_id));
        }
        self.current_company_id = company_id;
        Ok(())
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Field ids the UI should highlight.
    pub fn validation_markers(&self) -> &BTreeSet<String> {
        &self.validation_markers
    }

    pub fn has_marker(&self, field_id: &str) -> bool {
        self.validation_markers.contains(field_id)
    }

    pub fn clear_markers(&mut self) {
        self.validation_markers.clear();
    }

    /// Records or clears the year-conflict marker for a sheet after a
    /// year-changing operation.
    fn track_year_conflict<T>(&mut self, sheet_id: u32, result: Result<T>) -> Result<T> {
        let marker = year_field_id(sheet_id);
        match &result {
            Err(BalanceSheetError::DuplicateYear { year, .. }) => {
                warn!("Balance sheet for year {} already exists", year);
                self.validation_markers.insert(marker);
            }
            Ok(_) => {
                self.validation_markers.remove(&marker);
            }
            Err(_) => {}
        }
        result
    }

    fn log_rejection<T>(result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_conflict() {
                warn!("{}", e);
            }
        }
        result
    }

    // --- sheet edits on the active company ---

    pub fn update_year(&mut self, sheet_id: u32, year: i32) -> Result<()> {
        let result = self
            .current_company_mut()
            .and_then(|company| company.set_year(sheet_id, year));
        self.track_year_conflict(sheet_id, result)
    }

    pub fn update_year_input(&mut self, sheet_id: u32, raw: &str) -> Result<()> {
        let year = parse_year(raw)?;
        self.update_year(sheet_id, year)
    }

    /// Replaces a sheet of the active company, guarding its year.
    pub fn update_sheet(&mut self, sheet: BalanceSheet) -> Result<()> {
        let sheet_id = sheet.id;
        let result = self
            .current_company_mut()
            .and_then(|company| company.replace_sheet(sheet));
        self.track_year_conflict(sheet_id, result)
    }

    pub fn set_leaf(
        &mut self,
        sheet_id: u32,
        category: Category,
        label: &str,
        value: f64,
    ) -> Result<()> {
        self.current_company_mut()?
            .set_leaf(sheet_id, category, label, value)
    }

    pub fn set_leaf_input(
        &mut self,
        sheet_id: u32,
        category: Category,
        label: &str,
        raw: &str,
    ) -> Result<()> {
        let value = parse_amount(raw)?;
        self.set_leaf(sheet_id, category, label, value)
    }

    pub fn set_metric(&mut self, sheet_id: u32, metric: Metric, value: f64) -> Result<()> {
        self.current_company_mut()?.set_metric(sheet_id, metric, value)
    }

    pub fn set_metric_input(&mut self, sheet_id: u32, metric: Metric, raw: &str) -> Result<()> {
        let value = parse_amount(raw)?;
        self.set_metric(sheet_id, metric, value)
    }

    pub fn add_previous_sheet(&mut self, year: i32) -> Result<u32> {
        let max = self.config.max_sheets_per_company;
        Self::log_rejection(
            self.current_company_mut()
                .and_then(|company| company.add_previous_sheet(year, max)),
        )
    }

    pub fn add_next_sheet(&mut self, year: i32) -> Result<u32> {
        let max = self.config.max_sheets_per_company;
        Self::log_rejection(
            self.current_company_mut()
                .and_then(|company| company.add_next_sheet(year, max)),
        )
    }

    pub fn add_sheet(&mut self) -> Result<u32> {
        let max = self.config.max_sheets_per_company;
        let default_year = self.config.effective_default_year();
        Self::log_rejection(
            self.current_company_mut()
                .and_then(|company| company.add_sheet(default_year, max)),
        )
    }

    pub fn delete_sheet(&mut self, sheet_id: u32) -> Result<BalanceSheet> {
        self.current_company_mut()?.delete_sheet(sheet_id)
    }

    // --- companies ---

    pub fn rename_company(&mut self, company_id: u32, name: impl Into<String>) -> Result<()> {
        self.company_mut(company_id)?.rename(name);
        Ok(())
    }

    /// Adds the next lettered company and makes it active.
    pub fn add_company(&mut self) -> Result<u32> {
        if self.companies.len() >= self.config.max_companies {
            return Self::log_rejection(Err(BalanceSheetError::CompanyCapacityExceeded {
                max: self.config.max_companies,
            }));
        }

        let id = self
            .companies
            .iter()
            .map(|c| c.id)
            .max()
            .map_or(1, |id| id + 1);
        let name = company_name_for(self.companies.len());
        info!("Adding company '{}' ({})", name, id);

        self.companies.push(Company::new(
            id,
            name,
            self.config.effective_default_year(),
        ));
        self.current_company_id = id;
        Ok(id)
    }

    // --- validation gate ---

    /// Zero-valued fields of the active company, in scan order.
    pub fn zero_fields(&self) -> Result<Vec<ValidationError>> {
        Ok(find_zero_fields_in(self.current_company()?.sheets()))
    }

    /// Runs `action` now if the active company has no zero-valued fields,
    /// otherwise holds it until `confirm` or `cancel`.
    pub fn validate_and_proceed(&mut self, action: PendingAction) -> Result<ProceedOutcome> {
        let errors = self.zero_fields()?;
        match self.gate.guard(errors, action) {
            GateDecision::Proceed(action) => {
                action(self)?;
                Ok(ProceedOutcome::Completed)
            }
            GateDecision::AwaitingConfirmation(prompt) => {
                Ok(ProceedOutcome::AwaitingConfirmation(prompt))
            }
        }
    }

    pub fn request_add_company(&mut self) -> Result<ProceedOutcome> {
        self.validate_and_proceed(Box::new(|ws: &mut Workspace| ws.add_company().map(|_| ())))
    }

    pub fn request_compare_data(&mut self) -> Result<ProceedOutcome> {
        self.validate_and_proceed(Box::new(|ws: &mut Workspace| {
            ws.set_stage(Stage::Visualization);
            Ok(())
        }))
    }

    pub fn pending_prompt(&self) -> Option<&ConfirmationPrompt> {
        self.gate.prompt()
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.gate.is_pending()
    }

    /// Runs the pending action, if any. The gate is cleared before the
    /// action runs, so an action error propagates without re-validating.
    pub fn confirm(&mut self) -> Result<bool> {
        match self.gate.confirm() {
            Some(action) => {
                action(self)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the pending action and marks every zero-valued field it was
    /// waiting on.
    pub fn cancel(&mut self) {
        if !self.gate.is_pending() {
            return;
        }
        self.validation_markers = self.gate.cancel().into_iter().collect();
    }

    // --- derived views ---

    pub fn equation_warnings(&self) -> Result<Vec<EquationWarning>> {
        Ok(equation_warnings(
            self.current_company()?.sheets(),
            self.config.equation_tolerance,
        ))
    }

    pub fn export(&self) -> Vec<ExportedSheet> {
        flatten_companies(&self.companies)
    }

    pub fn ratios(&self) -> Vec<CompanyRatios> {
        calculate_financial_ratios(&self.companies)
    }

    // --- external analysis ---

    pub fn sheet_revision(&self, company_id: u32, sheet_id: u32) -> Result<u64> {
        self.company(company_id)
            .ok_or(BalanceSheetError::CompanyNotFound(company_id))?
            .sheet(sheet_id)
            .map(|s| s.revision)
            .ok_or(BalanceSheetError::SheetNotFound(sheet_id))
    }

    /// Merges an analysis payload into a sheet.
    ///
    /// With `expected_revision` set, the merge is refused when the sheet was
    /// edited after the analysis was requested. `None` keeps
    /// last-write-wins.
    pub fn apply_analysis(
        &mut self,
        company_id: u32,
        sheet_id: u32,
        payload: &serde_json::Value,
        expected_revision: Option<u64>,
    ) -> Result<()> {
        let current = self
            .company(company_id)
            .ok_or(BalanceSheetError::CompanyNotFound(company_id))?
            .sheet(sheet_id)
            .ok_or(BalanceSheetError::SheetNotFound(sheet_id))?;

        if let Some(expected) = expected_revision {
            if expected != current.revision {
                return Self::log_rejection(Err(BalanceSheetError::StaleAnalysis {
                    sheet_id,
                    expected,
                    actual: current.revision,
                }));
            }
        }

        let merged = merged_sheet(current, payload)?;
        let result = self
            .company_mut(company_id)
            .and_then(|company| company.replace_sheet(merged));
        self.track_year_conflict(sheet_id, result)
    }

    // --- persistence ---

    pub fn to_persisted_state(&self, flags: BTreeMap<String, serde_json::Value>) -> PersistedState {
        PersistedState {
            sheets: self.export(),
            flags,
        }
    }

    pub fn save<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        user: &str,
        flags: BTreeMap<String, serde_json::Value>,
    ) -> Result<()> {
        save_state(storage, user, &self.to_persisted_state(flags))
    }

    /// Loads a user's saved workspace, or a fresh one when nothing is saved.
    pub fn load<S: Storage + ?Sized>(
        storage: &S,
        user: &str,
        config: WorkspaceConfig,
    ) -> Result<(Self, BTreeMap<String, serde_json::Value>)> {
        match load_state(storage, user)? {
            Some(state) => {
                let companies = companies_from_export(state.sheets);
                Ok((Self::from_companies(config, companies)?, state.flags))
            }
            None => Ok((Self::new(config)?, BTreeMap::new())),
        }
    }
}
