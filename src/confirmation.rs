//! Grouping of zero-field warnings and the confirm/cancel gate that holds a
//! deferred action until the user decides.

use crate::schema::Category;
use crate::validation::ValidationError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Friendly message for one validation record.
///
/// Leaf locations collapse to their category title, so every zero field in
/// "Current Assets" yields the same message. Locations without a `>` are
/// returned unchanged.
pub fn display_message(error: &ValidationError) -> String {
    if !error.location.contains('>') {
        return error.location.clone();
    }

    let parts: Vec<&str> = error.location.split('>').map(str::trim).collect();
    let section = parts[0];
    let subsection = parts.get(1).copied().unwrap_or_default();

    match Category::from_keys(section, subsection) {
        Some(category) => category.display_name().to_string(),
        None => subsection.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearGroup {
    pub year: i32,
    pub messages: Vec<String>,
}

impl YearGroup {
    pub fn heading(&self) -> String {
        format!("Balance Sheet {}", self.year)
    }
}

/// The warning shown before a pending action runs: one group per sheet
/// year, ascending numerically, with messages deduplicated within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    pub groups: Vec<YearGroup>,
}

impl ConfirmationPrompt {
    pub fn from_errors(errors: &[ValidationError]) -> Self {
        let mut grouped: BTreeMap<i32, Vec<String>> = BTreeMap::new();

        for error in errors {
            let message = display_message(error);
            let messages = grouped.entry(error.sheet_year).or_default();
            if !messages.contains(&message) {
                messages.push(message);
            }
        }

        Self {
            groups: grouped
                .into_iter()
                .map(|(year, messages)| YearGroup { year, messages })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, year: i32) -> Option<&YearGroup> {
        self.groups.iter().find(|g| g.year == year)
    }
}

impl fmt::Display for ConfirmationPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The following fields have a value of 0. Are you sure you want to continue?"
        )?;
        for group in &self.groups {
            writeln!(f, "{}:", group.heading())?;
            for message in &group.messages {
                writeln!(f, "  {} is 0.", message)?;
            }
        }
        Ok(())
    }
}

struct Pending<A> {
    action: A,
    errors: Vec<ValidationError>,
    prompt: ConfirmationPrompt,
}

/// Outcome of guarding an action.
pub enum GateDecision<A> {
    /// No warnings: run the action now.
    Proceed(A),
    /// Warnings found: the action is held until `confirm` or `cancel`.
    AwaitingConfirmation(ConfirmationPrompt),
}

/// Holds at most one deferred action behind a zero-field warning.
///
/// A new `guard` call while an action is pending replaces it.
pub struct ConfirmationGate<A> {
    pending: Option<Pending<A>>,
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> ConfirmationGate<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&mut self, errors: Vec<ValidationError>, action: A) -> GateDecision<A> {
        if errors.is_empty() {
            return GateDecision::Proceed(action);
        }

        let prompt = ConfirmationPrompt::from_errors(&errors);
        debug!(
            "Deferring action behind {} zero-valued fields across {} sheet years",
            errors.len(),
            prompt.groups.len()
        );
        self.pending = Some(Pending {
            action,
            errors,
            prompt: prompt.clone(),
        });
        GateDecision::AwaitingConfirmation(prompt)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn prompt(&self) -> Option<&ConfirmationPrompt> {
        self.pending.as_ref().map(|p| &p.prompt)
    }

    pub fn pending_errors(&self) -> &[ValidationError] {
        self.pending
            .as_ref()
            .map(|p| p.errors.as_slice())
            .unwrap_or_default()
    }

    /// Releases the pending action. Returns `None` when nothing is pending,
    /// so an action can never be released twice.
    pub fn confirm(&mut self) -> Option<A> {
        self.pending.take().map(|p| p.action)
    }

    /// Drops the pending action and returns the field ids of every warning
    /// it was held on, before deduplication.
    pub fn cancel(&mut self) -> Vec<String> {
        self.pending
            .take()
            .map(|p| p.errors.into_iter().map(|e| e.field_id).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(year: i32, location: &str, field_id: &str) -> ValidationError {
        ValidationError {
            sheet_id: 1,
            sheet_year: year,
            location: location.to_string(),
            field_id: field_id.to_string(),
        }
    }

    #[test]
    fn test_display_message_maps_categories() {
        let cases = [
            ("assets > current > Inventories", "Current Assets"),
            ("assets > nonCurrent > Goodwill", "Non-Current Assets"),
            ("liabilities > current > Accounts payable", "Current Liabilities"),
            ("liabilities > longTerm > Long-term debt", "Long-Term Liabilities"),
            ("equity > common > Common stock", "Common Stock & Retained Earnings"),
            (
                "equity > comprehensive > Goodwill",
                "Accumulated Other Comprehensive Loss",
            ),
            ("Net Income", "Net Income"),
            ("Year", "Year"),
        ];

        for (location, expected) in cases {
            assert_eq!(display_message(&error(2023, location, "x")), expected);
        }
    }

    #[test]
    fn test_prompt_groups_by_year_and_deduplicates() {
        let errors = vec![
            error(2023, "assets > current > Cash and cash equivalents", "a"),
            error(2023, "assets > current > Inventories", "b"),
            error(2023, "assets > current > Receivables, net", "c"),
            error(2021, "Income", "d"),
            error(2023, "Income", "e"),
            error(2021, "assets > current > Inventories", "f"),
        ];

        let prompt = ConfirmationPrompt::from_errors(&errors);

        let years: Vec<i32> = prompt.groups.iter().map(|g| g.year).collect();
        assert_eq!(years, vec![2021, 2023]);
        assert_eq!(
            prompt.group(2023).unwrap().messages,
            vec!["Current Assets", "Income"]
        );
        assert_eq!(
            prompt.group(2021).unwrap().messages,
            vec!["Income", "Current Assets"]
        );
    }

    #[test]
    fn test_years_sort_numerically() {
        let errors = vec![error(10000, "Income", "a"), error(999, "Income", "b")];
        let prompt = ConfirmationPrompt::from_errors(&errors);
        assert_eq!(prompt.groups[0].year, 999);
    }

    #[test]
    fn test_prompt_display() {
        let prompt = ConfirmationPrompt::from_errors(&[error(2022, "Revenue", "a")]);
        let text = prompt.to_string();
        assert!(text.contains("Balance Sheet 2022:"));
        assert!(text.contains("Revenue is 0."));
    }

    #[test]
    fn test_gate_proceeds_without_errors() {
        let mut gate = ConfirmationGate::new();
        match gate.guard(Vec::new(), 42) {
            GateDecision::Proceed(value) => assert_eq!(value, 42),
            GateDecision::AwaitingConfirmation(_) => panic!("should not defer"),
        }
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_gate_confirm_releases_once() {
        let mut gate = ConfirmationGate::new();
        let decision = gate.guard(vec![error(2023, "Income", "sheet-1.income")], "go");
        assert!(matches!(decision, GateDecision::AwaitingConfirmation(_)));
        assert!(gate.is_pending());

        assert_eq!(gate.confirm(), Some("go"));
        assert_eq!(gate.confirm(), None);
        assert!(gate.prompt().is_none());
    }

    #[test]
    fn test_gate_cancel_returns_all_field_ids() {
        let mut gate = ConfirmationGate::new();
        let errors = vec![
            error(2023, "assets > current > Inventories", "sheet-1.assets.current.Inventories"),
            error(2023, "assets > current > Goodwill", "sheet-1.assets.current.Goodwill"),
        ];
        gate.guard(errors, ());

        let ids = gate.cancel();
        assert_eq!(ids.len(), 2);
        assert!(!gate.is_pending());
        assert_eq!(gate.confirm(), None);
    }
}
