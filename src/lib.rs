//! # Balance Sheet Breakdown
//!
//! The core of a multi-company, multi-year balance sheet editor: a typed
//! balance sheet model, a zero-value validation scan, a confirmation gate
//! that defers actions behind those warnings, and a flattened export for the
//! visualization and persistence stages.
//!
//! ## Core Concepts
//!
//! - **Leaf fields**: named amounts grouped into six fixed categories
//!   (current/non-current assets, current/long-term liabilities,
//!   common/comprehensive equity), plus nine flat metrics
//! - **Balance sheet**: one year of leaf fields for one company, identified
//!   as `{company}-{year}`
//! - **Company**: up to 10 sheets, unique by year, always sorted by year
//! - **Validation**: every field equal to zero is reported; a "proceed"
//!   action waits for confirmation while any are present
//! - **Accounting equation**: Assets = Liabilities + Equity is checked but
//!   never enforced
//!
//! ## Example
//!
//! ```rust
//! use balance_sheet_breakdown::*;
//!
//! let config = WorkspaceConfig {
//!     default_year: Some(2023),
//!     ..WorkspaceConfig::default()
//! };
//! let mut workspace = Workspace::new(config).unwrap();
//!
//! workspace
//!     .set_leaf_input(1, Category::CurrentAssets, "Cash and cash equivalents", "$12,000")
//!     .unwrap();
//! workspace.add_previous_sheet(2023).unwrap();
//!
//! // Untouched fields are still zero, so the navigation is held back.
//! match workspace.request_compare_data().unwrap() {
//!     ProceedOutcome::AwaitingConfirmation(prompt) => {
//!         assert_eq!(prompt.groups.len(), 2);
//!         workspace.confirm().unwrap();
//!     }
//!     ProceedOutcome::Completed => unreachable!(),
//! }
//!
//! assert_eq!(workspace.stage(), Stage::Visualization);
//! assert_eq!(workspace.export().len(), 2);
//! ```

pub mod balancer;
pub mod company;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod export;
pub mod input;
pub mod merge;
pub mod persistence;
pub mod ratios;
pub mod schema;
pub mod validation;
pub mod workspace;

#[cfg(feature = "remote")]
pub mod remote;

pub use balancer::{check_equation, equation_warnings, EquationWarning, SectionTotals};
pub use company::Company;
pub use crate::config::WorkspaceConfig;
pub use confirmation::{
    display_message, ConfirmationGate, ConfirmationPrompt, GateDecision, YearGroup,
};
pub use error::{BalanceSheetError, Result};
pub use export::{companies_from_export, flatten_companies, ExportedSheet};
pub use input::{parse_amount, parse_year};
pub use merge::{merge_analysis, merged_sheet};
pub use persistence::{
    clear_state, load_state, save_state, FileStorage, MemoryStorage, PersistedState, Storage,
};
pub use ratios::{calculate_financial_ratios, CompanyRatios, SheetRatios};
pub use schema::*;
pub use validation::{find_zero_fields, find_zero_fields_in, ValidationError};
pub use workspace::{PendingAction, ProceedOutcome, Stage, Workspace};
