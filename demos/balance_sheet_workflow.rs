use balance_sheet_breakdown::{
    Category, FileStorage, Metric, ProceedOutcome, Workspace, WorkspaceConfig,
};
use serde_json::json;
use std::collections::BTreeMap;

fn main() -> anyhow::Result<()> {
    println!("📊 Balance Sheet Workflow Demonstration");
    println!("═══════════════════════════════════════════════════════════════\n");

    // 1. Workspace
    let config = WorkspaceConfig {
        default_year: Some(2023),
        storage_dir: Some(std::env::temp_dir().join("balance-sheet-breakdown-demo")),
        ..WorkspaceConfig::default()
    };
    let mut workspace = Workspace::new(config.clone())?;
    workspace.rename_company(1, "Northwind")?;

    // 2. Manual entry for 2023
    workspace.set_leaf_input(1, Category::CurrentAssets, "Cash and cash equivalents", "$48,766")?;
    workspace.set_leaf_input(1, Category::CurrentAssets, "Inventories", "1,234")?;
    workspace.set_leaf_input(1, Category::CurrentLiabilities, "Accounts payable", "20,000")?;
    workspace.set_leaf_input(1, Category::CommonEquity, "Retained earnings", "30,000")?;
    workspace.set_metric_input(1, Metric::Revenue, "120,000")?;
    workspace.set_metric_input(1, Metric::NetIncome, "9,500")?;

    // 3. A prior year, filled from an analysis payload
    let previous = workspace.add_previous_sheet(2023)?;
    let revision = workspace.sheet_revision(1, previous)?;
    let payload = json!({
        "assets": { "current": { "Cash and cash equivalents": 41000 } },
        "liabilities": { "current": { "Accounts payable": 18000 } },
        "equity": { "common": { "Retained earnings": 23000 } },
        "revenue": 101000
    });
    workspace.apply_analysis(1, previous, &payload, Some(revision))?;

    if let Err(e) = workspace.add_next_sheet(2021) {
        println!("⚠️  {}", e);
    }

    let company = workspace.current_company()?;
    println!("🏢 {} holds years {:?}\n", company.name, company.years());

    // 4. Equation check
    for warning in workspace.equation_warnings()? {
        println!("⚖️  {}", warning.message());
    }

    // 5. Gate the navigation
    match workspace.request_compare_data()? {
        ProceedOutcome::Completed => println!("✅ No zero-valued fields."),
        ProceedOutcome::AwaitingConfirmation(prompt) => {
            println!("\n🔍 Some fields are still zero:\n{}", prompt);
            workspace.confirm()?;
        }
    }
    println!("➡️  Stage: {:?}\n", workspace.stage());

    // 6. Ratios
    for company in workspace.ratios() {
        println!("📈 {}", company.name);
        for (year, value) in company.series(|r| r.current_ratio) {
            match value {
                Some(v) => println!("   {} current ratio: {:.2}", year, v),
                None => println!("   {} current ratio: n/a", year),
            }
        }
    }

    // 7. Persist
    let mut storage = FileStorage::from_config(&config)?;
    let mut flags = BTreeMap::new();
    flags.insert("visited".to_string(), json!(true));
    workspace.save(&mut storage, "demo", flags)?;

    let (restored, _) = Workspace::load(&storage, "demo", config)?;
    println!(
        "\n💾 Saved {} sheets to {:?}, restored {}",
        workspace.export().len(),
        storage.dir(),
        restored.export().len()
    );

    Ok(())
}
