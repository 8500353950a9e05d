use serde_json::json;
use trema::{Analysis, Change};

/// Print an analysis either as a human readable report or as JSON.
pub fn print_report(analysis: &Analysis, json_output: bool) -> Result<(), String> {
    let summary = analysis.summary();

    if json_output {
        let body = json!({
            "summary": summary,
            "conflicting": analysis.conflicting,
            "non_conflicting": analysis.non_conflicting,
        });
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| format!("Cannot serialize report: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    println!("=== Conflicting changes ({}) ===", analysis.conflicting.len());
    for change in &analysis.conflicting {
        println!("{}", format_change(change));
    }
    println!();
    println!(
        "=== Non-conflicting changes ({}) ===",
        analysis.non_conflicting.len()
    );
    for change in &analysis.non_conflicting {
        println!("{}", format_change(change));
    }
    println!();
    println!("=== Summary ===");
    println!("Total: {}", summary.total);
    println!("Conflicting: {}", summary.conflicting);
    println!("Non-conflicting: {}", summary.non_conflicting);
    println!("Acceptable: {}", summary.acceptable);
    println!("Accepted: {}", summary.accepted);
    for (change_type, count) in &summary.by_type {
        println!("  {}: {}", change_type, count);
    }
    Ok(())
}

/// One line per change: key, language, type, database side, imported side
/// and what will happen to it.
pub fn format_change(change: &Change) -> String {
    let database = match (&change.db_value, change.db_status) {
        (Some(value), Some(status)) => format!("{:?} ({})", value, status),
        _ => "-".to_string(),
    };
    let verdict = if !change.is_acceptable() {
        "not acceptable"
    } else if change.is_accept() {
        "accept"
    } else {
        "reject"
    };

    let mut line = format!(
        "  {} [{}] {}: {} -> {:?} ({}) => {}",
        change.key,
        change.language,
        change.change_type,
        database,
        change.imported_value,
        change.imported_status,
        verdict
    );
    if change.change_type == trema::ChangeType::MasterValueChanged {
        line.push_str(&format!(
            "\n      master: {:?} -> {:?}",
            change.db_master_value.as_deref().unwrap_or_default(),
            change.imported_master_value.as_deref().unwrap_or_default()
        ));
    }
    line
}
