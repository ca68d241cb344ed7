use crate::support::{load_catalogue_or_exit, print_json_or_exit};
use serde_json::json;
use std::collections::BTreeMap;

pub fn run(path: String, json_output: bool) {
    let catalogue = load_catalogue_or_exit(&path);

    let mut by_category: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_severity: BTreeMap<&'static str, usize> = BTreeMap::new();
    for rule in catalogue.rules() {
        *by_category.entry(rule.category.as_str()).or_default() += 1;
        *by_severity
            .entry(match rule.severity {
                planvet_catalogue::Severity::Error => "error",
                planvet_catalogue::Severity::Warning => "warning",
            })
            .or_default() += 1;
    }

    if json_output {
        let payload = json!({
            "path": path,
            "version": catalogue.version(),
            "rule_count": catalogue.len(),
            "digest": catalogue.digest(),
            "by_category": by_category,
            "by_severity": by_severity,
        });
        print_json_or_exit(&payload);
    } else {
        println!("planvet catalogue {path}");
        println!("  Version: {}", catalogue.version().unwrap_or("(none)"));
        println!("  Rules: {}", catalogue.len());
        println!("  Digest: {}", catalogue.digest());
        println!("  By category:");
        for (category, count) in &by_category {
            println!("    {category}: {count}");
        }
        println!("  By severity:");
        for (severity, count) in &by_severity {
            println!("    {severity}: {count}");
        }
    }
}
