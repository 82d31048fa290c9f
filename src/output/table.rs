//! Node pool upgrade table.

use std::collections::BTreeMap;

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::gke::{NodePoolReport, NodePoolStatus};

/// Row for the node pool upgrade table.
#[derive(Tabled)]
struct NodePoolRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "LABELS")]
    labels: String,
    #[tabled(rename = "UPGRADE")]
    upgrade: String,
}

fn format_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return "-".to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

impl From<&NodePoolStatus> for NodePoolRow {
    fn from(pool: &NodePoolStatus) -> Self {
        let upgrade = if pool.needs_upgrade {
            "needed".yellow().to_string()
        } else {
            "up to date".green().to_string()
        };

        Self {
            name: pool.name.clone(),
            status: pool.status.clone(),
            version: pool.version.clone(),
            labels: format_labels(&pool.labels),
            upgrade,
        }
    }
}

/// Render the per-pool upgrade status against the control plane.
pub fn render_node_pool_table(report: &NodePoolReport) -> String {
    let rows: Vec<NodePoolRow> = report.pools.iter().map(NodePoolRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::blank());
    table.to_string()
}

pub fn print_node_pool_report(report: &NodePoolReport) {
    println!();
    println!(
        "{} (control plane {})",
        "Node Pools:".bold(),
        report.master_version.cyan()
    );

    if report.pools.is_empty() && report.unparseable.is_empty() {
        println!("  No node pools found.");
        return;
    }

    if !report.pools.is_empty() {
        println!("{}", render_node_pool_table(report));
    }

    for err in &report.unparseable {
        println!("  {} Skipped: {}", "⚠".yellow(), err);
    }
}
