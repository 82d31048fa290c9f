//! Status lines for each subcommand outcome.

use chrono::Utc;
use colored::Colorize;

use crate::gcp::OperationRecord;
use crate::gcp::rest::short_name;
use crate::gke::{ClusterSnapshot, CreateOutcome, UpgradeOutcome};
use crate::resolver::{AddressLookup, AddressSource};
use crate::scale::{GrowResult, ShrinkOutcome};

/// Format an operation age like `1h 5m` or `42s`.
fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, _) => format!("{}h {}m", h, m),
    }
}

pub fn format_operation(op: &OperationRecord) -> String {
    let mut line = format!(
        "Operation {} type={} status={}",
        op.name, op.operation_type, op.status
    );
    if let Some(target) = op.target_link.as_deref() {
        line.push_str(&format!(" target={}", short_name(target)));
    }
    if let Some(age) = op.age(Utc::now()) {
        line.push_str(&format!(" age={}", format_age(age)));
    }
    line
}

pub fn print_cluster_summary(snapshot: &ClusterSnapshot) {
    println!("{}", "Cluster:".bold());
    println!("  Name:           {}", snapshot.name);
    println!("  Status:         {}", snapshot.status);
    println!(
        "  Master version: {}",
        snapshot.current_master_version.cyan()
    );
    println!("  Node count:     {}", snapshot.current_node_count);
}

pub fn print_pending(pending: &[OperationRecord]) {
    println!(
        "{} {} operation(s) in progress, skipping",
        "⏸".yellow(),
        pending.len().to_string().yellow()
    );
    for op in pending {
        println!("  {}", format_operation(op));
    }
}

/// In-flight operations for a read-only report. Nothing is skipped.
pub fn print_in_flight(in_flight: &[OperationRecord]) {
    println!();
    if in_flight.is_empty() {
        println!("{} No operations in progress", "✓".green());
        return;
    }
    println!(
        "{} {} operation(s) in progress",
        "ℹ".blue(),
        in_flight.len().to_string().yellow()
    );
    for op in in_flight {
        println!("  {}", format_operation(op));
    }
}

pub fn print_submitted(op: &OperationRecord) {
    println!("  {}", format_operation(op).dimmed());
}

pub fn print_upgrade_outcome(subject: &str, outcome: &UpgradeOutcome) {
    println!();
    match outcome {
        UpgradeOutcome::Blocked { pending } => print_pending(pending),
        UpgradeOutcome::UpToDate { current } => {
            println!(
                "{} {} is up to date ({})",
                "✓".green(),
                subject,
                current.cyan()
            );
        }
        UpgradeOutcome::Available { current, target } => {
            println!(
                "{} {} upgrade available: {} -> {}",
                "ℹ".blue(),
                subject,
                current.cyan(),
                target.to_string().green()
            );
            println!("  Set GKE_FORCE_UPDATE to apply it.");
        }
        UpgradeOutcome::Applied {
            current,
            target,
            operation,
        } => {
            println!(
                "{} {} upgrade requested: {} -> {}",
                "→".cyan(),
                subject,
                current.cyan(),
                target.to_string().green()
            );
            print_submitted(operation);
        }
    }
}

pub fn print_create_outcome(name: &str, outcome: &CreateOutcome) {
    match outcome {
        CreateOutcome::Blocked { pending } => print_pending(pending),
        CreateOutcome::Submitted { operation } => {
            println!("{} Node pool {} creation requested", "→".cyan(), name.bold());
            print_submitted(operation);
        }
    }
}

pub fn print_grow_result(node_pool: &str, result: &GrowResult) {
    println!(
        "{} Node pool {} resized: {} -> {} (instance group {})",
        "→".cyan(),
        node_pool.bold(),
        result.previous_size,
        result.new_size.to_string().green(),
        result.instance_group
    );
    print_submitted(&result.operation);
}

pub fn print_shrink_outcome(node_pool: &str, outcome: &ShrinkOutcome) {
    match outcome {
        ShrinkOutcome::NothingToRemove => {
            println!(
                "{} No cordoned nodes in {}, nothing to remove",
                "✓".green(),
                node_pool.bold()
            );
        }
        ShrinkOutcome::Removed {
            instance_group,
            instances,
            operation,
        } => {
            println!(
                "{} Removing {} instance(s) from {}",
                "→".cyan(),
                instances.len().to_string().yellow(),
                instance_group
            );
            for instance in instances {
                println!("  - {}", short_name(instance));
            }
            print_submitted(operation);
        }
    }
}

/// Print only the address, for use in scripts.
pub fn print_address(lookup: &AddressLookup) {
    if let AddressLookup::Found { address, source } = lookup {
        let via = match source {
            AddressSource::ComputeNat => "instance NAT",
            AddressSource::NodeStatus => "node status",
        };
        tracing::debug!("External address resolved from {}", via);
        println!("{}", address);
    }
}
