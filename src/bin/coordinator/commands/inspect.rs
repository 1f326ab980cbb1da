//! `coordinator inspect` command
//!
//! Bootstraps the configured modules with a recording executor and prints
//! the merge order, the preferred module, every shared-prefix decision and
//! the init files that would run.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::open_session;
use crate::cli::{GlobalOpts, InspectArgs};
use autoload_coordinator::ops::InclusionReport;
use autoload_coordinator::resolver::Reason;
use autoload_coordinator::{CoordinatorStats, Resolution, ResolvedMapping};

#[derive(Serialize)]
struct ModuleSummary {
    slug: String,
    priority: i32,
    dependency_root: PathBuf,
}

#[derive(Serialize)]
struct InspectReport {
    preferred: Option<String>,
    modules: Vec<ModuleSummary>,
    mapping: Option<ResolvedMapping>,
    resolutions: Vec<Resolution>,
    inclusion: InclusionReport,
    stats: CoordinatorStats,
}

pub fn execute(opts: &GlobalOpts, args: InspectArgs) -> Result<()> {
    let mut session = open_session(opts)?;
    session.coordinator.bootstrap();
    let coordinator = &session.coordinator;

    let report = InspectReport {
        preferred: coordinator.preferred_reference().map(str::to_string),
        modules: coordinator
            .merge_order()
            .iter()
            .map(|m| ModuleSummary {
                slug: m.slug().to_string(),
                priority: m.priority(),
                dependency_root: m.dependency_root().to_path_buf(),
            })
            .collect(),
        mapping: coordinator.bound_mapping(),
        resolutions: coordinator.resolutions().to_vec(),
        inclusion: coordinator.last_inclusion().clone(),
        stats: coordinator.stats(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &InspectReport) {
    if report.modules.is_empty() {
        println!("No modules configured");
        return;
    }

    println!(
        "Preferred: {}",
        report.preferred.as_deref().unwrap_or("(none)")
    );
    println!();

    println!("Modules:");
    for (i, module) in report.modules.iter().enumerate() {
        println!(
            "  {}. {} (priority {}) {}",
            i + 1,
            module.slug,
            module.priority,
            module.dependency_root.display()
        );
    }
    println!();

    println!("Shared prefixes:");
    if report.resolutions.is_empty() {
        println!("  (none arbitrated)");
    }
    for resolution in &report.resolutions {
        println!(
            "  {} -> {} ({})",
            resolution.prefix,
            resolution.chosen.display(),
            describe(&resolution.reason)
        );
    }
    println!();

    if let Some(mapping) = &report.mapping {
        println!("Namespaces:");
        for (prefix, dirs) in &mapping.namespace_map {
            for dir in dirs {
                println!("  {} {}", prefix, dir.display());
            }
        }
        if !mapping.class_map.is_empty() {
            println!("  ({} classes mapped explicitly)", mapping.class_map.len());
        }
        println!();
    }

    println!("Init files:");
    let inclusion = &report.inclusion;
    if inclusion.executed.is_empty() && inclusion.adopted.is_empty() && inclusion.skipped.is_empty()
    {
        println!("  (none)");
    }
    for id in &inclusion.executed {
        println!("  run      {}", id);
    }
    for id in &inclusion.adopted {
        println!("  adopted  {}", id);
    }
    for id in &inclusion.skipped {
        println!("  skipped  {}", id);
    }
}

fn describe(reason: &Reason) -> String {
    match reason {
        Reason::SingleCandidate => "only candidate".to_string(),
        Reason::Preferred { module } => format!("preferred module `{}`", module),
        Reason::HighestVersion { package, version } => {
            format!("highest version: {} {}", package, version)
        }
        Reason::FirstCandidate => "first candidate".to_string(),
    }
}
