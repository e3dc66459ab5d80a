//! Check and fix command implementation.

use super::open_existing;
use crate::Format;
use simpledb_core::{CheckOptions, Problem};
use std::path::Path;

/// Runs the `check` command, or `fix` when `repair` is set.
///
/// Fails if problems remain after the pass, so scripts can rely on the
/// exit status.
pub fn run(
    path: &Path,
    deep: bool,
    collection: Option<String>,
    repair: bool,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let options = CheckOptions {
        deep,
        collection,
    };

    if format == Format::Text {
        let verb = if repair { "Repairing" } else { "Checking" };
        let depth = if deep { " (deep)" } else { "" };
        println!("{verb} store at {}{depth}", path.display());
        println!();
    }

    let (problems, unresolved) = if repair {
        let report = store.fix_with(&options)?;
        let unresolved = report.unresolved().count();
        if format == Format::Json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        (report.problems, unresolved)
    } else {
        let report = store.check_with(&options)?;
        if format == Format::Json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        let count = report.problems.len();
        (report.problems, count)
    };
    store.close();

    if format == Format::Text {
        print_problems(&problems);
        println!();
        if unresolved == 0 {
            println!("✓ Store is consistent");
        } else {
            println!("✗ {unresolved} problem(s) remain");
        }
    }

    if unresolved == 0 {
        Ok(())
    } else {
        Err(format!("{unresolved} problem(s) remain").into())
    }
}

fn print_problems(problems: &[Problem]) {
    for problem in problems {
        let mark = if problem.fixed { "fixed" } else { "found" };
        println!("  [{mark}] {}: {}", problem.kind, problem.description);
        println!("          {}", problem.path.display());
    }
}
