use std::path::Path;

use anyhow::Result;

use gamebridge_config::{Severity, validate};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Load the configuration the way `run` would and print every diagnostic.
/// Fails when any diagnostic is an error.
pub fn check(path: &Path, verbose: bool) -> Result<()> {
    if path.exists() {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("{} not found; checking defaults.\n", path.display());
    }

    let config = gamebridge_config::load(path)?;
    let result = validate(&config);

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn malformed_file_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "rcon: [not, a, map").unwrap();

        assert!(check(&path, false).is_err());
    }

    #[test]
    fn unsupported_extension_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[rcon]").unwrap();

        assert!(check(&path, true).is_err());
    }
}
