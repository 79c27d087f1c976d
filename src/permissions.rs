use colored::Colorize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{DotfilesError, Result};
use crate::utils::Summary;

/// Set every configured file to exactly its configured mode.
///
/// Missing files are reported and skipped; this never fails on missing input.
pub fn fix_permissions(config: &Config, dry_run: bool) -> Result<Summary> {
    println!("Fixing file permissions");
    let mut summary = Summary::default();

    for entry in &config.permissions {
        let path = config.resolve(&entry.path);

        if !path.exists() {
            info!("Permission target missing: {}", path.display());
            println!(
                "{} Could not find path for the file '{}'",
                "Skipping:".yellow(),
                path.display()
            );
            summary.skipped += 1;
            continue;
        }

        if dry_run {
            println!(
                "DRY-RUN: Would set mode {:o} on '{}'",
                entry.mode,
                path.display()
            );
            summary.skipped += 1;
            continue;
        }

        fs::set_permissions(&path, fs::Permissions::from_mode(entry.mode))
            .map_err(|e| DotfilesError::io(&path, e))?;
        debug!("Set mode {:o} on {}", entry.mode, path.display());
        summary.applied += 1;
    }

    Ok(summary)
}
