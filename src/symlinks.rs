use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DotfilesError, Result};
use crate::prompt::Prompt;
use crate::utils::{entry_exists, is_real_dir, Summary};

/// Link every configured dotfile into its system location.
///
/// All sources are checked before the first question; a missing one aborts
/// the run. Existing destinations (files or links, dangling ones included)
/// are only removed after the user agrees.
pub fn create_symlinks(config: &Config, prompt: &mut dyn Prompt, dry_run: bool) -> Result<Summary> {
    println!("Creating symlinks for configuration files");
    let mut summary = Summary::default();

    let pairs = config
        .symlinks
        .iter()
        .map(|entry| {
            let source = config.resolve(&entry.source);
            if source.exists() {
                Ok((source, config.resolve(&entry.destination)))
            } else {
                Err(DotfilesError::MissingSource { path: source })
            }
        })
        .collect::<Result<Vec<(PathBuf, PathBuf)>>>()?;

    for (source, dest) in pairs {
        if !prompt.confirm(&format!("Create symlink for dotfile '{}'?", source.display()))? {
            println!("Skipping installation of '{}'", source.display());
            summary.skipped += 1;
            continue;
        }

        if entry_exists(&dest) {
            if is_real_dir(&dest) {
                warn!("Destination {} is a directory", dest.display());
                println!(
                    "{} '{}' is a directory and will not be replaced",
                    "Skipping:".yellow(),
                    dest.display()
                );
                summary.skipped += 1;
                continue;
            }

            println!("System config file '{}' already exists.", dest.display());
            if !prompt.confirm("Overwrite file?")? {
                println!("Skipping installation of '{}'", source.display());
                summary.skipped += 1;
                continue;
            }

            if dry_run {
                println!("DRY-RUN: Would delete '{}'", dest.display());
            } else {
                println!("Deleting '{}'", dest.display());
                fs::remove_file(&dest).map_err(|e| DotfilesError::io(&dest, e))?;
            }
        } else if let Some(parent) = dest.parent() {
            if dry_run {
                debug!("Would create parent directory {}", parent.display());
            } else {
                fs::create_dir_all(parent).map_err(|e| DotfilesError::io(parent, e))?;
            }
        }

        if dry_run {
            println!(
                "DRY-RUN: Would create symlink {} -> {}",
                dest.display(),
                source.display()
            );
            summary.skipped += 1;
            continue;
        }

        println!(
            "Creating symlink for dotfile config file '{}' to system config file '{}'",
            source.display(),
            dest.display()
        );
        std::os::unix::fs::symlink(&source, &dest).map_err(|e| DotfilesError::io(&dest, e))?;
        info!("Symlinked: {} -> {}", dest.display(), source.display());
        println!("{} {} -> {}", "Symlinked:".green(), dest.display(), source.display());
        summary.applied += 1;
    }

    Ok(summary)
}
