use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archive::{pack_archives, unpack_archives};
use crate::cipher::{Cipher, OpensslCipher};
use crate::config::Config;
use crate::permissions::fix_permissions;
use crate::prompt::{Prompt, TerminalPrompt};
use crate::symlinks::create_symlinks;
use crate::templates::process_templates;
use crate::utils::Summary;

#[derive(Parser, Debug)]
#[command(name = "dotfiles")]
#[command(about = "Dotfiles installation utility")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to DOTFILES_CONFIG, then ./dotfiles.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable dry-run mode (simulate operations without making changes)
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Fix permissions, then symlink dotfiles into place
    Install,

    /// Fix permissions, then pack folders into encrypted archives
    Pack,

    /// Unpack encrypted archives, then fix permissions
    Unpack,

    /// Fix file permissions only
    Permissions,

    /// Fill in templated files from user input
    Templates,
}

/// Set up the stderr log subscriber for the requested verbosity.
pub fn init_logging(args: &Args) {
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };

    // Only initialize if not already initialized
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(args: Args) -> Result<()> {
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    println!("Dotfiles installation utility");
    if args.dry_run {
        warn!("Running in DRY-RUN mode - no changes will be made");
        println!("DRY-RUN: No changes will be made");
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!("Using base directory {}", config.base_dir.display());

    let cipher = OpensslCipher::new(&config.cipher);
    let needs_cipher = matches!(args.command, Commands::Pack | Commands::Unpack)
        && !config.archives.is_empty();
    if needs_cipher && !args.dry_run {
        let program = cipher.check()?;
        info!("Using cipher program {}", program.display());
    }

    let mut prompt = TerminalPrompt::new();
    let report = dispatch(args.command, &config, &mut prompt, &cipher, args.dry_run)?;

    for (step, summary) in report {
        println!("{} {step}: {summary}", "Done".green());
    }
    Ok(())
}

/// Run the steps a command stands for, in order, stopping at the first fatal error.
pub fn dispatch(
    command: Commands,
    config: &Config,
    prompt: &mut dyn Prompt,
    cipher: &dyn Cipher,
    dry_run: bool,
) -> Result<Vec<(&'static str, Summary)>> {
    let mut report = Vec::new();
    match command {
        Commands::Install => {
            report.push(("permissions", fix_permissions(config, dry_run)?));
            report.push(("symlinks", create_symlinks(config, prompt, dry_run)?));
        }
        Commands::Pack => {
            report.push(("permissions", fix_permissions(config, dry_run)?));
            report.push(("pack", pack_archives(config, prompt, cipher, dry_run)?));
        }
        Commands::Unpack => {
            report.push(("unpack", unpack_archives(config, prompt, cipher, dry_run)?));
            report.push(("permissions", fix_permissions(config, dry_run)?));
        }
        Commands::Permissions => {
            report.push(("permissions", fix_permissions(config, dry_run)?));
        }
        Commands::Templates => {
            report.push(("templates", process_templates(config, prompt, dry_run)?));
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::testing::XorCipher;
    use crate::config::{ArchiveEntry, PermissionEntry, SymlinkEntry};
    use crate::error::DotfilesError;
    use crate::prompt::testing::ScriptedPrompt;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn mode_of(path: &std::path::Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_parse_commands() {
        let args = Args::try_parse_from(["dotfiles", "install"]).unwrap();
        assert_eq!(args.command, Commands::Install);
        assert!(!args.dry_run);

        let args = Args::try_parse_from(["dotfiles", "unpack", "--dry-run", "-v"]).unwrap();
        assert_eq!(args.command, Commands::Unpack);
        assert!(args.dry_run);
        assert!(args.verbose);

        let args = Args::try_parse_from(["dotfiles", "-c", "x.toml", "permissions"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Args::try_parse_from(["dotfiles", "deploy"]).is_err());
        assert!(Args::try_parse_from(["dotfiles"]).is_err());
        assert!(Args::try_parse_from(["dotfiles", "install", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_install_fixes_permissions_before_linking() {
        let repo = tempdir().unwrap();
        let home = tempdir().unwrap();
        fs::create_dir(repo.path().join("ssh")).unwrap();
        fs::write(repo.path().join("ssh/ssh_config"), "Host *").unwrap();
        let config = Config {
            symlinks: vec![SymlinkEntry {
                source: "./ssh/ssh_config".into(),
                destination: "~/.ssh/config".into(),
            }],
            permissions: vec![PermissionEntry {
                path: "./ssh/ssh_config".into(),
                mode: 0o600,
            }],
            base_dir: repo.path().to_path_buf(),
            home_dir: home.path().to_path_buf(),
            ..Config::default()
        };
        let mut prompt = ScriptedPrompt::new(&[true]);

        let report = dispatch(Commands::Install, &config, &mut prompt, &XorCipher, false).unwrap();

        let steps: Vec<_> = report.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, vec!["permissions", "symlinks"]);
        assert_eq!(mode_of(&repo.path().join("ssh/ssh_config")), 0o600);
        assert_eq!(mode_of(&home.path().join(".ssh/config")), 0o600);
    }

    #[test]
    fn test_unpack_fixes_permissions_of_extracted_files() {
        let repo = tempdir().unwrap();
        fs::create_dir(repo.path().join("vault")).unwrap();
        fs::write(repo.path().join("vault/key"), "k").unwrap();
        fs::set_permissions(repo.path().join("vault/key"), fs::Permissions::from_mode(0o644))
            .unwrap();
        let config = Config {
            archives: vec![ArchiveEntry {
                archive: "vault.tar.aes".into(),
                folder: "vault".into(),
            }],
            permissions: vec![PermissionEntry {
                path: "vault/key".into(),
                mode: 0o400,
            }],
            base_dir: repo.path().to_path_buf(),
            home_dir: repo.path().to_path_buf(),
            ..Config::default()
        };

        let mut prompt = ScriptedPrompt::new(&[]).with_passphrase("pw");
        dispatch(Commands::Pack, &config, &mut prompt, &XorCipher, false).unwrap();
        fs::remove_dir_all(repo.path().join("vault")).unwrap();

        let mut prompt = ScriptedPrompt::new(&[]).with_passphrase("pw");
        let report = dispatch(Commands::Unpack, &config, &mut prompt, &XorCipher, false).unwrap();

        let steps: Vec<_> = report.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, vec!["unpack", "permissions"]);
        assert_eq!(mode_of(&repo.path().join("vault/key")), 0o400);
    }

    #[test]
    fn test_fatal_error_stops_dispatch() {
        let repo = tempdir().unwrap();
        let config = Config {
            symlinks: vec![SymlinkEntry {
                source: "./missing".into(),
                destination: "~/.missing".into(),
            }],
            base_dir: repo.path().to_path_buf(),
            home_dir: repo.path().to_path_buf(),
            ..Config::default()
        };
        let mut prompt = ScriptedPrompt::new(&[true]);

        let err = dispatch(Commands::Install, &config, &mut prompt, &XorCipher, false).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DotfilesError>(),
            Some(DotfilesError::MissingSource { .. })
        ));
        assert!(prompt.asked.is_empty());
    }
}
