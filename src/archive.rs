use colored::Colorize;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::cipher::Cipher;
use crate::config::Config;
use crate::error::{DotfilesError, Result};
use crate::prompt::Prompt;
use crate::utils::{entry_exists, list_dir_names, Summary};

/// Build an uncompressed tar of `folder`, stored under `name`.
///
/// Symlinks inside the folder are archived as links, not followed.
pub fn build_tar(folder: &Path, name: &Path) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    if folder.is_dir() {
        builder.append_dir_all(name, folder)?;
    } else {
        builder.append_path_with_name(folder, name)?;
    }
    builder.into_inner()
}

/// First path component of every entry in a tar stream.
pub fn top_level_names(tar_bytes: &[u8]) -> io::Result<BTreeSet<String>> {
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    let mut names = BTreeSet::new();
    for entry in archive.entries()? {
        let entry = entry?;
        let path = entry.path()?;
        let first = path.components().find_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        });
        if let Some(first) = first {
            names.insert(first);
        }
    }
    Ok(names)
}

fn extract_tar(tar_bytes: &[u8], dest: &Path) -> io::Result<()> {
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(dest)
}

/// Replace `path` with `data` through a temporary sibling and a rename.
fn write_replacing(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DotfilesError::io(dir, e))?;
    tmp.write_all(data)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| DotfilesError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| DotfilesError::io(path, e.error))?;
    Ok(())
}

fn archive_dir(archive: &Path) -> PathBuf {
    archive
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Pack every configured folder into its encrypted archive.
pub fn pack_archives(
    config: &Config,
    prompt: &mut dyn Prompt,
    cipher: &dyn Cipher,
    dry_run: bool,
) -> Result<Summary> {
    println!("Packing files");
    let mut summary = Summary::default();

    for entry in &config.archives {
        let archive = config.resolve(&entry.archive);

        if entry_exists(&archive) {
            println!("Archive file '{}' already exists.", archive.display());
            if !prompt.confirm("Overwrite file?")? {
                println!("Skipping packing of '{}'", archive.display());
                summary.skipped += 1;
                continue;
            }
        }

        let folder = config.resolve(&entry.folder);
        if !entry_exists(&folder) {
            return Err(DotfilesError::MissingFolder { path: folder });
        }
        let dir = archive_dir(&archive);
        let name = match folder.strip_prefix(&dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => {
                return Err(DotfilesError::FolderOutsideArchiveDir {
                    folder,
                    archive_dir: dir,
                })
            }
        };

        if dry_run {
            println!(
                "DRY-RUN: Would pack '{}' into '{}'",
                folder.display(),
                archive.display()
            );
            summary.skipped += 1;
            continue;
        }

        let tar_bytes = build_tar(&folder, &name).map_err(|e| DotfilesError::io(&folder, e))?;
        debug!("Built {} byte tar of {}", tar_bytes.len(), folder.display());

        let passphrase =
            prompt.passphrase(&format!("Passphrase for '{}'", archive.display()), true)?;
        let ciphertext = cipher.encrypt(&tar_bytes, &passphrase)?;
        write_replacing(&archive, &ciphertext)?;

        info!("Packed {} into {}", folder.display(), archive.display());
        println!("{} '{}'", "Packed:".green(), archive.display());
        summary.applied += 1;
    }

    Ok(summary)
}

/// Decrypt and extract every configured archive next to itself.
pub fn unpack_archives(
    config: &Config,
    prompt: &mut dyn Prompt,
    cipher: &dyn Cipher,
    dry_run: bool,
) -> Result<Summary> {
    println!("Unpacking files");
    let mut summary = Summary::default();

    for entry in &config.archives {
        let archive = config.resolve(&entry.archive);

        if !archive.is_file() {
            println!("Archive file '{}' does not exist.", archive.display());
            println!("Skipping unpacking of '{}'", archive.display());
            summary.skipped += 1;
            continue;
        }

        let ciphertext = fs::read(&archive).map_err(|e| DotfilesError::io(&archive, e))?;
        let passphrase =
            prompt.passphrase(&format!("Passphrase for '{}'", archive.display()), false)?;
        let tar_bytes = cipher.decrypt(&ciphertext, &passphrase)?;

        let corrupt = |source| DotfilesError::CorruptArchive {
            path: archive.clone(),
            source,
        };
        let names = top_level_names(&tar_bytes).map_err(corrupt)?;
        let dir = archive_dir(&archive);
        let existing: BTreeSet<String> = list_dir_names(&dir)
            .map_err(|e| DotfilesError::io(&dir, e))?
            .into_iter()
            .collect();

        let conflicts: Vec<&String> = names.intersection(&existing).collect();
        if !conflicts.is_empty() {
            println!(
                "Unpacking the archive '{}' will cause (a) file(s) to be overwritten: {}",
                archive.display(),
                conflicts
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if !prompt.confirm("Overwrite file(s)?")? {
                println!("Skipping unpacking of '{}'", archive.display());
                summary.skipped += 1;
                continue;
            }
        }

        if dry_run {
            println!(
                "DRY-RUN: Would unpack '{}' into '{}'",
                archive.display(),
                dir.display()
            );
            summary.skipped += 1;
            continue;
        }

        extract_tar(&tar_bytes, &dir).map_err(corrupt)?;
        info!("Unpacked {} into {}", archive.display(), dir.display());
        println!("{} '{}'", "Unpacked:".green(), archive.display());
        summary.applied += 1;
    }

    Ok(summary)
}
