use colored::Colorize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DotfilesError, Result};
use crate::prompt::Prompt;
use crate::utils::Summary;

/// Result of substituting one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Markers found in the text with no value, left untouched
    pub unknown: Vec<String>,
    /// Values that no marker in the text asked for
    pub unused: Vec<String>,
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Replace every known `$name` and `${name}` marker in `text`.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> Substitution {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut used = BTreeSet::new();
    let mut unknown = BTreeSet::new();
    // start of the pending run of plain text
    let mut plain = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        out.push_str(&text[plain..i]);

        let rest = &bytes[i + 1..];
        let (marker_len, name) = match rest.first() {
            Some(b'$') => {
                out.push('$');
                i += 2;
                plain = i;
                continue;
            }
            Some(&b) if is_ident_start(b) => {
                let len = rest.iter().take_while(|&&c| is_ident_char(c)).count();
                (1 + len, &text[i + 1..i + 1 + len])
            }
            Some(b'{') => {
                let len = rest[1..].iter().take_while(|&&c| is_ident_char(c)).count();
                let closed = rest.get(1 + len) == Some(&b'}');
                if len == 0 || !is_ident_start(rest[1]) || !closed {
                    // not a marker, keep the `$` as text
                    out.push('$');
                    i += 1;
                    plain = i;
                    continue;
                }
                (3 + len, &text[i + 2..i + 2 + len])
            }
            _ => {
                out.push('$');
                i += 1;
                plain = i;
                continue;
            }
        };

        match values.get(name) {
            Some(value) => {
                out.push_str(value);
                used.insert(name.to_string());
            }
            None => {
                out.push_str(&text[i..i + marker_len]);
                unknown.insert(name.to_string());
            }
        }
        i += marker_len;
        plain = i;
    }
    out.push_str(&text[plain..]);

    let mut unused: Vec<String> = values
        .keys()
        .filter(|k| !used.contains(k.as_str()))
        .cloned()
        .collect();
    unused.sort();

    Substitution {
        text: out,
        unknown: unknown.into_iter().collect(),
        unused,
    }
}

/// Substitute user-provided values into every configured template file.
pub fn process_templates(
    config: &Config,
    prompt: &mut dyn Prompt,
    dry_run: bool,
) -> Result<Summary> {
    println!("Processing templates");
    let mut summary = Summary::default();

    // every target must exist before the first question is asked
    let targets = config
        .templates
        .iter()
        .map(|entry| {
            let path = config.resolve(&entry.path);
            if path.is_file() {
                Ok((path, entry))
            } else {
                Err(DotfilesError::MissingTemplate { path })
            }
        })
        .collect::<Result<Vec<(PathBuf, _)>>>()?;

    for (path, entry) in targets {
        info!("Processing template {}", path.display());
        println!("Template '{}'", path.display());

        let mut values = HashMap::new();
        for name in &entry.placeholders {
            if !values.contains_key(name) {
                let value = prompt.input(name)?;
                values.insert(name.clone(), value);
            }
        }

        let raw = fs::read(&path).map_err(|e| DotfilesError::io(&path, e))?;
        let text = String::from_utf8(raw)
            .map_err(|_| DotfilesError::TemplateNotText { path: path.clone() })?;
        let result = substitute(&text, &values);

        for name in &result.unknown {
            warn!("No value for marker '{name}' in {}", path.display());
            println!(
                "{} marker '${name}' in '{}' has no value and was left as is",
                "Warning:".yellow(),
                path.display()
            );
        }
        for name in &result.unused {
            warn!("Placeholder '{name}' does not occur in {}", path.display());
            println!(
                "{} placeholder '{name}' does not occur in '{}'",
                "Warning:".yellow(),
                path.display()
            );
        }

        if dry_run {
            println!("DRY-RUN: Would rewrite '{}'", path.display());
            summary.skipped += 1;
            continue;
        }

        fs::write(&path, result.text).map_err(|e| DotfilesError::io(&path, e))?;
        debug!("Rewrote {}", path.display());
        summary.applied += 1;
    }

    Ok(summary)
}
