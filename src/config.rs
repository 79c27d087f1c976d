use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::utils::{get_home_dir, normalize, resolve_path};

/// File name looked up in the current directory when no config is given.
pub const CONFIG_FILE_NAME: &str = "dotfiles.toml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Files whose `$name` markers are filled in from user input
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,

    /// Dotfiles linked into their system locations
    #[serde(default)]
    pub symlinks: Vec<SymlinkEntry>,

    /// Permission modes enforced on dotfiles
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,

    /// Encrypted archives and the folder each one holds
    #[serde(default)]
    pub archives: Vec<ArchiveEntry>,

    /// External cipher settings
    #[serde(default)]
    pub cipher: CipherConfig,

    /// Directory relative table paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// Directory `~` expands to
    #[serde(skip)]
    pub home_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub path: String,
    /// Placeholder names, asked in this order
    #[serde(default)]
    pub placeholders: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SymlinkEntry {
    /// File or directory inside the dotfiles repository
    pub source: String,
    /// Where the link is created
    pub destination: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PermissionEntry {
    pub path: String,
    pub mode: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Encrypted archive file
    pub archive: String,
    /// Folder stored in the archive, must live under the archive's directory
    pub folder: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CipherConfig {
    /// Program invoked for encryption and decryption
    #[serde(default = "default_cipher_program")]
    pub program: String,

    /// Cipher name passed to the program
    #[serde(default = "default_cipher_algorithm")]
    pub algorithm: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            program: default_cipher_program(),
            algorithm: default_cipher_algorithm(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.base_dir = normalize(&absolute(parent));
        config.home_dir = get_home_dir()?;
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file.
    ///
    /// An explicitly requested file (flag or `DOTFILES_CONFIG`) must exist;
    /// the implicit `dotfiles.toml` lookup may come back empty.
    pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os("DOTFILES_CONFIG").map(PathBuf::from));
        if let Some(path) = requested {
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(ConfigError::NotFound { path });
        }

        let current_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_config.exists() {
            return Ok(Some(current_config));
        }

        Ok(None)
    }

    /// Load configuration from file or fall back to the built-in tables
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::find_config_file(explicit)? {
            Some(config_path) => {
                tracing::debug!("Loading config from {}", config_path.display());
                Self::from_file(&config_path)
            }
            None => {
                tracing::debug!("No {CONFIG_FILE_NAME} found, using built-in tables");
                let mut config = Self::builtin();
                config.base_dir = normalize(&absolute(Path::new(".")));
                config.home_dir = get_home_dir()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// The tables shipped with the dotfiles repository.
    pub fn builtin() -> Self {
        let symlinks = [
            ("./bash/bashrc", "~/.bashrc"),
            ("./fish/config.fish", "~/.config/fish/config.fish"),
            ("./gdb/gdbinit", "~/.config/gdb/gdbinit"),
            ("./git/gitconfig", "~/.gitconfig"),
            ("./htop/htoprc", "~/.config/htop/htoprc"),
            (
                "./python/ipython_config.py",
                "~/.ipython/profile_default/ipython_config.py",
            ),
            ("./ssh/ssh_config", "~/.ssh/config"),
            ("./tmux/tmux.conf", "~/.tmux.conf"),
            ("./vscode/settings.json", "~/.config/Code/User/settings.json"),
        ]
        .into_iter()
        .map(|(source, destination)| SymlinkEntry {
            source: source.to_string(),
            destination: destination.to_string(),
        })
        .collect();

        Config {
            templates: Vec::new(),
            symlinks,
            permissions: vec![PermissionEntry {
                path: "./ssh/ssh_config".to_string(),
                mode: 0o600,
            }],
            archives: Vec::new(),
            cipher: CipherConfig::default(),
            base_dir: PathBuf::new(),
            home_dir: PathBuf::new(),
        }
    }

    /// Resolve a table path to an absolute, `~`-expanded path.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        resolve_path(raw, &self.base_dir, &self.home_dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for template in &self.templates {
            if template.path.is_empty() {
                return Err(ConfigError::EmptyPath { table: "templates" });
            }
            if let Some(bad) = template
                .placeholders
                .iter()
                .find(|name| !is_identifier(name))
            {
                return Err(ConfigError::InvalidPlaceholder {
                    path: template.path.clone(),
                    name: bad.clone(),
                });
            }
        }

        if self
            .symlinks
            .iter()
            .any(|s| s.source.is_empty() || s.destination.is_empty())
        {
            return Err(ConfigError::EmptyPath { table: "symlinks" });
        }

        for entry in &self.permissions {
            if entry.path.is_empty() {
                return Err(ConfigError::EmptyPath {
                    table: "permissions",
                });
            }
            if entry.mode > 0o7777 {
                return Err(ConfigError::InvalidMode {
                    path: entry.path.clone(),
                    mode: entry.mode,
                });
            }
        }

        if self
            .archives
            .iter()
            .any(|a| a.archive.is_empty() || a.folder.is_empty())
        {
            return Err(ConfigError::EmptyPath { table: "archives" });
        }

        // `~` can only be expanded into a home path that is valid UTF-8
        if self.home_dir.to_str().is_none() {
            if let Some(raw) = self.table_paths().find(|p| p.starts_with('~')) {
                return Err(ConfigError::HomeNotUtf8 {
                    home: self.home_dir.clone(),
                    path: raw.to_string(),
                });
            }
        }

        Ok(())
    }

    fn table_paths(&self) -> impl Iterator<Item = &str> {
        let templates = self.templates.iter().map(|t| t.path.as_str());
        let symlinks = self
            .symlinks
            .iter()
            .flat_map(|s| [s.source.as_str(), s.destination.as_str()]);
        let permissions = self.permissions.iter().map(|p| p.path.as_str());
        let archives = self
            .archives
            .iter()
            .flat_map(|a| [a.archive.as_str(), a.folder.as_str()]);
        templates.chain(symlinks).chain(permissions).chain(archives)
    }
}

/// Placeholder names follow shell variable rules.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

// Helper functions for default values
fn default_cipher_program() -> String {
    "openssl".to_string()
}

fn default_cipher_algorithm() -> String {
    "aes256".to_string()
}
