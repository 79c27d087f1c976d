use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Top-level error for every installer operation.
#[derive(Error, Debug)]
pub enum DotfilesError {
    #[error("Could not find path for the file '{}'", path.display())]
    MissingSource { path: PathBuf },

    #[error("Could not find template file '{}'", path.display())]
    MissingTemplate { path: PathBuf },

    #[error("Folder '{}' does not exist", path.display())]
    MissingFolder { path: PathBuf },

    #[error(
        "Folder '{}' is not inside the archive directory '{}'",
        folder.display(),
        archive_dir.display()
    )]
    FolderOutsideArchiveDir {
        folder: PathBuf,
        archive_dir: PathBuf,
    },

    #[error("Template '{}' is not valid UTF-8 text", path.display())]
    TemplateNotText { path: PathBuf },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive '{}' is not a readable tar stream: {source}", path.display())]
    CorruptArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DotfilesError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures while talking to the user.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Input closed while waiting for an answer to: {question}")]
    Closed { question: String },

    #[error(
        "No passphrase available: set DOTFILES_PASSPHRASE or run from an interactive terminal"
    )]
    NoPassphrase,

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Terminal prompt failed: {0}")]
    Dialog(#[from] dialoguer::Error),
}

/// Failures of the symmetric cipher capability.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Cipher program '{program}' is not installed or not found in PATH")]
    NotFound { program: String },

    #[error("Failed to run cipher program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cipher program '{program}' failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Problems with the configuration record.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid placeholder name '{name}' for template '{path}'")]
    InvalidPlaceholder { path: String, name: String },

    #[error("Invalid permission mode {mode:#o} for '{path}'")]
    InvalidMode { path: String, mode: u32 },

    #[error("Empty path in [{table}] table")]
    EmptyPath { table: &'static str },

    #[error("Could not determine home directory")]
    NoHome,

    #[error("Cannot expand '{path}': home directory '{}' is not valid UTF-8", home.display())]
    HomeNotUtf8 { home: PathBuf, path: String },
}

pub type Result<T> = std::result::Result<T, DotfilesError>;
