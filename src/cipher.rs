use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tracing::debug;

use crate::config::CipherConfig;
use crate::error::CipherError;

/// Variable used to hand the passphrase to the child process.
const CHILD_PASS_ENV: &str = "DOTFILES_CIPHER_PASSPHRASE";

/// Symmetric passphrase-based encryption of archive bytes.
///
/// A failed run is an error, never empty output.
pub trait Cipher {
    fn encrypt(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError>;
}

#[derive(Debug, Clone)]
pub struct OpensslCipher {
    program: String,
    algorithm: String,
}

impl OpensslCipher {
    pub fn new(config: &CipherConfig) -> Self {
        Self {
            program: config.program.clone(),
            algorithm: config.algorithm.clone(),
        }
    }

    /// Locate the cipher program on `PATH`.
    pub fn check(&self) -> Result<PathBuf, CipherError> {
        which::which(&self.program).map_err(|_| CipherError::NotFound {
            program: self.program.clone(),
        })
    }

    fn run(&self, direction: &str, input: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError> {
        let program = self.check()?;
        debug!("Running {} {} {}", program.display(), self.algorithm, direction);

        let mut child = Command::new(&program)
            .args([self.algorithm.as_str(), direction, "-salt", "-pbkdf2"])
            .arg("-pass")
            .arg(format!("env:{CHILD_PASS_ENV}"))
            .env(CHILD_PASS_ENV, passphrase)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CipherError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // feed stdin from a second thread so a full stdout pipe cannot deadlock us
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut pipe) => pipe.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (output, written)
        });

        let Output {
            status,
            stdout,
            stderr,
        } = output.map_err(|source| CipherError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(CipherError::Failed {
                program: self.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        written.map_err(|source| CipherError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        Ok(stdout)
    }
}

impl Cipher for OpensslCipher {
    fn encrypt(&self, plaintext: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError> {
        self.run("-e", plaintext, passphrase)
    }

    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<Vec<u8>, CipherError> {
        self.run("-d", ciphertext, passphrase)
    }
}
