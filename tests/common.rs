use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

/// A dotfiles repository and a fake home directory, both temporary.
pub struct TestEnv {
    pub repo: assert_fs::TempDir,
    pub home: assert_fs::TempDir,
}

impl TestEnv {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            repo: assert_fs::TempDir::new().unwrap(),
            home: assert_fs::TempDir::new().unwrap(),
        }
    }

    /// Create a dotfiles command isolated to this repository and home
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("dotfiles").unwrap();
        cmd.current_dir(self.repo.path());
        cmd.env("DOTFILES_HOME", self.home.path());
        cmd.env_remove("DOTFILES_CONFIG");
        cmd.env_remove("DOTFILES_PASSPHRASE");
        cmd
    }

    /// Write `dotfiles.toml` at the repository root
    #[allow(dead_code)]
    pub fn write_config(&self, content: &str) {
        self.repo.child("dotfiles.toml").write_str(content).unwrap();
    }

    /// Write a file inside the repository, creating parent directories
    #[allow(dead_code)]
    pub fn repo_file(&self, rel: &str, content: &str) {
        self.repo.child(rel).write_str(content).unwrap();
    }
}

#[allow(dead_code)]
pub fn mode_of(path: &Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[allow(dead_code)]
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True when an `openssl` binary is available for round-trip tests
#[allow(dead_code)]
pub fn openssl_available() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Drives a child on a pseudo-terminal: waits for each expected text, then
/// types the paired answer. Prints the transcript and exits with the child's
/// status, or 124 when it is still running after the deadline.
#[allow(dead_code)]
const PTY_DRIVER: &str = r#"
import os, pty, select, sys, time

binary, count = sys.argv[1], int(sys.argv[2])
args = sys.argv[3:3 + count]
rest = sys.argv[3 + count:]
steps = list(zip(rest[0::2], rest[1::2]))

pid, fd = pty.fork()
if pid == 0:
    os.execv(binary, [binary] + args)

out = b""
seen = 0
deadline = time.time() + 30
while True:
    if time.time() > deadline:
        os.kill(pid, 9)
        sys.stdout.write(out.decode(errors="replace"))
        sys.exit(124)
    ready, _, _ = select.select([fd], [], [], 0.1)
    if ready:
        try:
            chunk = os.read(fd, 4096)
        except OSError:
            chunk = b""
        if not chunk:
            break
        out += chunk
    if steps:
        expect = steps[0][0].encode()
        at = out.find(expect, seen)
        if at >= 0:
            seen = at + len(expect)
            time.sleep(0.5)
            os.write(fd, (steps[0][1] + "\n").encode())
            steps.pop(0)

_, status = os.waitpid(pid, 0)
sys.stdout.write(out.decode(errors="replace"))
sys.exit(os.WEXITSTATUS(status) if os.WIFEXITED(status) else 128)
"#;

/// True when python3 with the `pty` module can drive a terminal session
#[allow(dead_code)]
pub fn pty_available() -> bool {
    Command::new("python3")
        .args(["-c", "import pty, select"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run `dotfiles` on a terminal, answering each `(expect, answer)` in turn.
/// Returns the exit code and everything the terminal showed.
#[allow(dead_code)]
pub fn run_in_pty(env: &TestEnv, args: &[&str], script: &[(&str, &str)]) -> (i32, String) {
    let binary = assert_cmd::cargo::cargo_bin("dotfiles");
    let mut cmd = Command::new("python3");
    cmd.current_dir(env.repo.path())
        .env("DOTFILES_HOME", env.home.path())
        .env_remove("DOTFILES_CONFIG")
        .env_remove("DOTFILES_PASSPHRASE")
        .arg("-c")
        .arg(PTY_DRIVER)
        .arg(&binary)
        .arg(args.len().to_string())
        .args(args);
    for (expect, answer) in script {
        cmd.arg(expect).arg(answer);
    }
    let output = cmd.output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
    )
}
