mod common;
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;

use common::TestEnv;

const GITCONFIG: &str = "[user]\n    name = $full_name\n    email = ${email}\n";

fn git_template_config(env: &TestEnv) {
    env.write_config(
        r#"
[[templates]]
path = "git/gitconfig"
placeholders = ["full_name", "email"]
"#,
    );
}

#[test]
fn test_templates_fill_in_answers() {
    let env = TestEnv::new();
    env.repo_file("git/gitconfig", GITCONFIG);
    git_template_config(&env);

    env.command()
        .arg("templates")
        .write_stdin("Jane Doe\njane@example.com\n")
        .assert()
        .success()
        .stdout(contains("Enter information for full_name: "))
        .stdout(contains("Enter information for email: "))
        .stdout(contains("templates: 1 applied, 0 skipped"));

    env.repo
        .child("git/gitconfig")
        .assert("[user]\n    name = Jane Doe\n    email = jane@example.com\n");
}

#[test]
fn test_unknown_marker_left_in_place() {
    let env = TestEnv::new();
    env.repo_file("prices", "cost: $$5, user: $user, host: $host\n");
    env.write_config(
        r#"
[[templates]]
path = "prices"
placeholders = ["user"]
"#,
    );

    env.command()
        .arg("templates")
        .write_stdin("root\n")
        .assert()
        .success()
        .stdout(contains("has no value and was left as is"));

    env.repo
        .child("prices")
        .assert("cost: $5, user: root, host: $host\n");
}

#[test]
fn test_missing_template_fails_before_prompting() {
    let env = TestEnv::new();
    git_template_config(&env);

    env.command()
        .arg("templates")
        .write_stdin("Jane\njane@example.com\n")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Could not find template file"))
        .stdout(contains("Enter information").not());
}

#[test]
fn test_templates_dry_run_keeps_file() {
    let env = TestEnv::new();
    env.repo_file("git/gitconfig", GITCONFIG);
    git_template_config(&env);

    env.command()
        .args(["templates", "--dry-run"])
        .write_stdin("Jane\njane@example.com\n")
        .assert()
        .success()
        .stdout(contains("DRY-RUN: Would rewrite"));

    env.repo.child("git/gitconfig").assert(GITCONFIG);
}

#[test]
fn test_templates_closed_input() {
    let env = TestEnv::new();
    env.repo_file("git/gitconfig", GITCONFIG);
    git_template_config(&env);

    env.command()
        .arg("templates")
        .write_stdin("Jane\n")
        .assert()
        .failure()
        .stderr(contains("Input closed"));

    env.repo.child("git/gitconfig").assert(GITCONFIG);
}
