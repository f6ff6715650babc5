//! CLI integration tests for solarhub admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;
use solarhub::auth::verify_credentials;
use solarhub::store::{SqliteStore, Store};

const PASSWORD: &str = "correct-horse";

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("solarhub").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .env_remove("SOLARHUB_ADMIN_PASSWORD")
            .env_remove("SOLARHUB_USER_PASSWORD");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--password",
                PASSWORD,
                "--non-interactive",
            ])
            .assert()
    }

    fn add_user(&self, username: &str, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "user",
                "add",
                "--data-dir",
                &self.data_dir_str(),
                "--username",
                username,
                "--password",
                PASSWORD,
                "--non-interactive",
            ])
            .args(extra)
            .assert()
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .args(["--data-dir", &self.data_dir_str(), "--json"])
            .output()
            .expect("failed to run command");

        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }

    fn open_store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("solarhub.db")).expect("open store")
    }
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn init_creates_database_objects_dir_and_admin_token_file() {
    let ctx = TestContext::new();

    ctx.init().success();

    assert!(ctx.data_dir().join("solarhub.db").exists());
    assert!(ctx.data_dir().join("objects").is_dir());

    let token_content = std::fs::read_to_string(ctx.data_dir().join(".admin_token"))
        .expect("failed to read token file");
    assert!(token_content.starts_with("solarhub_"));
}

#[test]
fn init_creates_admin_user_with_default_name() {
    let ctx = TestContext::new();

    ctx.init().success();

    let store = ctx.open_store();
    let user = verify_credentials(&store, "admin", PASSWORD)
        .expect("verify")
        .expect("admin user");
    assert!(user.is_admin());
}

#[test]
fn init_rejects_second_initialization() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn init_requires_password_in_non_interactive_mode() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password"));
}

#[test]
fn init_reads_password_from_environment() {
    let ctx = TestContext::new();

    ctx.cmd()
        .env("SOLARHUB_ADMIN_PASSWORD", PASSWORD)
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--username",
            "curator",
            "--non-interactive",
        ])
        .assert()
        .success();

    let store = ctx.open_store();
    assert!(
        verify_credentials(&store, "curator", PASSWORD)
            .expect("verify")
            .is_some()
    );
}

#[test]
fn init_rejects_short_password() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--password",
            "short",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8"));
}

// ============================================================================
// User Command Tests
// ============================================================================

#[test]
fn user_add_requires_initialized_database() {
    let ctx = TestContext::new();

    ctx.add_user("editor", &[])
        .failure()
        .stderr(predicate::str::contains("admin init"));
}

#[test]
fn user_add_creates_user_with_role() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("editor", &["--role", "editor"])
        .success()
        .stdout(predicate::str::contains("Created user \"editor\""));

    let users = ctx.json(&["admin", "user", "list"]);
    let users = users.as_array().expect("array");
    assert_eq!(users.len(), 2);

    let editor = users
        .iter()
        .find(|u| u["username"] == "editor")
        .expect("editor listed");
    assert_eq!(editor["role"], "editor");
}

#[test]
fn user_add_with_token_prints_token() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("curator", &["--create-token"])
        .success()
        .stdout(predicate::str::contains("Token created: solarhub_"));
}

#[test]
fn user_add_rejects_duplicate_username() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("admin", &[])
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn user_add_rejects_invalid_role() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("editor", &["--role", "Editor"])
        .failure()
        .stderr(predicate::str::contains("lowercase"));
}

// ============================================================================
// Info Command Tests
// ============================================================================

#[test]
fn info_reports_empty_gallery_after_init() {
    let ctx = TestContext::new();
    ctx.init().success();

    let info = ctx.json(&["admin", "info"]);
    assert_eq!(info["total_photos"], 0);
    assert_eq!(info["total_collections"], 0);
    assert_eq!(info["total_users"], 1);
    assert_eq!(info["admins"], 1);
}

#[test]
fn info_text_output_names_server() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "info", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Solarhub Server Status"));
}

#[test]
fn serve_refuses_uninitialized_data_dir() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
