#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdviewer_update::{
    ChannelDetails, ProgressReporter, RepositoryChannel, UpdateChannel, UpdatePhase, Version,
};

use common::{marker_content, write_script};

struct Checkout {
    root: tempfile::TempDir,
    scripts: tempfile::TempDir,
}

impl Checkout {
    fn new(version: &str) -> Self {
        let root = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir(root.path().join(".git")).expect(".git should be created");
        std::fs::write(root.path().join("version.py"), marker_content(version))
            .expect("marker should be written");
        let scripts = tempfile::tempdir().expect("tempdir should be created");
        Self { root, scripts }
    }

    fn calls_log(&self) -> PathBuf {
        self.scripts.path().join("calls.log")
    }

    /// Channel backed by a script that logs its arguments then runs `body`.
    fn channel(&self, body: &str, timeout: Duration) -> RepositoryChannel {
        let script = write_script(
            self.scripts.path(),
            &format!("echo \"$@\" >> '{}'\n{body}", self.calls_log().display()),
        );
        let config = common::config(self.root.path(), "http://127.0.0.1:9")
            .with_git_program(script)
            .with_command_timeout(timeout);
        RepositoryChannel::new(&config)
    }

    fn calls(&self) -> String {
        std::fs::read_to_string(self.calls_log()).unwrap_or_default()
    }

    fn path(&self) -> &Path {
        self.root.path()
    }
}

async fn update(channel: &RepositoryChannel) -> mdviewer_update::UpdateOutcome {
    channel
        .perform_update(&Version::parse("0.3.1"), &ProgressReporter::silent())
        .await
}

#[tokio::test]
async fn successful_update_reads_version_after_reset() {
    let checkout = Checkout::new("0.3.0");
    let channel = checkout.channel(
        r#"case "$1" in
  fetch) echo "From github.com:juren53/MDviewer" ;;
  reset) printf '__version__ = "0.3.2"\n' > version.py; echo "HEAD is now at abc1234 Release 0.3.2" ;;
esac"#,
        Duration::from_secs(5),
    );

    let outcome = update(&channel).await;

    assert!(outcome.success, "update should succeed: {}", outcome.message);
    // The remote tip wins over the requested target.
    assert_eq!(outcome.message, "Successfully updated to 0.3.2");
    assert_eq!(
        outcome.new_version.as_ref().map(Version::triple),
        Some((0, 3, 2))
    );
    assert_eq!(
        outcome.current_version.as_ref().map(Version::triple),
        Some((0, 3, 0))
    );
    assert!(
        outcome
            .diagnostic_output
            .contains("Fetch: From github.com:juren53/MDviewer")
    );
    assert!(
        outcome
            .diagnostic_output
            .contains("Reset: HEAD is now at abc1234")
    );
    assert!(
        outcome
            .diagnostic_output
            .contains("Update completed: 0.3.0 → 0.3.2")
    );

    let calls = checkout.calls();
    assert!(calls.contains("fetch origin"));
    assert!(calls.contains("reset --hard origin/main"));
    match outcome.details {
        ChannelDetails::Repository { transcript } => assert_eq!(transcript.len(), 2),
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_failure_never_resets() {
    let checkout = Checkout::new("0.3.0");
    let channel = checkout.channel(
        r#"case "$1" in
  fetch) echo "fatal: unable to access 'https://github.com/juren53/MDviewer/'" >&2; exit 128 ;;
esac"#,
        Duration::from_secs(5),
    );

    let outcome = update(&channel).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_phase(), Some(UpdatePhase::Fetching));
    assert_eq!(
        outcome.message,
        "Failed to fetch from remote: fatal: unable to access 'https://github.com/juren53/MDviewer/'"
    );
    assert_eq!(
        outcome.error_output,
        "fatal: unable to access 'https://github.com/juren53/MDviewer/'"
    );
    assert!(!checkout.calls().contains("reset"));
}

#[tokio::test]
async fn reset_failure_keeps_pre_update_version() {
    let checkout = Checkout::new("0.3.0");
    let channel = checkout.channel(
        r#"case "$1" in
  fetch) exit 0 ;;
  reset) echo "fatal: ambiguous argument 'origin/main'" >&2; exit 128 ;;
esac"#,
        Duration::from_secs(5),
    );

    let outcome = update(&channel).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failed_phase(), Some(UpdatePhase::Resetting));
    assert_eq!(
        outcome.message,
        "Failed to reset to origin/main: fatal: ambiguous argument 'origin/main'"
    );
    assert_eq!(
        outcome.current_version.as_ref().map(Version::triple),
        Some((0, 3, 0))
    );
    assert!(outcome.new_version.is_none());
}

#[tokio::test]
async fn timeout_is_distinct_from_command_failure() {
    let checkout = Checkout::new("0.3.0");
    let slow = checkout.channel("sleep 5", Duration::from_secs(1));

    let timed_out = update(&slow).await;

    assert!(!timed_out.success);
    assert!(
        timed_out.message.contains("timed out after 1 seconds"),
        "message: {}",
        timed_out.message
    );
    assert!(
        timed_out
            .failure
            .as_ref()
            .is_some_and(|failure| failure.reason.is_timeout())
    );

    let failing = checkout.channel("echo 'fatal: bad' >&2; exit 1", Duration::from_secs(5));
    let failed = update(&failing).await;

    assert!(!failed.success);
    assert!(!failed.message.contains("timed out"));
    assert!(
        !failed
            .failure
            .as_ref()
            .is_some_and(|failure| failure.reason.is_timeout())
    );
}

#[tokio::test]
async fn non_checkout_is_rejected_without_running_commands() {
    let checkout = Checkout::new("0.3.0");
    std::fs::remove_dir(checkout.path().join(".git")).expect(".git should be removed");
    let channel = checkout.channel("exit 0", Duration::from_secs(5));

    let outcome = update(&channel).await;

    assert!(!outcome.success);
    assert!(outcome.message.contains("not a git checkout"));
    assert!(checkout.calls().is_empty());
}

#[tokio::test]
async fn missing_client_is_reported_clearly() {
    let checkout = Checkout::new("0.3.0");
    let config = common::config(checkout.path(), "http://127.0.0.1:9")
        .with_git_program(checkout.scripts.path().join("no-such-git"));
    let channel = RepositoryChannel::new(&config);

    let outcome = update(&channel).await;

    assert!(!outcome.success);
    assert!(
        outcome
            .message
            .contains("no-such-git command not found. Is it installed and in PATH?")
    );
}

#[tokio::test]
async fn status_reports_clean_and_dirty_trees() {
    let checkout = Checkout::new("0.3.0");

    let clean = checkout
        .channel("exit 0", Duration::from_secs(5))
        .repository_status()
        .await;
    assert!(clean.is_clean);
    assert_eq!(clean.message, "Working directory clean");

    let dirty = checkout
        .channel("echo ' M viewer.py'", Duration::from_secs(5))
        .repository_status()
        .await;
    assert!(!dirty.is_clean);
    assert_eq!(dirty.message, "Working directory has uncommitted changes");

    let broken = checkout
        .channel("echo 'fatal: not a git repository' >&2; exit 128", Duration::from_secs(5))
        .repository_status()
        .await;
    assert!(!broken.is_clean);
    assert!(broken.message.starts_with("Failed to get status"));
}

#[tokio::test]
async fn remote_info_degrades_to_defaults() {
    let checkout = Checkout::new("0.3.0");

    let info = checkout
        .channel(
            r#"case "$1" in
  config) echo "https://github.com/juren53/MDviewer.git" ;;
  branch) echo "develop" ;;
esac"#,
            Duration::from_secs(5),
        )
        .remote_info()
        .await;
    assert_eq!(info.url, "https://github.com/juren53/MDviewer.git");
    assert_eq!(info.branch, "develop");

    let fallback = checkout
        .channel("exit 1", Duration::from_secs(5))
        .remote_info()
        .await;
    assert!(fallback.url.is_empty());
    assert_eq!(fallback.branch, "main");
}
