//! Tests for the readiness detector against fake dev server scripts.

#![cfg(unix)]

use spadev_core::{DevServerError, DevServerOptions, ScriptLauncher};
use spadev_runtime::{ReadinessDetector, readiness_line, with_timeout};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn detector_for(script_body: &str, timeout: Duration) -> (TempDir, ReadinessDetector) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dev.sh"), script_body).unwrap();

    let options = DevServerOptions::new(dir.path(), "dev.sh")
        .with_launcher(ScriptLauncher::Program {
            program: "sh".to_string(),
            args: vec![],
        })
        .with_startup_timeout(timeout);
    (dir, ReadinessDetector::new(options))
}

#[tokio::test]
async fn test_ready_after_unrelated_output() {
    let (_dir, detector) = detector_for(
        r#"for i in 1 2 3 4 5; do echo "building chunk $i"; done
echo "warning: something noisy" >&2
echo "  Local:   http://localhost:$2/"
exec sleep 30"#,
        Duration::from_secs(10),
    );

    let ready = detector.start().await.unwrap();

    let stdout = ready.process.stdout().lines();
    assert_eq!(stdout.len(), 6);
    assert_eq!(stdout[5].trim(), readiness_line(ready.port));
    assert!(!ready.process.has_exited());

    ready.process.shutdown().await;
}

#[tokio::test]
async fn test_line_for_another_port_is_not_ready() {
    let (_dir, detector) = detector_for(
        r#"echo "Local:   http://localhost:1/"
exit 0"#,
        Duration::from_secs(10),
    );

    let err = detector.start().await.unwrap_err();
    assert!(matches!(err, DevServerError::ExitedPrematurely { .. }));
}

#[tokio::test]
async fn test_exit_without_stderr_still_names_script() {
    let (_dir, detector) = detector_for("exit 2", Duration::from_secs(10));

    let err = detector.start().await.unwrap_err();
    assert_eq!(
        err,
        DevServerError::ExitedPrematurely {
            script: "dev.sh".to_string(),
            stderr: String::new(),
        }
    );
}

#[tokio::test]
async fn test_detector_waits_past_the_startup_timeout() {
    let (_dir, detector) = detector_for(
        r#"sleep 0.4
echo "Local:   http://localhost:$2/"
exec sleep 30"#,
        Duration::from_millis(100),
    );

    let ready = detector.start().await.unwrap();
    assert!(!ready.process.has_exited());
    ready.process.shutdown().await;
}

#[tokio::test]
async fn test_silent_server_is_bounded_by_with_timeout() {
    let (_dir, detector) = detector_for("exec sleep 30", Duration::from_secs(10));

    let err = with_timeout(detector.start(), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DevServerError::Timeout {
            timeout: Duration::from_millis(100)
        }
    );
}
