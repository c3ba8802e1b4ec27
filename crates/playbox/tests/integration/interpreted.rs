use playbox::types::{NO_OUTPUT_MESSAGE, TIMEOUT_MESSAGE};
use playbox::{ExecutionRequest, Outcome};

use super::{fixture_config, scratch_entries, sh_gateway};

#[tokio::test]
async fn test_hello_world() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "echo hi"))
        .await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "hi\n");
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_alias_selects_language() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(" POSIX ", "echo alias"))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "alias\n");
}

#[tokio::test]
async fn test_source_is_named_main() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "basename \"$0\""))
        .await;
    assert_eq!(result.text, "main.sh\n");
}

#[tokio::test]
async fn test_no_output_sentinel() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway.execute(&ExecutionRequest::new("shell", "true")).await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, NO_OUTPUT_MESSAGE);
}

#[tokio::test]
async fn test_stderr_is_runtime_error() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "echo partial; echo oops >&2; exit 3"))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert_eq!(result.text, "oops");
}

#[tokio::test]
async fn test_silent_failure_reports_status() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "echo before; exit 4"))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert_eq!(result.text, "program exited with status 4\nbefore\n");
}

#[tokio::test]
async fn test_syntax_error_is_runtime_error() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "if then fi"))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert!(!result.text.is_empty());
}

#[tokio::test]
async fn test_noise_only_stderr_is_success() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shell",
            "echo 'warning: deprecated flag' >&2; echo ok",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "ok\n");
}

#[tokio::test]
async fn test_noise_with_error_signal_is_kept() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shell",
            "echo 'warning: deprecated Error handling' >&2",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert_eq!(result.text, "warning: deprecated Error handling");
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let (_dir, mut config) = fixture_config("sh.toml");
    config.default_limits.wall_time_limit = Some(0.5);
    let gateway = playbox::Gateway::new(config).unwrap();

    let started = std::time::Instant::now();
    let result = gateway
        .execute(&ExecutionRequest::new("shell", "while :; do :; done"))
        .await;

    assert_eq!(result.outcome, Outcome::Timeout);
    assert_eq!(result.text, TIMEOUT_MESSAGE);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_output_is_truncated() {
    let (_dir, mut config) = fixture_config("sh.toml");
    config.default_limits.max_output = Some(1);
    let gateway = playbox::Gateway::new(config).unwrap();

    let result = gateway
        .execute(&ExecutionRequest::new(
            "shell",
            "i=0; while [ $i -lt 500 ]; do echo 0123456789; i=$((i+1)); done",
        ))
        .await;

    assert_eq!(result.outcome, Outcome::Success);
    assert!(result.text.ends_with("[output truncated]"));
    assert!(result.text.len() < 1100);
}

#[tokio::test]
async fn test_missing_toolchain_is_internal_error() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("missing", "anything"))
        .await;
    assert_eq!(result.outcome, Outcome::InternalError);
    assert!(result.text.contains("playbox-no-such-interpreter"));
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}
