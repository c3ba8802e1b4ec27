use std::sync::Arc;

use axum::{Json, Router, routing::post};
use playbox::{
    ExecutionRequest, ExecutionResult, FnDelegate, Gateway, Outcome, RemoteDelegate,
};
use tokio::task::JoinSet;

use super::{fixture_config, scratch_entries, sh_gateway};

#[tokio::test]
async fn test_unknown_language() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("cobol", "DISPLAY 'HI'."))
        .await;
    assert_eq!(result.outcome, Outcome::UnsupportedLanguage);
    assert!(result.text.contains("cobol"));
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_executions_do_not_interfere() {
    let (_dir, gateway) = sh_gateway();

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        let gateway = gateway.clone();
        let language = if i % 2 == 0 { "shell" } else { "shellc" };
        tasks.spawn(async move {
            // Every run writes the same file name into its own workspace
            let source = format!("echo {i} > shared.txt; sleep 0.1; cat shared.txt; ls | wc -l");
            let result = gateway
                .execute(&ExecutionRequest::new(language, source))
                .await;
            (i, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (i, result) = joined.unwrap();
        assert_eq!(result.outcome, Outcome::Success, "run {i}: {}", result.text);
        let mut lines = result.text.lines();
        assert_eq!(lines.next(), Some(i.to_string().as_str()));
        // Only the source and shared.txt are visible
        assert_eq!(lines.next().map(str::trim), Some("2"));
    }

    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_in_process_delegate() {
    let (_dir, gateway) = sh_gateway();
    let gateway = gateway.with_delegate(
        "reverse",
        Arc::new(FnDelegate::new(|req: &ExecutionRequest| {
            Ok(ExecutionResult::success(
                req.source.chars().rev().collect::<String>(),
            ))
        })),
    );

    let result = gateway
        .execute(&ExecutionRequest::new("reverse", "abc"))
        .await;
    assert_eq!(result, ExecutionResult::success("cba"));

    // Configured languages still run locally
    let local = gateway
        .execute(&ExecutionRequest::new("shell", "echo local"))
        .await;
    assert_eq!(local.text, "local\n");
}

#[tokio::test]
async fn test_delegate_overrides_configured_language() {
    let (_dir, gateway) = sh_gateway();
    let gateway = gateway.with_delegate(
        "shell",
        Arc::new(FnDelegate::new(|_: &ExecutionRequest| {
            Ok(ExecutionResult::new(Outcome::RuntimeError, "from delegate"))
        })),
    );

    let result = gateway
        .execute(&ExecutionRequest::new("sh", "echo local"))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert_eq!(result.text, "from delegate");
}

#[tokio::test]
async fn test_configured_remote_delegate() {
    async fn remote(Json(req): Json<ExecutionRequest>) -> Json<ExecutionResult> {
        Json(ExecutionResult::success(format!("{} ran {}", req.language, req.source)))
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/execute", post(remote)))
            .await
            .unwrap()
    });

    let (_dir, mut config) = fixture_config("valid_full.toml");
    if let Some(remote) = config
        .languages
        .get_mut("remote")
        .and_then(|l| l.delegate.as_mut())
    {
        remote.endpoint = format!("http://{addr}/execute");
    }
    let gateway = Gateway::new(config).unwrap();

    let result = gateway
        .execute(&ExecutionRequest::new("remote", "print(1)"))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "python ran print(1)");
}

#[tokio::test]
async fn test_unreachable_remote_is_internal_error() {
    let (_dir, gateway) = sh_gateway();
    let gateway = gateway.with_delegate(
        "remote",
        Arc::new(RemoteDelegate::new("http://127.0.0.1:1/execute")),
    );
    let result = gateway
        .execute(&ExecutionRequest::new("remote", "print(1)"))
        .await;
    assert_eq!(result.outcome, Outcome::InternalError);
}
