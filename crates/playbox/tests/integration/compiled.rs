use playbox::{ExecutionRequest, Outcome, Runner};

use super::{fixture_config, scratch_entries, sh_gateway};

#[tokio::test]
async fn test_compile_and_run() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("shellc", "echo compiled"))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "compiled\n");
}

#[tokio::test]
async fn test_source_named_after_entry_point() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shellc",
            "# class Foo\nbasename \"$0\"",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "Foo.sh\n");
}

#[tokio::test]
async fn test_invalid_entry_point_falls_back_to_default() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shellc",
            "# class 9-lives\nbasename \"$0\"",
        ))
        .await;
    assert_eq!(result.text, "Main.sh\n");
}

#[tokio::test]
async fn test_compile_error_skips_run() {
    let (dir, config) = fixture_config("sh.toml");
    let marker = dir.path().join("ran");
    let gateway = playbox::Gateway::new(config).unwrap();

    // Valid up to the syntax error, so running it would create the marker
    let source = format!("touch '{}'\nif then fi", marker.display());
    let result = gateway
        .execute(&ExecutionRequest::new("shellc", source))
        .await;

    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(!result.text.is_empty());
    assert!(!marker.exists(), "run step must not execute after a compile error");
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_runtime_error_after_compile() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shellc",
            "echo 'Exception in thread \"main\"' >&2; exit 1",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert!(result.text.contains("Exception"));
}

#[tokio::test]
async fn test_runner_compile_reports_entry() {
    let (_dir, config) = fixture_config("sh.toml");
    let root = playbox::ScratchRoot::create(&config.scratch_root).unwrap();
    let language = config.get_language("shellc").unwrap().clone();
    let runner = Runner::new(config);

    let workspace = root.acquire().await.unwrap();
    let compiled = runner
        .compile(&workspace, "# class Greeter\necho hi", &language)
        .await
        .unwrap();

    assert!(compiled.is_success());
    assert_eq!(compiled.entry, "Greeter");
    assert_eq!(compiled.source_name, "Greeter.sh");
    assert!(workspace.file_exists("Greeter.sh").await.unwrap());

    workspace.release().await;
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn test_runner_compile_rejects_interpreted_language() {
    let (_dir, config) = fixture_config("sh.toml");
    let root = playbox::ScratchRoot::create(&config.scratch_root).unwrap();
    let language = config.get_language("shell").unwrap().clone();
    let runner = Runner::new(config);

    let workspace = root.acquire().await.unwrap();
    let err = runner
        .compile(&workspace, "echo hi", &language)
        .await
        .unwrap_err();
    assert!(matches!(err, playbox::ExecuteError::NotCompiled(_)));
    workspace.release().await;
}

#[tokio::test]
async fn test_compiler_warnings_do_not_block_run() {
    let (_dir, gateway) = sh_gateway();
    let source = "# lint: main.sh:3: warning: unused variable 'x'\n\
                  # lint:     3 | x=1\n\
                  # lint:       | ^\n\
                  echo linted";
    let result = gateway
        .execute(&ExecutionRequest::new("shellw", source))
        .await;
    assert_eq!(result.outcome, Outcome::Success, "{}", result.text);
    assert_eq!(result.text, "linted\n");
}

#[tokio::test]
async fn test_error_signal_from_compiler_blocks_run() {
    let (dir, config) = fixture_config("sh.toml");
    let marker = dir.path().join("ran");
    let gateway = playbox::Gateway::new(config).unwrap();

    let source = format!(
        "# lint: main.sh:1: error: use of banned builtin\ntouch '{}'",
        marker.display()
    );
    let result = gateway
        .execute(&ExecutionRequest::new("shellw", source))
        .await;

    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(result.text.contains("banned builtin"));
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_warnings_with_syntax_error_are_compile_error() {
    let (_dir, gateway) = sh_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "shellw",
            "# lint: main.sh:1: warning: style\nif then fi",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(result.text.contains("warning: style"));
}

#[tokio::test]
async fn test_compile_output_respects_configured_cap() {
    let (_dir, mut config) = fixture_config("sh.toml");
    config.default_limits.max_output = Some(1);
    let gateway = playbox::Gateway::new(config).unwrap();

    let source: String = (0..100)
        .map(|i| format!("# lint: main.sh:{i}: error: diagnostic number {i} with padding\n"))
        .collect();
    let result = gateway
        .execute(&ExecutionRequest::new("shellw", source))
        .await;

    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(result.text.ends_with("[output truncated]"), "{}", result.text);
    assert!(result.text.len() < 1100);
}
