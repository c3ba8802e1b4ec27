//! Real toolchains from the default configuration (python3, node, javac, java, gcc)

use playbox::{Config, ExecutionRequest, Gateway, Outcome};

use super::scratch_entries;

fn default_gateway() -> (tempfile::TempDir, Gateway) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.scratch_root = dir.path().join("scratch");
    (dir, Gateway::new(config).unwrap())
}

#[tokio::test]
async fn test_python_hello() {
    let (_dir, gateway) = default_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("python", "print('hi')"))
        .await;
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.text, "hi\n");
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_python_syntax_error() {
    let (_dir, gateway) = default_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("python3", "print('hi'"))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert!(result.text.contains("SyntaxError"));
}

#[tokio::test]
async fn test_python_infinite_loop() {
    let (_dir, gateway) = default_gateway();
    let started = std::time::Instant::now();
    let result = gateway
        .execute(&ExecutionRequest::new("py", "while True:\n    pass\n"))
        .await;
    assert_eq!(result.outcome, Outcome::Timeout);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn test_java_hello() {
    let (_dir, gateway) = default_gateway();
    let source = r#"
public class Greeter {
    public static void main(String[] args) {
        System.out.println("hello");
    }
}
"#;
    let result = gateway
        .execute(&ExecutionRequest::new("java", source))
        .await;
    assert_eq!(result.outcome, Outcome::Success, "{}", result.text);
    assert_eq!(result.text, "hello\n");
    assert_eq!(scratch_entries(gateway.scratch_root().path()), 0);
}

#[tokio::test]
async fn test_java_compile_error() {
    let (_dir, gateway) = default_gateway();
    let source = "public class Main { public static void main(String[] a) { int x = } }";
    let result = gateway
        .execute(&ExecutionRequest::new("java", source))
        .await;
    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(!result.text.is_empty());
}

#[tokio::test]
async fn test_java_runtime_exception() {
    let (_dir, gateway) = default_gateway();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        int zero = 0;
        System.out.println(1 / zero);
    }
}
"#;
    let result = gateway
        .execute(&ExecutionRequest::new("java", source))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert!(result.text.contains("ArithmeticException"));
}

#[tokio::test]
async fn test_java_deprecation_note_is_not_an_error() {
    let (_dir, gateway) = default_gateway();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        java.util.Date date = new java.util.Date(120, 0, 1);
        System.out.println(date.getYear());
    }
}
"#;
    let result = gateway
        .execute(&ExecutionRequest::new("java", source))
        .await;
    assert_eq!(result.outcome, Outcome::Success, "{}", result.text);
    assert_eq!(result.text, "120\n");
}

#[tokio::test]
async fn test_java_allowlisted_line_with_exception_is_kept() {
    let (_dir, gateway) = default_gateway();
    let source = r#"
public class Main {
    public static void main(String[] args) {
        System.err.println("Using cache: java.io.IOException: disk full");
    }
}
"#;
    let result = gateway
        .execute(&ExecutionRequest::new("java", source))
        .await;
    assert_eq!(result.outcome, Outcome::RuntimeError);
    assert!(result.text.contains("IOException"));
}

#[tokio::test]
async fn test_node_deprecation_notice_is_not_an_error() {
    let (_dir, gateway) = default_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new(
            "javascript",
            "new Buffer(1); console.log('ok');",
        ))
        .await;
    assert_eq!(result.outcome, Outcome::Success, "{}", result.text);
    assert_eq!(result.text, "ok\n");
}

#[tokio::test]
async fn test_c_warning_does_not_block_run() {
    let (_dir, gateway) = default_gateway();
    let source = "#warning \"just a warning\"\n#include <stdio.h>\nint main(void){puts(\"ran\");}\n";
    let result = gateway
        .execute(&ExecutionRequest::new("c", source))
        .await;
    assert_eq!(result.outcome, Outcome::Success, "{}", result.text);
    assert_eq!(result.text, "ran\n");
}

#[tokio::test]
async fn test_c_compile_error() {
    let (_dir, gateway) = default_gateway();
    let result = gateway
        .execute(&ExecutionRequest::new("c", "int main(void) { return x; }"))
        .await;
    assert_eq!(result.outcome, Outcome::CompileError);
    assert!(result.text.contains("error"));
}
