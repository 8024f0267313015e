use bindiv_core::errors::{BindivError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("pair", "gcc-7_ls_vs_gcc-9_ls")
        .with_context("reason", "example")
}

#[test]
fn discovery_error_surface() {
    let err = BindivError::Discovery(sample_info("D001", "root missing"));
    assert_eq!(err.info().code, "D001");
    assert!(err.info().context.contains_key("pair"));
}

#[test]
fn tool_error_surface() {
    let err = BindivError::ToolInvocation(sample_info("T001", "exit status 2"));
    assert_eq!(err.info().code, "T001");
    assert!(err.to_string().starts_with("tool invocation error"));
}

#[test]
fn parse_error_surface() {
    let err = BindivError::ResultParse(sample_info("P001", "no function table"));
    assert_eq!(err.info().code, "P001");
}

#[test]
fn display_includes_context_and_hint() {
    let err = BindivError::Config(
        ErrorInfo::new("C001", "duplicate label")
            .with_context("label", "gcc-9")
            .with_hint("labels must be unique"),
    );
    let text = err.to_string();
    assert!(text.contains("label=gcc-9"));
    assert!(text.contains("hint: labels must be unique"));
}

#[test]
fn errors_roundtrip_through_json() {
    let err = BindivError::Embedding(sample_info("E001", "degenerate matrix"));
    let json = serde_json::to_string(&err).expect("serialize");
    let parsed: BindivError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, err);
}
