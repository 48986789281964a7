use pstasks::config::{select_active_environment, ConfigDocument, ContextError};

fn document(json: &str) -> ConfigDocument {
    serde_json::from_str(json).expect("test document should parse")
}

#[test]
fn default_deploy_target_resolves_when_no_env_given() {
    let doc = document(
        r#"{"default_deploy_target":"staging","staging":{"deploy_credentials":{"host":"x"}}}"#,
    );
    let active = select_active_environment(None, &doc).unwrap();
    assert_eq!(active, "staging");
}

#[test]
fn explicit_env_overrides_default() {
    let doc = document(
        r#"{"default_deploy_target":"staging","staging":{"deploy_credentials":{"host":"x"}},"prod":{"deploy_credentials":{"host":"y"}}}"#,
    );
    let active = select_active_environment(Some("prod"), &doc).unwrap();
    assert_eq!(active, "prod");
}

/// An explicit --env naming an undeclared environment is allowed; the
/// environment-specific steps soft-skip later.
#[test]
fn explicit_env_may_name_unknown_environment() {
    let doc = document(
        r#"{"default_deploy_target":"prod","staging":{"deploy_credentials":{"host":"x"}}}"#,
    );
    let active = select_active_environment(Some("prod"), &doc).unwrap();
    assert_eq!(active, "prod");
}

#[test]
fn missing_default_and_explicit_env_is_fatal() {
    let doc = document(r#"{"staging":{"deploy_credentials":{"host":"x"}}}"#);
    let err = select_active_environment(None, &doc).unwrap_err();
    assert!(matches!(err, ContextError::DeployTargetUnresolved));
    assert!(err.to_string().contains("deploy target"), "got: {err}");
}

/// A default_deploy_target pointing at a missing environment is a
/// configuration error, unlike an explicit --env.
#[test]
fn unknown_default_target_is_fatal() {
    let doc = document(
        r#"{"default_deploy_target":"prod","staging":{"deploy_credentials":{"host":"x"}}}"#,
    );
    let err = select_active_environment(None, &doc).unwrap_err();
    match err {
        ContextError::UnknownDefaultTarget(name) => assert_eq!(name, "prod"),
        other => panic!("expected UnknownDefaultTarget, got {other:?}"),
    }
}
