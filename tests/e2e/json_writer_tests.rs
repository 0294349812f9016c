//! E2E tests for JSON and JSONC mutations.

use crate::common::{assert_binding_once, binding_triples, ConfigFixture, COMMENTED_JSONC};
use pretty_assertions::assert_eq;
use workercfg::{
    add_binding, add_cron, add_environment, delete_environment, delete_var, set_var, BindingDef,
    BindingType, ConfigError, VarValue,
};

#[test]
fn test_add_binding_drops_comments_keeps_data() {
    // Arrange
    let fixture = ConfigFixture::jsonc(COMMENTED_JSONC);
    let before = fixture.parse();
    let def = BindingDef::new(BindingType::D1, "DB", "uuid-1").with_resource_name("mydb");

    // Act
    add_binding(&fixture.path, "default", &def).unwrap();

    // Assert
    let written = fixture.read();
    assert!(!written.contains("//"));
    assert!(!written.contains("/*"));
    assert!(written.ends_with("}\n"));
    assert!(written.contains("\n\t\"name\": \"api\""));

    let after = fixture.parse();
    assert_eq!(after.name, before.name);
    assert_eq!(after.vars, before.vars);
    assert_eq!(after.environments, before.environments);
    assert_eq!(after.bindings.len(), 2);
    assert_eq!(after.bindings[0], before.bindings[0]);
    assert_binding_once(&after, "default", &def, "uuid-1");
}

#[test]
fn test_key_order_is_preserved() {
    let fixture = ConfigFixture::json(
        "{\n  \"name\": \"api\",\n  \"main\": \"src/index.ts\",\n  \"compatibility_date\": \"2024-01-01\"\n}\n",
    );

    set_var(&fixture.path, "", "MODE", "live").unwrap();

    assert_eq!(
        fixture.read(),
        "{\n  \"name\": \"api\",\n  \"main\": \"src/index.ts\",\n  \"compatibility_date\": \"2024-01-01\",\n  \"vars\": {\n    \"MODE\": \"live\"\n  }\n}\n"
    );
}

#[test]
fn test_env_binding_and_vars() {
    let fixture = ConfigFixture::jsonc(COMMENTED_JSONC);
    let def = BindingDef::new(BindingType::Service, "AUTH", "auth-worker");

    add_binding(&fixture.path, "staging", &def).unwrap();
    set_var(&fixture.path, "staging", "RETRIES", 7i64).unwrap();

    let config = fixture.parse();
    assert_eq!(
        binding_triples(&config, "staging"),
        vec![(
            "AUTH".to_string(),
            "service".to_string(),
            "auth-worker".to_string()
        )]
    );
    assert_eq!(config.env_vars("staging")["RETRIES"], VarValue::Integer(7));
    assert_eq!(config.env_vars("staging")["LOG_LEVEL"], VarValue::from("debug"));
    assert_eq!(config.env_bindings("default").len(), 1);
}

#[test]
fn test_delete_var_and_missing_var() {
    let fixture = ConfigFixture::jsonc(COMMENTED_JSONC);

    delete_var(&fixture.path, "default", "RETRIES").unwrap();
    assert!(!fixture.parse().vars.contains_key("RETRIES"));

    let err = delete_var(&fixture.path, "default", "RETRIES").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn test_crons_and_environments() {
    let fixture = ConfigFixture::jsonc(COMMENTED_JSONC);

    add_cron(&fixture.path, "0 0 * * *").unwrap();
    add_environment(&fixture.path, "production").unwrap();
    delete_environment(&fixture.path, "staging").unwrap();

    let config = fixture.parse();
    assert_eq!(config.crons, vec!["0 0 * * *"]);
    assert_eq!(config.env_names(), vec!["default", "production"]);
    assert!(config.env_vars("staging").is_empty());
}

#[test]
fn test_mistyped_category_leaves_file_untouched() {
    let src = "{\n  \"kv_namespaces\": \"oops\"\n}\n";
    let fixture = ConfigFixture::json(src);
    let def = BindingDef::new(BindingType::Kv, "KV", "abc");

    let err = add_binding(&fixture.path, "default", &def).unwrap_err();

    assert!(matches!(err, ConfigError::Json { .. }));
    assert_eq!(fixture.read(), src);
}
