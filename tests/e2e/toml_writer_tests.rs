//! E2E tests for TOML mutations.
//!
//! These tests check that edits land at the expected offsets and that text
//! outside the touched region is preserved byte for byte.

use crate::common::{assert_binding_once, binding_triples, ConfigFixture, BASIC_TOML, ENV_TOML};
use pretty_assertions::assert_eq;
use workercfg::{
    add_binding, add_cron, add_environment, delete_cron, delete_environment, delete_var, set_var,
    BindingDef, BindingType, ConfigError, VarValue,
};

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_add_d1_binding_scenario() {
    // Arrange
    let fixture = ConfigFixture::toml(BASIC_TOML);
    let def = BindingDef::new(BindingType::D1, "DB", "uuid-1").with_resource_name("mydb");

    // Act
    add_binding(&fixture.path, "default", &def).unwrap();

    // Assert: appended after the kv table, original text untouched
    let expected = format!(
        "{BASIC_TOML}\n[[d1_databases]]\nbinding = \"DB\"\ndatabase_name = \"mydb\"\ndatabase_id = \"uuid-1\"\n"
    );
    assert_eq!(fixture.read(), expected);

    let config = fixture.parse();
    assert_eq!(config.bindings.len(), 2);
    assert_binding_once(&config, "default", &def, "uuid-1");
}

#[test]
fn test_top_level_binding_goes_before_env_sections() {
    let fixture = ConfigFixture::toml(ENV_TOML);
    let env_start = ENV_TOML.find("[env.staging]").unwrap();
    let def = BindingDef::new(BindingType::R2, "ASSETS", "assets");

    add_binding(&fixture.path, "", &def).unwrap();

    let written = fixture.read();
    let new_table = written.find("[[r2_buckets]]").unwrap();
    let env_header = written.find("[env.staging]").unwrap();
    assert!(new_table < env_header);
    // everything from the first env header on is unchanged
    assert_eq!(&written[env_header..], &ENV_TOML[env_start..]);
    // and so is everything before the insertion point
    assert_eq!(&written[..env_start], &ENV_TOML[..env_start]);
}

#[test]
fn test_env_binding_lands_inside_env_block() {
    let fixture = ConfigFixture::toml(ENV_TOML);
    let def = BindingDef::new(BindingType::Kv, "CACHE", "stg-cache");

    add_binding(&fixture.path, "staging", &def).unwrap();

    let written = fixture.read();
    let new_table = written.find("[[env.staging.kv_namespaces]]").unwrap();
    let vars_table = written.find("[env.staging.vars]").unwrap();
    let production = written.find("[env.production]").unwrap();
    assert!(vars_table < new_table && new_table < production);

    let config = fixture.parse();
    assert_binding_once(&config, "staging", &def, "stg-cache");
    assert_eq!(config.env_bindings("default").len(), 1);
    assert!(config.env_bindings("production").is_empty());
}

#[test]
fn test_binding_for_new_env_creates_header() {
    let fixture = ConfigFixture::toml(BASIC_TOML);
    let def = BindingDef::new(BindingType::Hyperdrive, "PG", "hd-1");

    add_binding(&fixture.path, "preview", &def).unwrap();

    let written = fixture.read();
    assert!(written.starts_with(BASIC_TOML));
    assert!(written.contains("[env.preview]\n"));

    let config = fixture.parse();
    assert_eq!(config.env_names(), vec!["default", "preview"]);
    assert_binding_once(&config, "preview", &def, "hd-1");
}

#[test]
fn test_repeated_category_appends_new_table() {
    let fixture = ConfigFixture::toml(BASIC_TOML);
    let def = BindingDef::new(BindingType::Kv, "SESSIONS", "def456");

    add_binding(&fixture.path, "default", &def).unwrap();

    assert_eq!(fixture.read().matches("[[kv_namespaces]]").count(), 2);
    assert_eq!(
        binding_triples(&fixture.parse(), "default"),
        vec![
            ("KV".to_string(), "kv".to_string(), "abc123".to_string()),
            ("SESSIONS".to_string(), "kv".to_string(), "def456".to_string()),
        ]
    );
}

#[test]
fn test_nested_categories() {
    let fixture = ConfigFixture::toml(BASIC_TOML);

    add_binding(
        &fixture.path,
        "default",
        &BindingDef::new(BindingType::DurableObject, "ROOMS", "ChatRoom"),
    )
    .unwrap();
    add_binding(
        &fixture.path,
        "default",
        &BindingDef::new(BindingType::QueueProducer, "JOBS", "jobs"),
    )
    .unwrap();

    let written = fixture.read();
    assert!(written.contains("[[durable_objects.bindings]]\nname = \"ROOMS\"\nclass_name = \"ChatRoom\"\n"));
    assert!(written.contains("[[queues.producers]]\nbinding = \"JOBS\"\nqueue = \"jobs\"\n"));
    assert_eq!(fixture.parse().bindings.len(), 3);
}

#[test]
fn test_duplicate_binding_name_rejected_without_write() {
    let fixture = ConfigFixture::toml(BASIC_TOML);
    let def = BindingDef::new(BindingType::R2, "KV", "bucket");

    let err = add_binding(&fixture.path, "default", &def).unwrap_err();

    assert!(matches!(err, ConfigError::AlreadyExists { .. }));
    assert_eq!(fixture.read(), BASIC_TOML);
}

#[test]
fn test_second_ai_binding_rejected() {
    let fixture = ConfigFixture::toml("[ai]\nbinding = \"AI\"\n");
    let def = BindingDef::new(BindingType::Ai, "BRAIN", "");

    let err = add_binding(&fixture.path, "default", &def).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }));
}

#[test]
fn test_malformed_file_is_left_untouched() {
    let broken = "name = \"api\"\n[[kv_namespaces]\n";
    let fixture = ConfigFixture::toml(broken);
    let def = BindingDef::new(BindingType::Kv, "KV2", "x");

    let err = add_binding(&fixture.path, "default", &def).unwrap_err();

    assert!(err.is_parse_error());
    assert_eq!(fixture.read(), broken);
}

#[test]
fn test_brackets_in_strings_do_not_move_insertion_point() {
    let src = "name = \"api\"\nnote = \"\"\"\n[env.fake]\n\"\"\"\n";
    let fixture = ConfigFixture::toml(src);
    let def = BindingDef::new(BindingType::Kv, "KV", "abc");

    add_binding(&fixture.path, "default", &def).unwrap();

    let written = fixture.read();
    assert!(written.starts_with(src));
    assert!(fixture.parse().environments.is_empty());
}

#[test]
fn test_comment_above_env_header_stays_with_it() {
    let src = "name = \"api\"\n\n# staging overrides\n[env.staging]\nname = \"stg\"\n";
    let fixture = ConfigFixture::toml(src);
    let def = BindingDef::new(BindingType::Kv, "KV", "abc");

    add_binding(&fixture.path, "default", &def).unwrap();

    assert!(fixture
        .read()
        .ends_with("\n\n# staging overrides\n[env.staging]\nname = \"stg\"\n"));
}

#[test]
fn test_add_binding_to_root_inline_array() {
    // Arrange
    let src = "name = \"api\"\nkv_namespaces = [ { binding = \"KV\", id = \"abc\" } ]\n";
    let fixture = ConfigFixture::toml(src);
    let def = BindingDef::new(BindingType::Kv, "SESSIONS", "def");

    // Act
    add_binding(&fixture.path, "default", &def).unwrap();

    // Assert: spliced into the array, no [[kv_namespaces]] table
    assert_eq!(
        fixture.read(),
        "name = \"api\"\nkv_namespaces = [ { binding = \"KV\", id = \"abc\" }, { binding = \"SESSIONS\", id = \"def\" } ]\n"
    );
    let config = fixture.parse();
    assert_eq!(config.bindings.len(), 2);
    assert_binding_once(&config, "default", &def, "def");
}

#[test]
fn test_add_binding_to_inline_array_under_parent_table() {
    let src = r#"name = "api"

[durable_objects]
bindings = [
  { name = "ROOMS", class_name = "ChatRoom" },
]

[env.staging]
name = "api-stg"
"#;
    let fixture = ConfigFixture::toml(src);
    let def = BindingDef::new(BindingType::DurableObject, "LOBBY", "Lobby");

    add_binding(&fixture.path, "default", &def).unwrap();

    let written = fixture.read();
    assert!(written.contains(
        "bindings = [\n  { name = \"ROOMS\", class_name = \"ChatRoom\" },\n  { name = \"LOBBY\", class_name = \"Lobby\" },\n]\n"
    ));
    assert!(!written.contains("[[durable_objects.bindings]]"));
    assert!(written.ends_with("[env.staging]\nname = \"api-stg\"\n"));

    let config = fixture.parse();
    assert_binding_once(&config, "default", &def, "Lobby");
    assert_eq!(config.bindings.len(), 2);
}

#[test]
fn test_crlf_line_endings_are_kept() {
    let src = "name = \"api\"\r\n\r\n[vars]\r\nA = \"1\"\r\n\r\n[env.staging]\r\nname = \"s\"\r\n";
    let fixture = ConfigFixture::toml(src);

    set_var(&fixture.path, "default", "A", "2").unwrap();
    add_binding(
        &fixture.path,
        "staging",
        &BindingDef::new(BindingType::Kv, "KV", "abc"),
    )
    .unwrap();
    add_cron(&fixture.path, "0 * * * *").unwrap();

    let written = fixture.read();
    assert!(!written.replace("\r\n", "").contains('\n'));
    assert!(written.starts_with("name = \"api\"\r\n\r\n[vars]\r\nA = \"2\"\r\n"));
    let config = fixture.parse();
    assert_eq!(config.crons, vec!["0 * * * *"]);
    assert_eq!(config.env_bindings("staging").len(), 1);
}

#[test]
fn test_edit_leaves_no_temp_files_behind() {
    let fixture = ConfigFixture::toml(BASIC_TOML);

    add_environment(&fixture.path, "staging").unwrap();
    set_var(&fixture.path, "staging", "MODE", "test").unwrap();

    let names: Vec<_> = std::fs::read_dir(fixture.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("wrangler.toml")]);
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_set_var_updates_and_adds() {
    let fixture = ConfigFixture::toml(ENV_TOML);

    set_var(&fixture.path, "default", "LOG_LEVEL", "warn").unwrap();
    set_var(&fixture.path, "staging", "RETRIES", 5i64).unwrap();
    set_var(&fixture.path, "production", "FEATURE", true).unwrap();

    let config = fixture.parse();
    assert_eq!(config.vars["LOG_LEVEL"], VarValue::Text("warn".to_string()));
    assert_eq!(config.env_vars("staging")["RETRIES"], VarValue::Integer(5));
    assert_eq!(config.env_vars("staging")["LOG_LEVEL"], VarValue::Text("debug".to_string()));
    assert_eq!(config.env_vars("production")["FEATURE"], VarValue::Bool(true));
    assert_eq!(config.vars.len(), 1);

    let written = fixture.read();
    assert!(written.contains("[env.production.vars]\nFEATURE = true\n"));
    assert!(written.starts_with("# Worker config\n"));
}

#[test]
fn test_set_var_creates_vars_table() {
    let fixture = ConfigFixture::toml(BASIC_TOML);

    set_var(&fixture.path, "", "API_URL", "https://example.com").unwrap();

    assert!(fixture
        .read()
        .ends_with("\n[vars]\nAPI_URL = \"https://example.com\"\n"));
}

#[test]
fn test_delete_var() {
    let fixture = ConfigFixture::toml(ENV_TOML);

    delete_var(&fixture.path, "staging", "LOG_LEVEL").unwrap();

    let config = fixture.parse();
    assert!(config.env_vars("staging").is_empty());
    assert_eq!(config.vars.len(), 1);

    let err = delete_var(&fixture.path, "staging", "LOG_LEVEL").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

// ============================================================================
// Cron triggers
// ============================================================================

#[test]
fn test_add_and_delete_crons() {
    let fixture = ConfigFixture::toml(ENV_TOML);

    add_cron(&fixture.path, "0 * * * *").unwrap();
    add_cron(&fixture.path, "*/15 * * * *").unwrap();
    assert_eq!(fixture.parse().crons, vec!["0 * * * *", "*/15 * * * *"]);

    // triggers is top-level, so it must sit above the env sections
    let written = fixture.read();
    assert!(written.find("[triggers]").unwrap() < written.find("[env.staging]").unwrap());

    let err = add_cron(&fixture.path, "0 * * * *").unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }));

    delete_cron(&fixture.path, "0 * * * *").unwrap();
    assert_eq!(fixture.parse().crons, vec!["*/15 * * * *"]);

    let err = delete_cron(&fixture.path, "0 * * * *").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

// ============================================================================
// Environments
// ============================================================================

#[test]
fn test_add_environment() {
    let fixture = ConfigFixture::toml(BASIC_TOML);

    add_environment(&fixture.path, "staging").unwrap();

    assert_eq!(fixture.read(), format!("{BASIC_TOML}\n[env.staging]\n"));
    let config = fixture.parse();
    assert_eq!(config.env_names(), vec!["default", "staging"]);
    assert_eq!(config.resolved_env_name("staging"), "api-staging");

    let err = add_environment(&fixture.path, "staging").unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }));
}

#[test]
fn test_add_environment_rejects_bad_names() {
    let fixture = ConfigFixture::toml(BASIC_TOML);

    assert!(matches!(
        add_environment(&fixture.path, "default"),
        Err(ConfigError::InvalidDefinition(_))
    ));
    assert!(matches!(
        add_environment(&fixture.path, "has space"),
        Err(ConfigError::InvalidDefinition(_))
    ));
    assert_eq!(fixture.read(), BASIC_TOML);
}

#[test]
fn test_delete_environment_removes_subtables() {
    let fixture = ConfigFixture::toml(ENV_TOML);

    delete_environment(&fixture.path, "staging").unwrap();

    let written = fixture.read();
    assert!(!written.contains("env.staging"));
    assert!(written.contains("[env.production]\nname = \"api-prod\"\n"));

    let config = fixture.parse();
    assert_eq!(config.env_names(), vec!["default", "production"]);
    assert_eq!(config.bindings.len(), 1);

    let err = delete_environment(&fixture.path, "staging").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}
