use std::env;
use surgical_scout::Config;

/// Environment overrides are applied on top of defaults.
///
/// Kept as a single test because env vars are process-global.
#[test]
fn test_environment_variable_overrides() {
    let saved: Vec<(&str, Option<String>)> = [
        "PUBMED_EMAIL",
        "BROWSER_COOKIES",
        "PORT",
        "SHEET_ID",
    ]
    .iter()
    .map(|&k| (k, env::var(k).ok()))
    .collect();

    env::set_var("PUBMED_EMAIL", "resident@example.com");
    env::set_var("BROWSER_COOKIES", "session=abc123");
    env::set_var("PORT", "9100");
    env::set_var("SHEET_ID", "sheet-42");

    let config = Config::from_env();
    assert_eq!(config.pubmed.email, "resident@example.com");
    assert!(config.fulltext.use_browser);
    assert_eq!(config.fulltext.browser_cookies.as_deref(), Some("session=abc123"));
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.sheets.spreadsheet_id, "sheet-42");
    assert!(config.validate().is_ok());

    // Unparseable port falls back to the default
    env::set_var("PORT", "not-a-port");
    let config = Config::from_env();
    assert_eq!(config.server.port, 8000);

    for (key, value) in saved {
        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }
}

#[test]
fn test_default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}
