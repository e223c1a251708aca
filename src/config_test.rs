use super::*;

fn base_config() -> Config {
    let mut config = Config::default();
    config.oauth.token_secret = Some("unit-test-secret".to_string());
    config
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.storage.driver, "memory");
    assert_eq!(config.http.port, 3000);
    assert_eq!(config.oauth.access_token_ttl_secs, 3600);
    assert_eq!(config.oauth.auth_code_ttl_secs, 300);
    assert!(!config.oauth.secured);
}

#[test]
fn test_missing_token_secret_is_fatal() {
    let config = Config::default();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Token signing secret"));
}

#[test]
fn test_secured_mode_requires_key_pair() {
    let mut config = base_config();
    config.oauth.secured = true;
    assert!(config.validate().is_err());

    config.oauth.registration_access_key = Some("AK123".to_string());
    assert!(config.validate().is_err());

    config.oauth.registration_secret_key = Some("SK456".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_open_mode_needs_no_key_pair() {
    let config = base_config();
    assert!(config.validate().is_ok());
}

#[test]
fn test_nonpositive_lifetimes_rejected() {
    let mut config = base_config();
    config.oauth.access_token_ttl_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_parse_camel_case_file_shape() {
    let raw = r#"{
        "storage": {"driver": "sqlite", "dsn": ".tickergate/auth.db"},
        "http": {"host": "0.0.0.0", "port": 8080},
        "oauth": {
            "issuer": "https://auth.example.com",
            "tokenSecret": "s3cret",
            "accessTokenTtlSecs": 900,
            "secured": true,
            "registrationAccessKey": "AK",
            "registrationSecretKey": "SK"
        }
    }"#;

    let config: Config = serde_json::from_str(raw).unwrap();
    assert_eq!(config.storage.driver, "sqlite");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.oauth.issuer, "https://auth.example.com");
    assert_eq!(config.oauth.access_token_ttl_secs, 900);
    // Unspecified fields keep their defaults
    assert_eq!(config.oauth.refresh_token_ttl_secs, 30 * 24 * 3600);
    assert!(config.validate().is_ok());
}
