//! Provider construction from config.

use std::collections::BTreeMap;

use fasilbot::config::ModelsConfig;
use fasilbot::credentials::Credentials;
use fasilbot::providers::{from_config, parse_provider_string};

fn credentials_with(key: &str, value: &str) -> Credentials {
    let mut vars = BTreeMap::new();
    vars.insert(key.to_owned(), value.to_owned());
    Credentials::from_map(vars)
}

#[test]
fn parse_provider_string_splits_on_first_slash() {
    let parsed = parse_provider_string("openai/gpt-3.5-turbo");
    assert!(matches!(parsed, Ok(("openai", "gpt-3.5-turbo"))));

    let nested = parse_provider_string("openai/org/model");
    assert!(matches!(nested, Ok(("openai", "org/model"))));
}

#[test]
fn parse_provider_string_rejects_malformed_specs() {
    for spec in ["gpt-3.5-turbo", "/gpt", "openai/", ""] {
        assert!(parse_provider_string(spec).is_err(), "{spec:?} should fail");
    }
}

#[test]
fn from_config_builds_openai_provider() {
    let models = ModelsConfig::default();
    let provider = from_config(&models, &credentials_with("OPENAI_API_KEY", "sk-test"));
    assert!(matches!(provider, Ok(ref p) if p.model_id() == "openai/gpt-3.5-turbo"));
}

#[test]
fn from_config_requires_api_key() {
    let models = ModelsConfig::default();
    let provider = from_config(&models, &Credentials::default());
    let err = match provider {
        Ok(_) => panic!("missing key should fail"),
        Err(err) => err.to_string(),
    };
    assert!(err.contains("OPENAI_API_KEY"));
}

#[test]
fn from_config_rejects_unknown_provider() {
    let models = ModelsConfig {
        default: "anthropic/claude".to_owned(),
        ..ModelsConfig::default()
    };
    let provider = from_config(&models, &credentials_with("OPENAI_API_KEY", "sk-test"));
    let err = match provider {
        Ok(_) => panic!("unknown provider should fail"),
        Err(err) => err.to_string(),
    };
    assert!(err.contains("anthropic"));
}
