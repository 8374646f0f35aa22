use std::path::Path;

use thiserror::Error;

use super::Config;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration layering, lowest precedence first: built-in
/// defaults, an optional TOML file, then `SHAREAUDIT_`-prefixed environment
/// variables (e.g. `SHAREAUDIT_SCAN__THREADS=20`). Runs `Config::validate`
/// before returning so callers never see a config that would fail
/// pre-flight validation.
pub fn load(config_path: Option<&Path>) -> Result<Config, ConfigLoadError> {
    let defaults = Config::default();
    let defaults_json = serde_json::to_string(&defaults)
        .expect("Config default serializes");

    let mut builder = config::Config::builder()
        .add_source(config::File::from_str(&defaults_json, config::FileFormat::Json));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SHAREAUDIT")
            .separator("__")
            .try_parsing(true),
    );

    let built = builder.build()?;
    let config: Config = built.try_deserialize()?;

    config
        .validate()
        .map_err(ConfigLoadError::Invalid)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_file_yields_defaults_plus_env() {
        unsafe {
            std::env::set_var("SHAREAUDIT_DIRECTORY__LDAP_SERVER", "dc01.example.com");
            std::env::set_var("SHAREAUDIT_DIRECTORY__LDAP_DOMAIN", "example.com");
        }
        let config = load(None).expect("config loads");
        assert_eq!(config.directory.ldap_server, "dc01.example.com");
        assert_eq!(config.scan.threads, 10);
        unsafe {
            std::env::remove_var("SHAREAUDIT_DIRECTORY__LDAP_SERVER");
            std::env::remove_var("SHAREAUDIT_DIRECTORY__LDAP_DOMAIN");
        }
    }
}
