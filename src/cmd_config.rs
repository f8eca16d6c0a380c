//! `config` subcommand.

use autoflow_config::{Config, ConfigValidator};

use crate::cli::ConfigAction;

pub(crate) fn handle_config_command(config: &Config, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate => validate(config),
        ConfigAction::Show => {
            println!("{}", render(config)?);
            Ok(())
        }
    }
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    if !result.is_valid() {
        anyhow::bail!("configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration is valid.");
    Ok(())
}

/// Effective configuration as TOML, with the API key masked.
fn render(config: &Config) -> anyhow::Result<String> {
    let mut shown = config.clone();
    if shown.reasoning.api_key.is_some() {
        shown.reasoning.api_key = Some("***".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_masks_api_key() {
        let mut config = Config::default();
        config.reasoning.api_key = Some("sk-secret".to_string());

        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("***"));
        assert!(rendered.contains("[engine]"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.monitor.sample_interval_ms = 0;
        assert!(validate(&config).is_err());
        assert!(validate(&Config::default()).is_ok());
    }
}
