use tracing::Level;
use url::Url;

const DEFAULT_STAGE: &str = "local";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DiscordConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) discord: Option<DiscordConfig>,
    /// Problems found while parsing, logged once the subscriber is installed.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let component = component.trim().to_string();

        let service_context = ServiceContext {
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: non_empty("STAGE")
                .map(|stage| stage.to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_STAGE.to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let discord = discord_config(&non_empty, &mut warnings);

        Self {
            service_context,
            discord,
            warnings,
        }
    }
}

fn discord_config<F>(non_empty: &F, warnings: &mut Vec<String>) -> Option<DiscordConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match non_empty("DISCORD_NOTIFY_ENABLED") {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_ENABLED is not a boolean (value: {raw}); treating as enabled"
            ));
            true
        }),
        None => true,
    };
    if !enabled {
        return None;
    }

    let raw_url = non_empty("DISCORD_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(err) => {
            // The URL embeds the webhook token, so only the parse error is reported.
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL is invalid; error notifications disabled (parse error: {err})"
            ));
            return None;
        }
    };

    let min_level = match non_empty("DISCORD_NOTIFY_LEVEL") {
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
            ));
            Level::ERROR
        }),
        None => Level::ERROR,
    };

    Some(DiscordConfig {
        webhook_url,
        min_level,
    })
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        _ => None,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ObservabilityConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ObservabilityConfig::from_lookup("backend", move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_component_name_and_local_stage() {
        let config = config(&[]);
        assert_eq!(config.service_context.service_name, "backend");
        assert_eq!(config.service_context.stage, "local");
        assert!(config.discord.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn discord_is_enabled_by_a_valid_webhook_url() {
        let config = config(&[
            ("STAGE", "Production"),
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
            ("DISCORD_NOTIFY_LEVEL", "warn"),
        ]);
        let discord = config.discord.unwrap();
        assert_eq!(discord.min_level, Level::WARN);
        assert_eq!(config.service_context.stage, "production");
    }

    #[test]
    fn disabled_flag_wins_over_url() {
        let config = config(&[
            ("DISCORD_NOTIFY_ENABLED", "false"),
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
        ]);
        assert!(config.discord.is_none());
    }

    #[test]
    fn invalid_values_produce_warnings_without_leaking_the_url() {
        let config = config(&[("DISCORD_WEBHOOK_URL", "not a url/secret-token")]);
        assert!(config.discord.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(!config.warnings[0].contains("secret-token"));

        let config = config_with_level("loud");
        assert_eq!(config.discord.unwrap().min_level, Level::ERROR);
        assert!(config.warnings[0].contains("DISCORD_NOTIFY_LEVEL"));
    }

    fn config_with_level(level: &str) -> ObservabilityConfig {
        config(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
            ("DISCORD_NOTIFY_LEVEL", level),
        ])
    }
}
