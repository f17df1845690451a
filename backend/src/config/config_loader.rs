use std::str::FromStr;

use anyhow::{Context, Result};
use application::usecases::chat::DEFAULT_CONTEXT_TOKEN_BUDGET;

use super::{
    config_model::{App, BackendServer, Database, DotEnvyConfig, Mollie, Resend, Supabase, Vertex},
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup; `load` passes the process environment.
pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let backend_server = BackendServer {
        port: env.parsed_or("SERVER_PORT", 8080)?,
        body_limit: env.parsed_or("SERVER_BODY_LIMIT", 2)?,
        timeout: env.parsed_or("SERVER_TIMEOUT", 90)?,
    };

    let database = Database {
        url: env.required("DATABASE_URL")?,
        max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
    };

    let supabase = Supabase {
        project_url: env.required("SUPABASE_PROJECT_URL")?,
        anon_key: env.required("SUPABASE_ANON_KEY")?,
        jwt_secret: env.required("SUPABASE_JWT_SECRET")?,
    };

    let public_url = env.required("APP_URL")?;
    let app = App {
        allowed_origin: env
            .optional("CORS_ALLOWED_ORIGIN")
            .unwrap_or_else(|| public_url.trim_end_matches('/').to_string()),
        public_url,
    };

    let mollie = Mollie {
        api_key: env.required("MOLLIE_API_KEY")?,
        webhook_base_url: env
            .optional("MOLLIE_WEBHOOK_BASE_URL")
            .unwrap_or_else(|| app.public_url.clone()),
    };

    let resend = Resend {
        api_key: env.required("RESEND_API_KEY")?,
        from_address: env.required("RESEND_FROM_ADDRESS")?,
        support_address: env.required("SUPPORT_EMAIL")?,
    };

    let vertex = Vertex {
        project_id: env.required("VERTEX_PROJECT_ID")?,
        location: env
            .optional("VERTEX_LOCATION")
            .unwrap_or_else(|| "europe-west4".to_string()),
        model: env
            .optional("VERTEX_MODEL")
            .unwrap_or_else(|| "gemini-1.5-pro".to_string()),
        api_key: env.required("VERTEX_API_KEY")?,
        temperature: env.parsed_or("VERTEX_TEMPERATURE", 0.7)?,
        max_output_tokens: env.parsed_or("VERTEX_MAX_OUTPUT_TOKENS", 2048)?,
        context_token_budget: env.parsed_or("CHAT_CONTEXT_TOKEN_BUDGET", DEFAULT_CONTEXT_TOKEN_BUDGET)?,
    };

    let stage = match env.optional("STAGE") {
        Some(stage) => Stage::try_from(stage.as_str())?,
        None => Stage::default(),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        mollie,
        resend,
        vertex,
        app,
        stage,
    })
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("{} is required", key))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{} is invalid", key)),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost:5432/portal"),
            ("SUPABASE_PROJECT_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SUPABASE_JWT_SECRET", "supersecretjwtsecretforunittesting123"),
            ("APP_URL", "https://portal.example.nl/"),
            ("MOLLIE_API_KEY", "test_abc"),
            ("RESEND_API_KEY", "re_abc"),
            ("RESEND_FROM_ADDRESS", "Portal <noreply@example.nl>"),
            ("SUPPORT_EMAIL", "support@example.nl"),
            ("VERTEX_PROJECT_ID", "portal-ai"),
            ("VERTEX_API_KEY", "vertex-key"),
        ])
    }

    fn load_map(env: HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = load_map(base_env()).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.vertex.location, "europe-west4");
        assert_eq!(config.vertex.context_token_budget, DEFAULT_CONTEXT_TOKEN_BUDGET);
        assert_eq!(config.app.allowed_origin, "https://portal.example.nl");
        assert_eq!(
            config.mollie.webhook_url(),
            "https://portal.example.nl/api/webhooks/mollie"
        );
        assert_eq!(config.stage, Stage::Local);
    }

    #[test]
    fn missing_variable_is_named_in_the_error() {
        let mut env = base_env();
        env.remove("MOLLIE_API_KEY");

        let err = load_map(env).unwrap_err();
        assert!(err.to_string().contains("MOLLIE_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut env = base_env();
        env.insert("SUPABASE_JWT_SECRET", "   ");

        let err = load_map(env).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_JWT_SECRET"));
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let mut env = base_env();
        env.insert("SERVER_PORT", "eighty");

        let err = load_map(env).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT is invalid"));
    }

    #[test]
    fn overrides_are_honored() {
        let mut env = base_env();
        env.insert("STAGE", "production");
        env.insert("MOLLIE_WEBHOOK_BASE_URL", "https://hooks.example.nl");
        env.insert("CHAT_CONTEXT_TOKEN_BUDGET", "4000");

        let config = load_map(env).unwrap();
        assert_eq!(config.stage, Stage::Production);
        assert_eq!(
            config.mollie.webhook_url(),
            "https://hooks.example.nl/api/webhooks/mollie"
        );
        assert_eq!(config.vertex.context_token_budget, 4000);
    }
}
