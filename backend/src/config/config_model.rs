use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub supabase: Supabase,
    pub mollie: Mollie,
    pub resend: Resend,
    pub vertex: Vertex,
    pub app: App,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub project_url: String,
    pub anon_key: String,
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct Mollie {
    pub api_key: String,
    /// Public base URL Mollie can reach; the webhook path is appended.
    pub webhook_base_url: String,
}

#[derive(Debug, Clone)]
pub struct Resend {
    pub api_key: String,
    pub from_address: String,
    pub support_address: String,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub context_token_budget: usize,
}

#[derive(Debug, Clone)]
pub struct App {
    pub public_url: String,
    pub allowed_origin: String,
}

impl Mollie {
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/api/webhooks/mollie",
            self.webhook_base_url.trim_end_matches('/')
        )
    }
}
