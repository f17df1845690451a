mod config;
mod discord;
mod layer;
mod notifier;

use std::sync::Arc;

use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordWebhookProvider;
use layer::ErrorNotifyLayer;
use notifier::{NotificationProvider, Notifier};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber: env-filtered stdout logs with local timestamps, plus
/// Discord notifications for errors when `DISCORD_WEBHOOK_URL` is set. Must run inside
/// a tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let mut config = ObservabilityConfig::from_env(component);

    let notify_layer = match config.discord.as_ref() {
        Some(discord) => match DiscordWebhookProvider::new(discord.webhook_url.clone()) {
            Ok(provider) => {
                let provider: Arc<dyn NotificationProvider> = Arc::new(provider);
                let notifier = Notifier::new(vec![provider]);
                Some(
                    ErrorNotifyLayer::new(notifier, config.service_context.clone(), discord.min_level)
                        .with_filter(LevelFilter::from_level(discord.min_level)),
                )
            }
            Err(err) => {
                config
                    .warnings
                    .push(format!("failed to build Discord client; notifications disabled: {err}"));
                None
            }
        },
        None => None,
    };
    let notifications_enabled = notify_layer.is_some();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(notify_layer)
        .with(env_filter)
        .try_init()?;

    let context = &config.service_context;
    for warning in &config.warnings {
        warn!(
            service = %context.service_name,
            stage = %context.stage,
            component = %context.component,
            %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %context.service_name,
        stage = %context.stage,
        component = %context.component,
        notifications_enabled,
        "observability: initialized"
    );

    Ok(())
}
