use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use crate::{
    auth::JwtVerifier,
    axum_http::{default_routers, error_responses, routers},
    config::config_model::DotEnvyConfig,
};
use application::{
    interfaces::{chat_model::ChatModel, mailer::Mailer, payment_gateway::PaymentGateway},
    usecases::{
        auth::{AuthConfig, AuthUseCase},
        checkout::CheckoutConfig,
        mollie_webhook::{MollieWebhookConfig, MollieWebhookUseCase},
    },
};
use infra::{
    mollie::mollie_client::MollieClient,
    postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{
            discount_codes::DiscountCodePostgres, payments::PaymentPostgres,
            profiles::ProfilePostgres, subscriptions::SubscriptionPostgres,
        },
    },
    resend::resend_client::ResendClient,
    supabase::supabase_auth::SupabaseAuthClient,
    vertex::vertex_client::{VertexClient, VertexSettings},
};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    error_responses::expose_internal_details(config.stage.is_local());

    let payment_gateway: Arc<dyn PaymentGateway> =
        Arc::new(MollieClient::new(config.mollie.api_key.clone()));
    let mailer: Arc<dyn Mailer> = Arc::new(ResendClient::new(
        config.resend.api_key.clone(),
        config.resend.from_address.clone(),
    ));
    let chat_model: Arc<dyn ChatModel> = Arc::new(VertexClient::new(VertexSettings {
        project_id: config.vertex.project_id.clone(),
        location: config.vertex.location.clone(),
        model: config.vertex.model.clone(),
        api_key: config.vertex.api_key.clone(),
        temperature: config.vertex.temperature,
        max_output_tokens: config.vertex.max_output_tokens,
    }));
    let jwt_verifier = Arc::new(JwtVerifier::new(&config.supabase.jwt_secret));

    let auth_usecase = AuthUseCase::new(
        Arc::new(SupabaseAuthClient::new(
            &config.supabase.project_url,
            config.supabase.anon_key.clone(),
        )),
        AuthConfig {
            app_url: config.app.public_url.clone(),
        },
    );

    let mollie_webhook_usecase = Arc::new(MollieWebhookUseCase::new(
        Arc::clone(&payment_gateway),
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(ProfilePostgres::new(Arc::clone(&db_pool))),
        Arc::new(DiscountCodePostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&mailer),
        MollieWebhookConfig {
            app_url: config.app.public_url.clone(),
            webhook_url: config.mollie.webhook_url(),
        },
    ));

    let checkout_config = CheckoutConfig {
        app_url: config.app.public_url.clone(),
        webhook_url: config.mollie.webhook_url(),
    };

    let allowed_origin = HeaderValue::from_str(&config.app.allowed_origin)
        .with_context(|| format!("invalid CORS origin: {}", config.app.allowed_origin))?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/auth", routers::auth::routes(auth_usecase, config.stage))
        .nest(
            "/api/checkout",
            routers::checkout::routes(
                Arc::clone(&db_pool),
                Arc::clone(&payment_gateway),
                checkout_config,
            ),
        )
        .nest(
            "/api/discounts",
            routers::discounts::routes(Arc::clone(&db_pool)),
        )
        .nest(
            "/api/subscription",
            routers::subscriptions::routes(Arc::clone(&db_pool), Arc::clone(&payment_gateway)),
        )
        .nest(
            "/api/chat",
            routers::chat::routes(
                Arc::clone(&db_pool),
                chat_model,
                config.vertex.context_token_budget,
            ),
        )
        .nest(
            "/api/contact",
            routers::contact::routes(Arc::clone(&mailer), config.resend.support_address.clone()),
        )
        .nest(
            "/api/webhooks/mollie",
            routers::mollie_webhook::routes(mollie_webhook_usecase),
        )
        .route("/api/health-check", get(default_routers::health_check))
        .layer(Extension(jwt_verifier))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(allowed_origin)
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(stage = %config.stage, "Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
