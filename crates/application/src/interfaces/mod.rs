pub mod auth_provider;
pub mod chat_model;
pub mod mailer;
pub mod payment_gateway;
