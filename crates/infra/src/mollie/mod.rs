pub mod mollie_client;
