pub mod resend_client;
