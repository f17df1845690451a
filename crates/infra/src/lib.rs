pub mod mollie;
pub mod postgres;
pub mod resend;
pub mod supabase;
pub mod vertex;
