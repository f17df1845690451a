mod contact;
mod layout;
mod welcome;

pub use contact::{ContactDetails, contact_confirmation_email, contact_notification_email};
pub use layout::escape_html;
pub use welcome::{WelcomeDetails, welcome_email};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}
