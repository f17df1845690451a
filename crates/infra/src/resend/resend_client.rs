use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::error;

use application::interfaces::mailer::{Mailer, OutgoingEmail};

pub const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    name: Option<String>,
    message: Option<String>,
}

pub struct ResendClient {
    http: reqwest::Client,
    api_key: String,
    from_address: String,
    base_url: String,
}

impl ResendClient {
    pub fn new(api_key: String, from_address: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from_address,
            base_url: RESEND_API_BASE.to_string(),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };
        let (name, message) = match serde_json::from_str::<ResendErrorBody>(&body) {
            Ok(parsed) => (parsed.name, parsed.message),
            Err(_) => (None, None),
        };

        error!(
            %status,
            resend_error_name = ?name,
            resend_error_message = ?message,
            %context,
            "resend api request failed"
        );

        anyhow::bail!("Resend API request failed: {} (status {})", context, status);
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, email: OutgoingEmail) -> Result<String> {
        // https://resend.com/docs/api-reference/emails/send-email
        let body = SendEmailBody {
            from: &self.from_address,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: email.text.as_deref(),
            reply_to: email.reply_to.as_deref(),
        };

        let resp = self
            .http
            .post(format!("{}/emails", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "send email").await?;

        let parsed: SendEmailResponse = resp.json().await?;
        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted() {
        let to = vec!["jan@voorbeeld.nl".to_string()];
        let body = SendEmailBody {
            from: "Adviseur AI <noreply@example.nl>",
            to: &to,
            subject: "Welkom",
            html: "<p>Hallo</p>",
            text: None,
            reply_to: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"], serde_json::json!(["jan@voorbeeld.nl"]));
        assert!(json.get("text").is_none());
        assert!(json.get("reply_to").is_none());
    }

    #[test]
    fn reply_to_uses_the_snake_case_field() {
        let to = vec!["support@example.nl".to_string()];
        let body = SendEmailBody {
            from: "noreply@example.nl",
            to: &to,
            subject: "Contact",
            html: "<p>Vraag</p>",
            text: Some("Vraag"),
            reply_to: Some("jan@voorbeeld.nl"),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["reply_to"], "jan@voorbeeld.nl");
        assert_eq!(json["text"], "Vraag");
    }
}
