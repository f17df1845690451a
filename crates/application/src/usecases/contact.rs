use std::sync::Arc;

use domain::value_objects::{
    auth::normalize_email,
    contact::{ContactRequest, ContactValidationError},
};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    interfaces::mailer::{Mailer, OutgoingEmail},
    templates::{ContactDetails, contact_confirmation_email, contact_notification_email},
};

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Validation(#[from] ContactValidationError),
    #[error("email provider request failed")]
    Delivery(#[source] anyhow::Error),
}

pub struct ContactUseCase {
    mailer: Arc<dyn Mailer>,
    support_address: String,
}

impl ContactUseCase {
    pub fn new(mailer: Arc<dyn Mailer>, support_address: String) -> Self {
        Self {
            mailer,
            support_address,
        }
    }

    pub async fn submit(&self, request: ContactRequest) -> Result<(), ContactError> {
        request.validate()?;

        let details = ContactDetails {
            name: request.name.trim().to_string(),
            email: normalize_email(&request.email),
            message: request.message.trim().to_string(),
        };

        let notification = contact_notification_email(&details);
        let message_id = self
            .mailer
            .send(
                OutgoingEmail::new(&self.support_address, notification.subject, notification.html)
                    .text(notification.text)
                    .reply_to(&details.email),
            )
            .await
            .map_err(|err| {
                error!(error = ?err, "contact: failed to deliver message to support");
                ContactError::Delivery(err)
            })?;
        info!(%message_id, "contact: message delivered to support");

        let confirmation = contact_confirmation_email(&details);
        if let Err(err) = self
            .mailer
            .send(
                OutgoingEmail::new(&details.email, confirmation.subject, confirmation.html)
                    .text(confirmation.text),
            )
            .await
        {
            warn!(error = ?err, "contact: failed to send confirmation");
        }

        Ok(())
    }
}
