use super::{
    RenderedEmail,
    layout::{BRAND_NAME, detail_table, escape_html, paragraph, render_layout},
};

#[derive(Debug, Clone)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Mail to the support inbox.
pub fn contact_notification_email(details: &ContactDetails) -> RenderedEmail {
    let subject = format!("Nieuw contactbericht van {}", details.name.trim());
    let message_html = escape_html(details.message.trim()).replace('\n', "<br>");
    let body = [
        paragraph("Er is een nieuw bericht verstuurd via het contactformulier."),
        detail_table(&[
            ("Naam", details.name.trim().to_string()),
            ("E-mail", details.email.trim().to_string()),
        ]),
        format!(
            "<div style=\"border-left:3px solid #cbd2d9;padding-left:12px;\">{}</div>",
            message_html
        ),
    ]
    .join("\n");

    let text = format!(
        "Nieuw contactbericht\n\nNaam: {}\nE-mail: {}\n\n{}\n",
        details.name.trim(),
        details.email.trim(),
        details.message.trim()
    );

    RenderedEmail {
        html: render_layout(&subject, &body),
        subject,
        text,
    }
}

/// Receipt sent back to whoever filled in the form.
pub fn contact_confirmation_email(details: &ContactDetails) -> RenderedEmail {
    let subject = format!("We hebben je bericht ontvangen - {}", BRAND_NAME);
    let body = [
        paragraph(&format!("Hallo {},", details.name.trim())),
        paragraph("Bedankt voor je bericht. We reageren zo snel mogelijk, meestal binnen één werkdag."),
        paragraph(&format!("Met vriendelijke groet,\nTeam {}", BRAND_NAME)),
    ]
    .join("\n");

    let text = format!(
        "Hallo {},\n\nBedankt voor je bericht. We reageren zo snel mogelijk, meestal binnen één werkdag.\n\nMet vriendelijke groet,\nTeam {}\n",
        details.name.trim(),
        BRAND_NAME
    );

    RenderedEmail {
        html: render_layout(&subject, &body),
        subject,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_preserves_line_breaks_and_escapes_input() {
        let email = contact_notification_email(&ContactDetails {
            name: "Piet".to_string(),
            email: "piet@voorbeeld.nl".to_string(),
            message: "Regel 1\n<b>Regel 2</b>".to_string(),
        });
        assert_eq!(email.subject, "Nieuw contactbericht van Piet");
        assert!(email.html.contains("Regel 1<br>&lt;b&gt;Regel 2&lt;/b&gt;"));
        assert!(email.text.contains("E-mail: piet@voorbeeld.nl"));
    }

    #[test]
    fn confirmation_greets_the_sender() {
        let email = contact_confirmation_email(&ContactDetails {
            name: " Piet ".to_string(),
            email: "piet@voorbeeld.nl".to_string(),
            message: "Hoi".to_string(),
        });
        assert!(email.html.contains("Hallo Piet,"));
    }
}
