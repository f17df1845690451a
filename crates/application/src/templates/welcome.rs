use chrono::{DateTime, Utc};
use domain::value_objects::{
    enums::{billing_periods::BillingPeriod, plans::Plan},
    pricing::format_euro,
};

use super::{
    RenderedEmail,
    layout::{BRAND_NAME, detail_table, escape_html, paragraph, render_layout},
};

#[derive(Debug, Clone)]
pub struct WelcomeDetails {
    pub full_name: Option<String>,
    pub plan: Plan,
    pub billing_period: BillingPeriod,
    pub amount_minor: i32,
    pub discount_code: Option<String>,
    pub discount_amount_minor: i32,
    pub contract_end_date: DateTime<Utc>,
    pub opt_out_deadline: DateTime<Utc>,
    pub app_url: String,
}

pub fn welcome_email(details: &WelcomeDetails) -> RenderedEmail {
    let greeting = match details.full_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Hallo {},", name),
        _ => "Hallo,".to_string(),
    };
    let price_label = match details.billing_period {
        BillingPeriod::Monthly => format!("{} per maand", format_euro(details.amount_minor)),
        BillingPeriod::Yearly => format!("{} per jaar", format_euro(details.amount_minor)),
    };
    let contract_end = details.contract_end_date.format("%d-%m-%Y").to_string();
    let opt_out = details.opt_out_deadline.format("%d-%m-%Y").to_string();

    let mut rows = vec![
        ("Abonnement", details.plan.display_name().to_string()),
        ("Betaalperiode", details.billing_period.display_name().to_string()),
        ("Prijs", price_label.clone()),
    ];
    if let Some(code) = details.discount_code.as_ref() {
        rows.push((
            "Korting",
            format!("{} ({})", format_euro(details.discount_amount_minor), code),
        ));
    }
    rows.push(("Contract loopt tot", contract_end.clone()));
    rows.push(("Bedenktijd tot", opt_out.clone()));

    let chat_url = format!("{}/chat", details.app_url.trim_end_matches('/'));
    let body = [
        paragraph(&greeting),
        paragraph(&format!(
            "Welkom bij {}! Je betaling is ontvangen en je abonnement is actief.",
            BRAND_NAME
        )),
        detail_table(&rows),
        paragraph(&format!(
            "Je hebt 14 dagen bedenktijd, tot en met {}. Binnen die periode kun je je abonnement kosteloos opzeggen.",
            opt_out
        )),
        format!(
            "<p style=\"margin:24px 0;\"><a href=\"{}\" style=\"background:#2563eb;color:#ffffff;padding:12px 20px;border-radius:6px;text-decoration:none;\">Start met chatten</a></p>",
            escape_html(&chat_url)
        ),
    ]
    .join("\n");

    let text = format!(
        "{greeting}\n\nWelkom bij {BRAND_NAME}! Je betaling is ontvangen en je abonnement is actief.\n\n\
         Abonnement: {plan}\nBetaalperiode: {period}\nPrijs: {price_label}\n\
         Contract loopt tot: {contract_end}\nBedenktijd tot: {opt_out}\n\n\
         Start met chatten: {chat_url}\n",
        plan = details.plan.display_name(),
        period = details.billing_period.display_name(),
    );

    let subject = format!("Welkom bij {}!", BRAND_NAME);
    RenderedEmail {
        html: render_layout(&subject, &body),
        subject,
        text,
    }
}
