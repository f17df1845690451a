pub const BRAND_NAME: &str = "Adviseur AI";

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Wraps already-escaped `body` in the shared mail layout.
pub(crate) fn render_layout(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="nl">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body style="margin:0;padding:0;background:#f4f5f7;font-family:Arial,Helvetica,sans-serif;color:#1f2933;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background:#f4f5f7;padding:24px 0;">
<tr><td align="center">
<table role="presentation" width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;padding:32px;">
<tr><td style="font-size:22px;font-weight:bold;padding-bottom:16px;">{brand}</td></tr>
<tr><td style="font-size:15px;line-height:1.6;">
{body}
</td></tr>
<tr><td style="font-size:12px;color:#7b8794;padding-top:32px;">
Je ontvangt deze e-mail omdat je een account hebt bij {brand}.
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#,
        brand = BRAND_NAME,
    )
}

pub(crate) fn paragraph(text: &str) -> String {
    format!("<p style=\"margin:0 0 12px;\">{}</p>", escape_html(text))
}

/// Key/value rows for order summaries.
pub(crate) fn detail_table(rows: &[(&str, String)]) -> String {
    let mut html = String::from(
        "<table role=\"presentation\" cellpadding=\"0\" cellspacing=\"0\" style=\"margin:16px 0;width:100%;\">",
    );
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><td style=\"padding:4px 0;color:#52606d;\">{}</td><td style=\"padding:4px 0;text-align:right;\">{}</td></tr>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</table>");
    html
}
