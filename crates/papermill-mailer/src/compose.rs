//! Invoice mail composition.
//!
//! Produces the subject line and HTML body for a notification job. The
//! body is a self-contained document so it renders the same in every
//! mail client; recipient-supplied strings are escaped before insertion.

use chrono::{Datelike, Utc};

use papermill_core::types::document::RecipientData;

/// A composed subject and HTML body, ready for a transport.
#[derive(Debug, Clone)]
pub struct ComposedMail {
    pub subject: String,
    pub html_body: String,
}

/// Compose the invoice notification for a document.
///
/// The subject defaults to `Invoice {document_number}` when the caller
/// did not supply one. Optional fields fall back to neutral wording
/// rather than leaving holes in the body.
pub fn compose_invoice_mail(document_number: &str, data: &RecipientData) -> ComposedMail {
    let subject = data
        .subject
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Invoice {document_number}"));

    ComposedMail {
        subject,
        html_body: invoice_body(document_number, data),
    }
}

fn invoice_body(document_number: &str, data: &RecipientData) -> String {
    let client_name = non_empty(data.client_name.as_deref()).unwrap_or("Valued Customer");
    let custom_message = non_empty(data.custom_message.as_deref())
        .unwrap_or("Please find your invoice attached to this email.");
    let company_name = non_empty(data.company_name.as_deref()).unwrap_or("Papermill");
    let amount = format_amount(data.total_amount.as_deref());

    let due_date_row = match non_empty(data.due_date.as_deref()) {
        Some(due) => format!("<p><strong>Due Date:</strong> {}</p>", escape(due)),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
.container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
.header {{ background: #412e80; color: white; padding: 30px; text-align: center; border-radius: 8px 8px 0 0; }}
.content {{ background: #f9f9f9; padding: 30px; border-radius: 0 0 8px 8px; }}
.invoice-details {{ background: white; padding: 20px; border-radius: 8px; margin: 20px 0; }}
.footer {{ text-align: center; color: #666; font-size: 12px; margin-top: 20px; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h1>Invoice</h1></div>
<div class="content">
<p>Dear {client},</p>
<p>{message}</p>
<div class="invoice-details">
<h3>Invoice Details</h3>
<p><strong>Invoice Number:</strong> {number}</p>
<p><strong>Amount:</strong> ${amount}</p>
{due_date_row}
</div>
<p>If you have any questions about this invoice, please contact us.</p>
<p>Best regards,<br>{company} Team</p>
</div>
<div class="footer"><p>&copy; {year} {company}. All rights reserved.</p></div>
</div>
</body>
</html>"#,
        client = escape(client_name),
        message = escape(custom_message),
        number = escape(document_number),
        amount = amount,
        due_date_row = due_date_row,
        company = escape(company_name),
        year = Utc::now().year(),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Amounts arrive as caller-supplied strings; unparseable values render
/// as 0.00 rather than failing the job.
fn format_amount(value: Option<&str>) -> String {
    let parsed = value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    format!("{parsed:.2}")
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_defaults_to_document_number() {
        let mail = compose_invoice_mail("INV-042", &RecipientData::default());
        assert_eq!(mail.subject, "Invoice INV-042");

        let data = RecipientData {
            subject: Some("Payment reminder".to_string()),
            ..Default::default()
        };
        let mail = compose_invoice_mail("INV-042", &data);
        assert_eq!(mail.subject, "Payment reminder");
    }

    #[test]
    fn test_body_uses_fallbacks() {
        let mail = compose_invoice_mail("INV-1", &RecipientData::default());
        assert!(mail.html_body.contains("Dear Valued Customer"));
        assert!(mail.html_body.contains("Please find your invoice attached"));
        assert!(mail.html_body.contains("$0.00"));
        assert!(!mail.html_body.contains("Due Date"));
    }

    #[test]
    fn test_body_includes_supplied_fields() {
        let data = RecipientData {
            client_name: Some("Acme Corp".to_string()),
            total_amount: Some("1234.5".to_string()),
            due_date: Some("2026-09-15".to_string()),
            custom_message: Some("Thanks for your business".to_string()),
            company_name: Some("Initech".to_string()),
            ..Default::default()
        };
        let mail = compose_invoice_mail("INV-7", &data);
        assert!(mail.html_body.contains("Dear Acme Corp"));
        assert!(mail.html_body.contains("$1234.50"));
        assert!(mail.html_body.contains("2026-09-15"));
        assert!(mail.html_body.contains("Thanks for your business"));
        assert!(mail.html_body.contains("Initech Team"));
    }

    #[test]
    fn test_user_strings_are_escaped() {
        let data = RecipientData {
            client_name: Some("<script>alert(1)</script>".to_string()),
            ..Default::default()
        };
        let mail = compose_invoice_mail("INV-1", &data);
        assert!(!mail.html_body.contains("<script>"));
        assert!(mail.html_body.contains("&lt;script&gt;"));
    }
}
