use card_core::AlertDirection;

use crate::{EmailMessage, PriceAlertEmail};

pub struct EmailTemplate;

/// Escape text for interpolation into HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap(body_content: &str, app_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"></head>
<body style="margin:0;padding:0;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background:#f1f5f9;padding:32px 0;">
  <tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;border-radius:8px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
      <tr><td>
        {body_content}
      </td></tr>
    </table>
    <p style="color:#94a3b8;font-size:11px;margin-top:16px;">DimeDrop &middot; <a href="{app_url}" style="color:#94a3b8;">{app_url}</a></p>
  </td></tr>
</table>
</body>
</html>"#
    )
}

impl EmailTemplate {
    pub fn price_alert(to: &str, alert: &PriceAlertEmail, app_url: &str) -> EmailMessage {
        let card_name = escape_html(&alert.card_name);
        let app_url = escape_html(app_url);
        let triggered_at = escape_html(&alert.triggered_at);
        let target = alert.target_price;
        let current = alert.current_price;

        let (movement, condition) = match alert.alert_type {
            AlertDirection::Above => ("risen above", "Above"),
            AlertDirection::Below => ("fallen below", "Below"),
        };

        let body = format!(
            r#"<div style="background:#1a365d;color:#fff;padding:16px 20px;font-size:20px;font-weight:700;">Price Alert Triggered!</div>
<div style="padding:16px 20px;">
  <p style="color:#64748b;margin:0 0 12px;">Your DimeDrop alert has been activated</p>
  <h2 style="margin:0 0 12px;color:#1e293b;">{card_name}</h2>
  <table style="width:100%;border-collapse:collapse;">
    <tr><td style="padding:8px 12px;color:#94a3b8;">Target Price</td><td style="padding:8px 12px;font-weight:600;">${target:.2}</td></tr>
    <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Condition</td><td style="padding:8px 12px;font-weight:600;">{condition}</td></tr>
    <tr><td style="padding:8px 12px;color:#94a3b8;">Current Price</td><td style="padding:8px 12px;font-weight:600;">${current:.2}</td></tr>
    <tr style="background:#f8fafc;"><td style="padding:8px 12px;color:#94a3b8;">Triggered At</td><td style="padding:8px 12px;">{triggered_at}</td></tr>
  </table>
  <p style="color:#334155;">Great news! The price of <strong>{card_name}</strong> has {movement} your target price of ${target:.2}.</p>
  <p style="text-align:center;margin:24px 0;">
    <a href="{app_url}/alerts" style="background:#3182ce;color:#fff;padding:10px 20px;border-radius:6px;text-decoration:none;">View Your Alerts</a>
  </p>
  <p style="color:#94a3b8;font-size:12px;margin:0;">To unsubscribe from alerts, visit your <a href="{app_url}/settings">account settings</a>.</p>
</div>"#
        );

        EmailMessage {
            to: to.to_string(),
            subject: format!("Price Alert Triggered: {}", alert.card_name),
            html: wrap(&body, &app_url),
        }
    }

    pub fn test_notification(to: &str, app_url: &str) -> EmailMessage {
        let app_url = escape_html(app_url);
        let sent_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");

        let body = format!(
            r#"<div style="background:#1a365d;color:#fff;padding:16px 20px;font-size:20px;font-weight:700;">Test Notification</div>
<div style="padding:16px 20px;">
  <p style="color:#334155;">This is a test notification from DimeDrop to verify your email settings are working correctly.</p>
  <p style="color:#334155;">If you received this email, your notification system is properly configured!</p>
  <p><a href="{app_url}" style="color:#3182ce;">Visit DimeDrop</a></p>
  <p style="font-size:12px;color:#94a3b8;">Sent at {sent_at} UTC</p>
</div>"#
        );

        EmailMessage {
            to: to.to_string(),
            subject: "DimeDrop Test Notification".to_string(),
            html: wrap(&body, &app_url),
        }
    }
}
