//! Human-readable renderings of an accepted alert.

use pumpwatch_core::alert::Alert;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Email subject line, e.g. `Pump Station Alert: dry_run - CRITICAL`.
pub fn subject(alert: &Alert) -> String {
    format!(
        "Pump Station Alert: {} - {}",
        alert.kind,
        alert.severity.as_str().to_uppercase()
    )
}

/// Plain-text email body.
pub fn plain_text(alert: &Alert) -> String {
    let mut body = format!(
        "Device: {}\nAlert Type: {}\nSeverity: {}\nMessage: {}\nTime: {}\n",
        alert.device_id,
        alert.kind,
        alert.severity.as_str(),
        alert.message,
        alert.timestamp.format(TIME_FORMAT),
    );
    if let (Some(threshold), Some(actual)) = (alert.threshold_value, alert.actual_value) {
        body.push_str(&format!("Threshold: {threshold}\nActual: {actual}\n"));
    }
    body
}

/// Markdown chat message.
pub fn chat_markdown(alert: &Alert) -> String {
    format!(
        "*Pump Station Alert*\n\n*Device:* {}\n*Type:* {}\n*Severity:* {}\n*Message:* {}\n*Time:* {}",
        alert.device_id,
        alert.kind,
        alert.severity.as_str(),
        alert.message,
        alert.timestamp.format(TIME_FORMAT),
    )
}
