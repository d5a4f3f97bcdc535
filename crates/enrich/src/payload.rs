//! Raw payload parsing.
//!
//! Everything here is total: a missing or malformed field means the matching
//! enrichment step is simply not requested, never an error.

use {serde::Deserialize, serde_json::Value, tracing::debug, url::Url};

/// Immutable input for one enrichment invocation.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Category identifier already set by the sender, if any.
    pub category_id: Option<String>,
    /// Raw provider payload as delivered by the host.
    pub payload: Value,
}

/// Structured metadata extracted from the raw payload.
#[derive(Debug, Clone, Default)]
pub struct PayloadMeta {
    pub message_id: Option<String>,
    pub attachment_url: Option<Url>,
    pub buttons: Vec<ActionButton>,
}

/// Interactive button style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    #[default]
    Default,
    Destructive,
    TextInput,
}

/// One parsed action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub id: String,
    pub title: String,
    pub style: ButtonStyle,
    pub opens_app: bool,
    pub requires_unlock: bool,
    /// Submit-button label for text-input buttons.
    pub input_button_title: String,
    /// Placeholder text for text-input buttons.
    pub input_placeholder: String,
}

/// Button wire shape inside `metadata.actionButtons`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawButton {
    identifier: Option<String>,
    title: Option<String>,
    button_type: Option<String>,
    open_app: Option<bool>,
    requires_unlock: Option<bool>,
    input_button_title: Option<String>,
    input_placeholder: Option<String>,
}

/// Extract enrichment metadata from a raw payload.
pub fn parse_payload(payload: &Value) -> PayloadMeta {
    let meta = payload.get("metadata");

    let message_id = meta
        .and_then(|m| m.get("messageId"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let attachment_url = meta
        .and_then(|m| m.get("attachmentUrl"))
        .and_then(Value::as_str)
        .and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(url = raw, error = %e, "ignoring unparseable attachment URL");
                None
            },
        });

    let buttons = meta
        .and_then(|m| m.get("actionButtons"))
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(parse_button).collect())
        .unwrap_or_default();

    PayloadMeta {
        message_id,
        attachment_url,
        buttons,
    }
}

/// Buttons missing an identifier or a title are dropped silently.
fn parse_button(raw: &Value) -> Option<ActionButton> {
    let raw: RawButton = serde_json::from_value(raw.clone()).ok()?;
    let id = raw.identifier?;
    let title = raw.title?;

    let style = match raw.button_type.as_deref() {
        Some("destructive") => ButtonStyle::Destructive,
        Some("textInput") => ButtonStyle::TextInput,
        _ => ButtonStyle::Default,
    };

    Some(ActionButton {
        id,
        title,
        style,
        opens_app: raw.open_app.unwrap_or(true),
        requires_unlock: raw.requires_unlock.unwrap_or(false),
        input_button_title: raw.input_button_title.unwrap_or_default(),
        input_placeholder: raw.input_placeholder.unwrap_or_default(),
    })
}
