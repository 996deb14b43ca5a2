//! Content items returned by tools, prompts and resources.
//!
//! A [`Content`] item serialises differently depending on where it is
//! embedded. Each variant declares the contexts it is legal in; using it
//! elsewhere fails with [`InvalidArgument`].
//!
//! | Variant      | Tool | Prompt | Resource |
//! |--------------|------|--------|----------|
//! | Text         | ✓    | ✓      | ✓        |
//! | Blob         |      |        | ✓        |
//! | Image        | ✓    | ✓      |          |
//! | Audio        | ✓    | ✓      |          |
//! | Link         | ✓    | ✓      |          |
//! | Notification | ✓    | ✓      |          |
//! | Structured   | ✓    |        |          |

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::InvalidArgument;
use crate::mcp::protocol::methods;
use crate::mcp::session::LogLevel;

/// Where a content item is being serialised into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentContext {
    /// A `tools/call` result.
    Tool,
    /// A `prompts/get` message.
    Prompt,
    /// A `resources/read` contents entry.
    Resource,
}

impl std::fmt::Display for ContentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        })
    }
}

/// The payload of a content item.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentKind {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Binary data, base64 encoded.
    Blob {
        /// Base64 payload.
        blob: String,
    },
    /// Image data, base64 encoded.
    Image {
        /// Base64 payload.
        data: String,
        /// MIME type of the image.
        mime_type: String,
    },
    /// Audio data, base64 encoded.
    Audio {
        /// Base64 payload.
        data: String,
        /// MIME type of the audio.
        mime_type: String,
    },
    /// A link to a resource the client may read separately.
    Link {
        /// Resource URI.
        uri: String,
        /// Resource name.
        name: String,
        /// Optional description.
        description: Option<String>,
        /// Optional MIME type.
        mime_type: Option<String>,
    },
    /// A server-to-client notification emitted while streaming.
    Notification {
        /// Notification method.
        method: String,
        /// Notification params.
        params: Map<String, Value>,
    },
    /// Structured JSON output for tools that declare an output schema.
    Structured {
        /// The structured value.
        value: Value,
    },
}

/// A content item with optional `_meta`.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    kind: ContentKind,
    meta: Option<Map<String, Value>>,
}

impl Content {
    /// Creates a content item from its payload.
    #[must_use]
    pub const fn new(kind: ContentKind) -> Self {
        Self { kind, meta: None }
    }

    /// Text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ContentKind::Text { text: text.into() })
    }

    /// Binary content; the bytes are base64 encoded.
    #[must_use]
    pub fn blob(bytes: impl AsRef<[u8]>) -> Self {
        Self::new(ContentKind::Blob {
            blob: BASE64_STANDARD.encode(bytes),
        })
    }

    /// Image content; the bytes are base64 encoded.
    #[must_use]
    pub fn image(bytes: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        Self::new(ContentKind::Image {
            data: BASE64_STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        })
    }

    /// Audio content; the bytes are base64 encoded.
    #[must_use]
    pub fn audio(bytes: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        Self::new(ContentKind::Audio {
            data: BASE64_STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        })
    }

    /// A resource link.
    #[must_use]
    pub fn link(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ContentKind::Link {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        })
    }

    /// A streamed notification.
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::new(ContentKind::Notification {
            method: method.into(),
            params,
        })
    }

    /// Structured tool output.
    #[must_use]
    pub const fn structured(value: Value) -> Self {
        Self::new(ContentKind::Structured { value })
    }

    /// Attaches `_meta` to this item.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns the payload.
    #[must_use]
    pub const fn kind(&self) -> &ContentKind {
        &self.kind
    }

    /// Returns the `_meta` map, if any.
    #[must_use]
    pub const fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    /// Returns the text if this is a text item.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            ContentKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns `true` for streamed notifications.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self.kind, ContentKind::Notification { .. })
    }

    /// Whether this item may be serialised into `context`.
    #[must_use]
    pub const fn allowed_in(&self, context: ContentContext) -> bool {
        use ContentContext::{Prompt, Resource, Tool};
        match (&self.kind, context) {
            (ContentKind::Text { .. }, _)
            | (ContentKind::Blob { .. }, Resource)
            | (
                ContentKind::Image { .. }
                | ContentKind::Audio { .. }
                | ContentKind::Link { .. }
                | ContentKind::Notification { .. },
                Tool | Prompt,
            )
            | (ContentKind::Structured { .. }, Tool) => true,
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ContentKind::Text { .. } => "text",
            ContentKind::Blob { .. } => "blob",
            ContentKind::Image { .. } => "image",
            ContentKind::Audio { .. } => "audio",
            ContentKind::Link { .. } => "resource_link",
            ContentKind::Notification { .. } => "notification",
            ContentKind::Structured { .. } => "structured content",
        }
    }

    fn not_allowed(&self, context: ContentContext) -> InvalidArgument {
        InvalidArgument::new(format!(
            "{} content may not be used in {context} responses",
            self.name()
        ))
    }

    fn ensure_allowed(&self, context: ContentContext) -> Result<(), InvalidArgument> {
        if self.allowed_in(context) {
            Ok(())
        } else {
            Err(self.not_allowed(context))
        }
    }

    /// Serialises this item as an entry of a tool result's `content` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant is not legal in tool results.
    pub fn to_tool(&self) -> Result<Value, InvalidArgument> {
        self.ensure_allowed(ContentContext::Tool)?;
        Ok(self.with_meta_field(self.message_value()))
    }

    /// Serialises this item as the `content` of a prompt message.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant is not legal in prompt messages.
    pub fn to_prompt(&self) -> Result<Value, InvalidArgument> {
        self.ensure_allowed(ContentContext::Prompt)?;
        Ok(self.with_meta_field(self.message_value()))
    }

    /// Serialises this item as an entry of a resource read's `contents` array.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant is not legal in resource reads.
    pub fn to_resource(&self, uri: &str, mime_type: &str) -> Result<Value, InvalidArgument> {
        let (field, payload) = match &self.kind {
            ContentKind::Text { text } => ("text", text),
            ContentKind::Blob { blob } => ("blob", blob),
            _ => return Err(self.not_allowed(ContentContext::Resource)),
        };
        let mut entry = json!({ "uri": uri, "mimeType": mime_type });
        entry[field] = Value::String(payload.clone());
        Ok(self.with_meta_field(entry))
    }

    fn message_value(&self) -> Value {
        match &self.kind {
            ContentKind::Text { text } => json!({ "type": "text", "text": text }),
            ContentKind::Blob { blob } => json!({ "type": "blob", "blob": blob }),
            ContentKind::Image { data, mime_type } => {
                json!({ "type": "image", "data": data, "mimeType": mime_type })
            }
            ContentKind::Audio { data, mime_type } => {
                json!({ "type": "audio", "data": data, "mimeType": mime_type })
            }
            ContentKind::Link {
                uri,
                name,
                description,
                mime_type,
            } => {
                let mut link = json!({ "type": "resource_link", "uri": uri, "name": name });
                if let Some(description) = description {
                    link["description"] = Value::String(description.clone());
                }
                if let Some(mime_type) = mime_type {
                    link["mimeType"] = Value::String(mime_type.clone());
                }
                link
            }
            ContentKind::Notification { method, params } => {
                json!({ "method": method, "params": params })
            }
            ContentKind::Structured { value } => json!({
                "type": "text",
                "text": value.to_string(),
            }),
        }
    }

    fn with_meta_field(&self, mut value: Value) -> Value {
        if let (Some(meta), Value::Object(map)) = (&self.meta, &mut value) {
            map.insert("_meta".to_string(), Value::Object(meta.clone()));
        }
        value
    }
}

/// The speaker of a prompt message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    #[default]
    User,
    /// The assistant.
    Assistant,
}

/// One item produced by a primitive handler.
///
/// Wraps a [`Content`] item with the prompt role and an error flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    content: Content,
    role: Role,
    is_error: bool,
}

impl Response {
    /// Wraps arbitrary content.
    #[must_use]
    pub const fn new(content: Content) -> Self {
        Self {
            content,
            role: Role::User,
            is_error: false,
        }
    }

    /// A text response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::text(text))
    }

    /// An error response carrying a text message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(message)
        }
    }

    /// A binary resource response.
    #[must_use]
    pub fn blob(bytes: impl AsRef<[u8]>) -> Self {
        Self::new(Content::blob(bytes))
    }

    /// An image response.
    #[must_use]
    pub fn image(bytes: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        Self::new(Content::image(bytes, mime_type))
    }

    /// An audio response.
    #[must_use]
    pub fn audio(bytes: impl AsRef<[u8]>, mime_type: impl Into<String>) -> Self {
        Self::new(Content::audio(bytes, mime_type))
    }

    /// A resource link response.
    #[must_use]
    pub fn link(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Content::link(uri, name))
    }

    /// Structured tool output.
    #[must_use]
    pub const fn structured(value: Value) -> Self {
        Self::new(Content::structured(value))
    }

    /// A notification to stream ahead of the final result.
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::new(Content::notification(method, params))
    }

    /// A `notifications/message` log entry.
    ///
    /// Dropped by the dispatcher when `level` is below the session log level.
    #[must_use]
    pub fn log(level: LogLevel, data: impl Into<Value>) -> Self {
        let mut params = Map::new();
        params.insert("level".to_string(), Value::String(level.to_string()));
        params.insert("data".to_string(), data.into());
        Self::notification(methods::LOG_MESSAGE, params)
    }

    /// Marks this response as spoken by the assistant.
    #[must_use]
    pub const fn as_assistant(mut self) -> Self {
        self.role = Role::Assistant;
        self
    }

    /// Attaches `_meta` to the wrapped content.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.content = self.content.with_meta(meta);
        self
    }

    /// Returns the wrapped content.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Returns the prompt role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns `true` if this is an error response.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_error
    }

    /// Returns `true` if this response is a streamed notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.content.is_notification()
    }

    /// Returns the level of a log notification, if this is one.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        match self.content.kind() {
            ContentKind::Notification { method, params } if method == methods::LOG_MESSAGE => {
                params.get("level")?.as_str()?.parse().ok()
            }
            _ => None,
        }
    }
}

impl From<Content> for Response {
    fn from(content: Content) -> Self {
        Self::new(content)
    }
}
