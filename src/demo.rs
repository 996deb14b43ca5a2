//! Example primitives served by the `mcp-engine` binary.
//!
//! They cover each kind of primitive the engine supports: a plain tool, a
//! streaming tool, a static resource, a resource template with a completion
//! callback and a prompt with an enum completion.

use serde_json::{json, Map, Value};

use crate::error::InvalidArgument;
use crate::mcp::completion::{Completion, CompletionEnum};
use crate::mcp::content::Response;
use crate::mcp::primitive::{
    Output, Prompt, PromptArgument, Request, Resource, Tool, ToolAnnotations, ValidationError,
};
use crate::mcp::protocol::methods;
use crate::mcp::server::ServerBuilder;
use crate::mcp::session::LogLevel;

/// Largest countdown the streaming tool accepts.
pub const MAX_COUNTDOWN: u64 = 10;

/// Users known to the profile resource.
const USERS: [(&str, &str); 3] = [
    ("1", "Ada Lovelace"),
    ("2", "Alan Turing"),
    ("3", "Grace Hopper"),
];

/// Registers every demo primitive on `builder`.
///
/// # Errors
///
/// Returns an error if a resource URI is not a valid template.
pub fn register(builder: ServerBuilder) -> Result<ServerBuilder, InvalidArgument> {
    builder
        .tool(SayHiTool)
        .tool(CountdownTool)
        .prompt(GreetingPrompt)
        .resource(AppInfoResource)?
        .resource(UserProfileResource)
}

/// Greets a person by name.
pub struct SayHiTool;

impl Tool for SayHiTool {
    fn name(&self) -> &str {
        "say-hi-tool"
    }

    fn description(&self) -> &str {
        "Says hello to the given person."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Who to greet"}
            },
            "required": ["name"]
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::new()
            .title("Say hi")
            .read_only(true)
            .idempotent(true)
    }

    fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
        let name = request.require_string("name")?;
        Ok(Response::text(format!("Hello, {name}!")).into())
    }
}

/// Counts down, streaming one notification per step.
///
/// With a `progressToken` in the request `_meta` the steps are progress
/// notifications; otherwise they are `info` log messages.
pub struct CountdownTool;

impl Tool for CountdownTool {
    fn name(&self) -> &str {
        "countdown"
    }

    fn description(&self) -> &str {
        "Counts down from a number, reporting every step."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": {"type": "integer", "minimum": 1, "maximum": MAX_COUNTDOWN}
            },
            "required": ["from"]
        })
    }

    fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
        let from = match request.get("from") {
            None | Some(Value::Null) => {
                return Err(ValidationError::new("The from field is required."))
            }
            Some(value) => value
                .as_u64()
                .filter(|n| (1..=MAX_COUNTDOWN).contains(n))
                .ok_or_else(|| {
                    ValidationError::new(format!(
                        "The from field must be an integer between 1 and {MAX_COUNTDOWN}."
                    ))
                })?,
        };
        let token = request.progress_token().cloned();

        let steps = (0..from).map(move |done| {
            let remaining = from - done;
            match &token {
                Some(token) => {
                    let mut params = Map::new();
                    params.insert("progressToken".into(), token.clone());
                    params.insert("progress".into(), (done + 1).into());
                    params.insert("total".into(), from.into());
                    params.insert("message".into(), format!("{remaining}...").into());
                    Response::notification(methods::PROGRESS, params)
                }
                None => Response::log(LogLevel::Info, format!("{remaining}...")),
            }
        });
        let finish = std::iter::once(Response::text("Liftoff!"));

        Ok(Output::stream(steps.chain(finish)))
    }
}

/// Static information about the running server.
pub struct AppInfoResource;

impl Resource for AppInfoResource {
    fn name(&self) -> &str {
        "app-info"
    }

    fn description(&self) -> &str {
        "Name and version of this server."
    }

    fn uri(&self) -> &str {
        "app://info"
    }

    fn handle(&self, _request: &Request) -> Result<Output, ValidationError> {
        Ok(Response::text(format!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .into())
    }
}

/// User profiles addressed by id.
pub struct UserProfileResource;

impl Resource for UserProfileResource {
    fn name(&self) -> &str {
        "user-profile"
    }

    fn description(&self) -> &str {
        "Profile of one user, as JSON."
    }

    fn uri(&self) -> &str {
        "file://users/{userId}"
    }

    fn mime_type(&self) -> &str {
        "application/json"
    }

    fn complete(&self, argument: &str) -> Option<Completion> {
        (argument == "userId").then(|| {
            Completion::callback(|partial: &str| {
                USERS
                    .iter()
                    .map(|(id, _)| (*id).to_string())
                    .filter(|id| id.starts_with(partial))
                    .collect::<Vec<_>>()
            })
        })
    }

    fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
        let user_id = request.require_string("userId")?;
        let response = USERS
            .iter()
            .find(|(id, _)| *id == user_id)
            .map_or_else(
                || Response::error(format!("User [{user_id}] not found.")),
                |(id, name)| Response::text(json!({ "id": id, "name": name }).to_string()),
            );
        Ok(response.into())
    }
}

/// Tone of the greeting prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreetingStyle {
    /// Polite and reserved.
    Formal,
    /// Relaxed.
    Casual,
    /// Nautical.
    Pirate,
}

impl GreetingStyle {
    fn instruction(self) -> &'static str {
        match self {
            Self::Formal => "Write a formal, courteous greeting",
            Self::Casual => "Write a friendly, casual greeting",
            Self::Pirate => "Write a greeting in the voice of a pirate",
        }
    }
}

impl CompletionEnum for GreetingStyle {
    fn cases() -> &'static [Self] {
        &[Self::Formal, Self::Casual, Self::Pirate]
    }

    fn case_name(&self) -> &'static str {
        match self {
            Self::Formal => "Formal",
            Self::Casual => "Casual",
            Self::Pirate => "Pirate",
        }
    }

    fn backing_value(&self) -> Option<String> {
        Some(self.case_name().to_lowercase())
    }
}

/// Asks the model to greet someone in a chosen style.
pub struct GreetingPrompt;

impl Prompt for GreetingPrompt {
    fn name(&self) -> &str {
        "greeting"
    }

    fn description(&self) -> &str {
        "Greets a person in the requested style."
    }

    fn arguments(&self) -> Vec<PromptArgument> {
        vec![
            PromptArgument::required("name", "Who to greet"),
            PromptArgument::optional("style", "formal, casual or pirate"),
        ]
    }

    fn complete(&self, argument: &str) -> Option<Completion> {
        (argument == "style").then(Completion::enumeration::<GreetingStyle>)
    }

    fn handle(&self, request: &Request) -> Result<Output, ValidationError> {
        let name = request.require_string("name")?;
        let style = match request.string("style") {
            None | Some("") => GreetingStyle::Casual,
            Some(value) => GreetingStyle::cases()
                .iter()
                .copied()
                .find(|style| style.backing_value().as_deref() == Some(value))
                .ok_or_else(|| {
                    ValidationError::new("The selected style is invalid.")
                })?,
        };

        Ok(vec![
            Response::text(format!("{} for {name}.", style.instruction())),
            Response::text(format!("Hello, {name}!")).as_assistant(),
        ]
        .into())
    }
}
