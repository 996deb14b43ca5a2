//! The read-only server snapshot shared by every dispatch.
//!
//! [`ServerContext`] holds the negotiated metadata (protocol versions,
//! capabilities, server info, page sizes) and the registered primitives.
//! It is built once by the server builder and never mutated afterwards.
//!
//! Primitive accessors are filtered per session: a primitive is visible when
//! its `should_register` accepts the session and the [`Authorizer`] allows
//! it. Listing silently omits refused primitives; direct lookup reports
//! [`McpError::Unauthorized`], distinct from not-found.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{InvalidArgument, McpError};
use crate::mcp::pagination::Paginator;
use crate::mcp::primitive::{PrimitiveRef, Prompt, Resource, Tool};
use crate::mcp::session::Session;
use crate::mcp::uri_template::{UriTemplate, Variables};

/// Message used for every authorization refusal.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized.";

/// Decides whether a session may see and use a primitive.
pub trait Authorizer: Send + Sync {
    /// Returns `true` if `session` may access `primitive`.
    fn authorize(&self, session: &Session, primitive: PrimitiveRef<'_>) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&Session, PrimitiveRef<'_>) -> bool + Send + Sync,
{
    fn authorize(&self, session: &Session, primitive: PrimitiveRef<'_>) -> bool {
        self(session, primitive)
    }
}

/// Grants every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _session: &Session, _primitive: PrimitiveRef<'_>) -> bool {
        true
    }
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Optional server capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `logging/setLevel` and `notifications/message`.
    pub logging: bool,
    /// `completion/complete`.
    pub completions: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            logging: true,
            completions: true,
        }
    }
}

impl Capabilities {
    /// Builds the `capabilities` object of the `initialize` result.
    #[must_use]
    pub fn to_json(self) -> Value {
        let mut caps = Map::new();
        caps.insert("tools".into(), json!({ "listChanged": false }));
        caps.insert("resources".into(), json!({ "listChanged": false }));
        caps.insert("prompts".into(), json!({ "listChanged": false }));
        if self.logging {
            caps.insert("logging".into(), json!({}));
        }
        if self.completions {
            caps.insert("completions".into(), json!({}));
        }
        Value::Object(caps)
    }
}

/// A registered resource with its URI compiled once.
pub struct RegisteredResource {
    resource: Arc<dyn Resource>,
    template: Option<UriTemplate>,
}

impl RegisteredResource {
    /// Compiles `resource`'s URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is not a valid template.
    pub fn new(resource: Arc<dyn Resource>) -> Result<Self, InvalidArgument> {
        let template = UriTemplate::new(resource.uri())?;
        let template = (!template.is_static()).then_some(template);
        Ok(Self { resource, template })
    }

    /// Returns the resource.
    #[must_use]
    pub fn resource(&self) -> &dyn Resource {
        self.resource.as_ref()
    }

    /// Returns the compiled template, for templated resources.
    #[must_use]
    pub const fn template(&self) -> Option<&UriTemplate> {
        self.template.as_ref()
    }

    /// Returns `true` if the URI contains variables.
    #[must_use]
    pub const fn is_template(&self) -> bool {
        self.template.is_some()
    }
}

impl std::fmt::Debug for RegisteredResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredResource")
            .field("uri", &self.resource.uri())
            .field("is_template", &self.is_template())
            .finish()
    }
}

/// Immutable server snapshot.
pub struct ServerContext {
    supported_protocol_versions: Vec<String>,
    capabilities: Capabilities,
    server_info: ServerInfo,
    instructions: Option<String>,
    paginator: Paginator,
    tools: IndexMap<String, Arc<dyn Tool>>,
    resources: IndexMap<String, RegisteredResource>,
    prompts: IndexMap<String, Arc<dyn Prompt>>,
    authorizer: Arc<dyn Authorizer>,
}

impl ServerContext {
    /// Creates an empty context.
    ///
    /// `supported_protocol_versions` is ordered newest first.
    #[must_use]
    pub fn new(
        server_info: ServerInfo,
        supported_protocol_versions: Vec<String>,
        capabilities: Capabilities,
        paginator: Paginator,
    ) -> Self {
        Self {
            supported_protocol_versions,
            capabilities,
            server_info,
            instructions: None,
            paginator,
            tools: IndexMap::new(),
            resources: IndexMap::new(),
            prompts: IndexMap::new(),
            authorizer: Arc::new(AllowAll),
        }
    }

    pub(crate) fn set_server_info(&mut self, server_info: ServerInfo) {
        self.server_info = server_info;
    }

    pub(crate) fn set_supported_protocol_versions(&mut self, versions: Vec<String>) {
        self.supported_protocol_versions = versions;
    }

    pub(crate) fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    pub(crate) fn set_paginator(&mut self, paginator: Paginator) {
        self.paginator = paginator;
    }

    pub(crate) fn set_instructions(&mut self, instructions: Option<String>) {
        self.instructions = instructions;
    }

    pub(crate) fn set_authorizer(&mut self, authorizer: Arc<dyn Authorizer>) {
        self.authorizer = authorizer;
    }

    /// Registers a tool, replacing any earlier tool of the same name.
    pub(crate) fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Registers a resource, replacing any earlier resource with the same URI.
    pub(crate) fn add_resource(&mut self, resource: Arc<dyn Resource>) -> Result<(), InvalidArgument> {
        let registered = RegisteredResource::new(resource)?;
        self.resources
            .insert(registered.resource.uri().to_string(), registered);
        Ok(())
    }

    /// Registers a prompt, replacing any earlier prompt of the same name.
    pub(crate) fn add_prompt(&mut self, prompt: Arc<dyn Prompt>) {
        self.prompts.insert(prompt.name().to_string(), prompt);
    }

    /// Returns the supported protocol versions, newest first.
    #[must_use]
    pub fn supported_protocol_versions(&self) -> &[String] {
        &self.supported_protocol_versions
    }

    /// Returns the newest supported protocol version.
    #[must_use]
    pub fn latest_protocol_version(&self) -> Option<&str> {
        self.supported_protocol_versions.first().map(String::as_str)
    }

    /// Returns the optional capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the server name and version.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns the instructions sent in the `initialize` result.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Returns the page size policy.
    #[must_use]
    pub const fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    fn allowed(&self, session: &Session, primitive: PrimitiveRef<'_>) -> bool {
        self.authorizer.authorize(session, primitive)
    }

    /// Tools visible to `session`, in registration order.
    #[must_use]
    pub fn tools(&self, session: &Session) -> Vec<&dyn Tool> {
        self.tools
            .values()
            .map(Arc::as_ref)
            .filter(|tool| tool.should_register(session))
            .filter(|tool| self.allowed(session, PrimitiveRef::Tool(*tool)))
            .collect()
    }

    /// Static resources visible to `session`.
    #[must_use]
    pub fn resources(&self, session: &Session) -> Vec<&dyn Resource> {
        self.visible_resources(session, false)
    }

    /// Resource templates visible to `session`.
    #[must_use]
    pub fn resource_templates(&self, session: &Session) -> Vec<&dyn Resource> {
        self.visible_resources(session, true)
    }

    fn visible_resources(&self, session: &Session, templated: bool) -> Vec<&dyn Resource> {
        self.resources
            .values()
            .filter(|registered| registered.is_template() == templated)
            .map(RegisteredResource::resource)
            .filter(|resource| resource.should_register(session))
            .filter(|resource| self.allowed(session, PrimitiveRef::Resource(*resource)))
            .collect()
    }

    /// Prompts visible to `session`, in registration order.
    #[must_use]
    pub fn prompts(&self, session: &Session) -> Vec<&dyn Prompt> {
        self.prompts
            .values()
            .map(Arc::as_ref)
            .filter(|prompt| prompt.should_register(session))
            .filter(|prompt| self.allowed(session, PrimitiveRef::Prompt(*prompt)))
            .collect()
    }

    /// Looks up a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if no eligible tool has that name and
    /// `Unauthorized` if the authorizer refuses it.
    pub fn find_tool(&self, session: &Session, name: &str) -> Result<&dyn Tool, McpError> {
        let tool = self
            .tools
            .get(name)
            .map(Arc::as_ref)
            .filter(|tool| tool.should_register(session))
            .ok_or_else(|| McpError::invalid_params(format!("Tool [{name}] not found.")))?;
        self.gate(session, PrimitiveRef::Tool(tool))?;
        Ok(tool)
    }

    /// Looks up a prompt by name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if no eligible prompt has that name and
    /// `Unauthorized` if the authorizer refuses it.
    pub fn find_prompt(&self, session: &Session, name: &str) -> Result<&dyn Prompt, McpError> {
        let prompt = self
            .prompts
            .get(name)
            .map(Arc::as_ref)
            .filter(|prompt| prompt.should_register(session))
            .ok_or_else(|| McpError::invalid_params(format!("Prompt [{name}] not found.")))?;
        self.gate(session, PrimitiveRef::Prompt(prompt))?;
        Ok(prompt)
    }

    /// Resolves `uri` to a resource and its template variables.
    ///
    /// An exact static URI wins; otherwise the first template whose matcher
    /// accepts `uri` is used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if nothing eligible matches and
    /// `Unauthorized` if the authorizer refuses the match.
    pub fn find_resource(
        &self,
        session: &Session,
        uri: &str,
    ) -> Result<(&dyn Resource, Variables), McpError> {
        let exact = self
            .resources
            .get(uri)
            .filter(|registered| !registered.is_template())
            .filter(|registered| registered.resource().should_register(session))
            .map(|registered| (registered.resource(), Variables::new()));

        let found = exact.or_else(|| {
            self.resources
                .values()
                .filter(|registered| registered.resource().should_register(session))
                .find_map(|registered| {
                    let variables = registered.template()?.match_uri(uri)?;
                    Some((registered.resource(), variables))
                })
        });

        let (resource, variables) =
            found.ok_or_else(|| McpError::invalid_params(format!("Resource [{uri}] not found.")))?;
        self.gate(session, PrimitiveRef::Resource(resource))?;
        Ok((resource, variables))
    }

    /// Resolves a `ref/resource` completion reference.
    ///
    /// Tries an exact URI, then template matching, then the exact template
    /// string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if nothing eligible matches and
    /// `Unauthorized` if the authorizer refuses the match.
    pub fn find_resource_ref(&self, session: &Session, uri: &str) -> Result<&dyn Resource, McpError> {
        let eligible = |registered: &&RegisteredResource| registered.resource().should_register(session);

        let found = self
            .resources
            .get(uri)
            .filter(eligible)
            .filter(|registered| !registered.is_template())
            .or_else(|| {
                self.resources
                    .values()
                    .filter(eligible)
                    .find(|registered| registered.template().is_some_and(|t| t.matches(uri)))
            })
            .or_else(|| {
                self.resources
                    .values()
                    .filter(eligible)
                    .find(|registered| registered.template().is_some_and(|t| t.as_str() == uri))
            })
            .map(RegisteredResource::resource)
            .ok_or_else(|| McpError::invalid_params(format!("Resource [{uri}] not found.")))?;

        self.gate(session, PrimitiveRef::Resource(found))?;
        Ok(found)
    }

    fn gate(&self, session: &Session, primitive: PrimitiveRef<'_>) -> Result<(), McpError> {
        if self.allowed(session, primitive) {
            return Ok(());
        }
        tracing::warn!(
            session_id = %session.id(),
            kind = primitive.kind(),
            name = primitive.name(),
            "Authorization refused"
        );
        Err(McpError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()))
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("supported_protocol_versions", &self.supported_protocol_versions)
            .field("capabilities", &self.capabilities)
            .field("server_info", &self.server_info)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.values().collect::<Vec<_>>())
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
