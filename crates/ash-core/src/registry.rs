use crate::tool::{Tool, ToolResponse};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory tool registry for local tool lookup and dispatch.
///
/// Tools are keyed by [`Tool::name`]; registering a second tool with the
/// same name replaces the first. Names iterate in sorted order so listings
/// are stable.
///
/// # Example
///
/// ```rust
/// use ash_core::{InMemoryToolRegistry, Tool, ToolResponse};
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use std::sync::Arc;
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     async fn call(&self, _input: Value) -> ToolResponse {
///         ToolResponse::success("pong")
///     }
/// }
///
/// let registry = InMemoryToolRegistry::new().with_tool(Arc::new(PingTool));
/// assert_eq!(registry.tool_names(), vec!["ping".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool using the builder pattern.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Name → description for every registered tool.
    pub fn describe(&self) -> BTreeMap<String, String> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call to the named tool.
    ///
    /// Returns `None` if the tool is not registered.
    pub async fn dispatch(&self, name: &str, input: Value) -> Option<ToolResponse> {
        let tool = self.get_tool(name)?;
        debug!(tool = name, "dispatching tool call");
        Some(tool.call(input).await)
    }

    /// Dispatch a call, answering unknown tool names with an error response.
    pub async fn try_dispatch(&self, name: &str, input: Value) -> ToolResponse {
        match self.dispatch(name, input).await {
            Some(response) => response,
            None => ToolResponse::error(format!(
                "Tool not found: {name}. Available: {}",
                self.tool_names().join(", ")
            )),
        }
    }
}
