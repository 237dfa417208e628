use crate::extract::{extract_message, parse_json_from_text};
use async_trait::async_trait;
use serde_json::json;
use stepcore::{
    ConfigField, Node, NodeContext, NodeError, NodeMetadata, NodeOutput, RunState, Value,
    ValueExt,
};
use tokio_util::sync::CancellationToken;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";
const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Azure OpenAI chat-completions settings
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: String,
    pub deployment: Option<String>,
}

impl ChatConfig {
    /// Read `AZURE_OPENAI_*` variables; missing values leave the node on its mock
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            api_key: var("AZURE_OPENAI_API_KEY"),
            endpoint: var("AZURE_OPENAI_ENDPOINT"),
            api_version: var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            deployment: var("AZURE_OPENAI_DEPLOYMENT_ID"),
        }
    }
    
    fn completions_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim_end_matches('/');
        let deployment = self.deployment.as_deref()?;
        Some(format!(
            "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={}",
            self.api_version
        ))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            deployment: None,
        }
    }
}

/// Generate a response with a chat model
///
/// Falls back to a canned welcome message when the model is not
/// configured or the request fails.
pub struct ChatNode {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatNode {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
    
    async fn complete(
        &self,
        system_prompt: &str,
        cancellation: &CancellationToken,
    ) -> Result<String, NodeError> {
        let (Some(url), Some(api_key)) =
            (self.config.completions_url(), self.config.api_key.as_deref())
        else {
            return Err(NodeError::ExecutionFailed(
                "Azure OpenAI is not configured".to_string(),
            ));
        };
        
        let body = json!({
            "messages": [{"role": "system", "content": system_prompt}],
            "temperature": 0.1,
        });
        let request = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&body)
            .send();
        
        let sent = tokio::select! {
            _ = cancellation.cancelled() => return Err(NodeError::Cancelled),
            sent = request => sent,
        };
        let response = sent
            .and_then(|r| r.error_for_status())
            .map_err(|e| NodeError::ExecutionFailed(format!("Chat request failed: {}", e)))?;
        
        let payload: Value = response
            .json()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Invalid chat response: {}", e)))?;
        
        Ok(payload
            .get_path("choices.0.message.content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

/// Canned response used when no model is reachable
fn mock_response(state: &RunState) -> String {
    let name = state
        .lookup("payload.customer_name")
        .filter(|v| v.is_truthy())
        .map(ValueExt::to_text)
        .unwrap_or_else(|| "there".to_string());
    json!({
        "message": format!(
            "Welcome, {name}! We're so glad to have you here. If you need anything, just let us know!"
        )
    })
    .to_string()
}

#[async_trait]
impl Node for ChatNode {
    fn node_type(&self) -> &str {
        "action.chat"
    }
    
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let system_prompt = ctx
            .config_value("system_prompt")
            .filter(|v| v.is_truthy())
            .map(ValueExt::to_text)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        
        ctx.events.info("Generating response");
        let text = match self.complete(&system_prompt, &ctx.cancellation).await {
            Ok(text) => text,
            Err(NodeError::Cancelled) => return Err(NodeError::Cancelled),
            Err(e) => {
                tracing::warn!("Chat completion unavailable, using mock: {}", e);
                ctx.events.warn(format!("Using mock response: {}", e));
                mock_response(ctx.state)
            }
        };
        
        let parsed = parse_json_from_text(&text);
        let message = extract_message(&parsed)
            .filter(|m| !m.is_empty())
            .unwrap_or(&text)
            .to_string();
        
        Ok(NodeOutput::new()
            .with_output("generated_response", parsed)
            .with_output("generated_message", message)
            .with_output("raw_text", text)
            .with_port("success"))
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Generate a response with a chat model".to_string(),
            category: "action".to_string(),
            config: vec![ConfigField::optional(
                "system_prompt",
                "System prompt sent to the model",
            )],
            ports: vec!["success".to_string()],
        }
    }
}
