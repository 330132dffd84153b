//! Command dispatch: frame a command, send it, wait for the correlated reply.

use crate::action::resolve;
use crate::config::CorrelationConfig;
use crate::error::BridgeError;
use crate::frame::{CommandEnvelope, CorrelationId};
use crate::response::ResponseResult;
use crate::transport::{ChannelTransport, FramePosition};
use crate::waiter::ResponseWaiter;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Sends robot commands over a channel and awaits their replies.
///
/// Commands are strictly one at a time per call; concurrent callers each
/// get their own correlation id and never see each other's replies.
pub struct CommandDispatcher<T: ChannelTransport> {
    transport: Arc<T>,
    waiter: ResponseWaiter,
    config: CorrelationConfig,
}

impl<T: ChannelTransport> Clone for CommandDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            waiter: self.waiter.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: ChannelTransport> CommandDispatcher<T> {
    pub fn new(transport: Arc<T>, config: CorrelationConfig) -> Self {
        Self {
            transport,
            waiter: ResponseWaiter::from_config(&config),
            config,
        }
    }

    pub fn with_defaults(transport: Arc<T>) -> Self {
        Self::new(transport, CorrelationConfig::default())
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Resolve an action by name and dispatch it.
    ///
    /// Resolution failures (unknown action, bad parameter value) return an
    /// error result without touching the channel.
    pub async fn execute(&self, action_name: &str, parameters: &Map<String, Value>) -> ResponseResult {
        match resolve(action_name, parameters) {
            Ok(resolved) => self.dispatch(resolved.capability_id, resolved.arguments).await,
            Err(e) => {
                debug!(action = action_name, error = %e, "Action rejected before dispatch");
                ResponseResult::error(e)
            }
        }
    }

    /// Send one command frame and wait for its reply.
    ///
    /// The reply budget (`command_timeout`) starts once the frame is posted,
    /// so a slow send never shortens it. A failed send is terminal: nothing
    /// is awaited and nothing is retried.
    pub async fn dispatch(&self, capability_id: &str, arguments: Map<String, Value>) -> ResponseResult {
        let (request_id, sent_at) = match self.send_command(capability_id, arguments).await {
            Ok(sent) => sent,
            Err(e) => return ResponseResult::error(e),
        };
        let deadline = Instant::now() + self.config.command_timeout;
        self.await_reply(&request_id, sent_at, deadline).await
    }

    /// Like [`dispatch`](Self::dispatch), but stop waiting at a caller-chosen
    /// `deadline` instead of the configured timeout.
    ///
    /// Only the local wait ends there; the robot may still run the command.
    pub async fn dispatch_until(
        &self,
        capability_id: &str,
        arguments: Map<String, Value>,
        deadline: Instant,
    ) -> ResponseResult {
        match self.send_command(capability_id, arguments).await {
            Ok((request_id, sent_at)) => self.await_reply(&request_id, sent_at, deadline).await,
            Err(e) => ResponseResult::error(e),
        }
    }

    async fn await_reply(
        &self,
        request_id: &CorrelationId,
        sent_at: FramePosition,
        deadline: Instant,
    ) -> ResponseResult {
        match self
            .waiter
            .wait(self.transport.as_ref(), request_id, sent_at, deadline)
            .await
        {
            timeout @ ResponseResult::Timeout { .. } => timeout,
            result if result.is_success() => {
                info!(request_id = %request_id, "Command completed");
                result
            }
            result => {
                warn!(request_id = %request_id, "Command failed remotely");
                result
            }
        }
    }

    async fn send_command(
        &self,
        capability_id: &str,
        arguments: Map<String, Value>,
    ) -> Result<(CorrelationId, FramePosition), BridgeError> {
        let request_id = CorrelationId::generate();
        let envelope = CommandEnvelope::new(capability_id, arguments, request_id.clone());
        let text = envelope.to_frame_text()?;

        info!(request_id = %request_id, tool = capability_id, "Sending command");
        let sent_at = self.transport.send(&text).await.inspect_err(|e| {
            warn!(request_id = %request_id, error = %e, "Command send failed");
        })?;
        debug!(request_id = %request_id, position = %sent_at, "Command frame posted");
        Ok((request_id, sent_at))
    }
}
