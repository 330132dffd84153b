//! In-memory channel used by the unit tests.

use crate::error::{BridgeError, BridgeResult};
use crate::frame::CorrelationId;
use crate::transport::{ChannelTransport, Frame, FramePosition};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = Box<dyn Fn(&CorrelationId, &str) -> Vec<String> + Send + Sync>;

/// Append-only log with numeric positions. A responder may append reply
/// frames whenever a command frame is sent.
pub(crate) struct MemoryChannel {
    frames: Mutex<Vec<Frame>>,
    responder: Option<Responder>,
    fail_sends: bool,
    send_delay: Duration,
    failing_polls: AtomicUsize,
    polls: AtomicUsize,
}

impl MemoryChannel {
    pub(crate) fn silent() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            responder: None,
            fail_sends: false,
            send_delay: Duration::ZERO,
            failing_polls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn responding<F>(responder: F) -> Self
    where
        F: Fn(&CorrelationId, &str) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::silent()
        }
    }

    /// Replies with a decodable success frame to every command.
    pub(crate) fn echoing() -> Self {
        Self::responding(|id, _| {
            vec![format!(
                "✅ MCP_RESPONSE [{id}]: ```json\n{{\"status\": \"success\", \"message\": \"ok\"}}\n```"
            )]
        })
    }

    pub(crate) fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::silent()
        }
    }

    /// Every send takes `delay` before the frame lands.
    pub(crate) fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub(crate) fn with_failing_polls(self, count: usize) -> Self {
        self.failing_polls.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn push(&self, text: impl Into<String>) -> FramePosition {
        let mut frames = self.frames.lock().unwrap();
        let position = FramePosition::new((frames.len() + 1).to_string());
        frames.push(Frame {
            position: position.clone(),
            text: text.into(),
        });
        position
    }

    /// Texts of every command frame sent through the channel.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.text.contains("MCP_COMMAND ["))
            .map(|f| f.text.clone())
            .collect()
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

fn request_id_of(text: &str) -> Option<CorrelationId> {
    let start = text.find("MCP_COMMAND [")? + "MCP_COMMAND [".len();
    let end = text[start..].find(']')? + start;
    Some(CorrelationId::new_unchecked(&text[start..end]))
}

#[async_trait]
impl ChannelTransport for MemoryChannel {
    async fn send(&self, text: &str) -> BridgeResult<FramePosition> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self.fail_sends {
            return Err(BridgeError::SendFailed(
                "Discord API Error: 503 - unavailable".into(),
            ));
        }
        let position = self.push(text);
        if let (Some(responder), Some(id)) = (&self.responder, request_id_of(text)) {
            for reply in responder(&id, text) {
                self.push(reply);
            }
        }
        Ok(position)
    }

    async fn list_after(&self, position: &FramePosition, limit: usize) -> BridgeResult<Vec<Frame>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BridgeError::PollFailed("Discord API Error: 502 - bad gateway".into()));
        }
        let after: usize = position.as_str().parse().unwrap_or(0);
        let frames = self.frames.lock().unwrap();
        Ok(frames.iter().skip(after).take(limit).cloned().collect())
    }
}
