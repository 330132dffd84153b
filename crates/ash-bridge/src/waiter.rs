//! Reply polling.
//!
//! Replies come back on the same channel as the commands, interleaved with
//! unrelated chatter. The waiter reads forward from the command frame until
//! a frame carrying the command's correlation marker shows up or the
//! deadline passes.

use crate::config::CorrelationConfig;
use crate::frame::{CorrelationId, classify_reply};
use crate::response::ResponseResult;
use crate::transport::{ChannelTransport, FramePosition};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Polls a channel for the reply to one command.
#[derive(Debug, Clone)]
pub struct ResponseWaiter {
    poll_interval: Duration,
    page_size: usize,
}

impl ResponseWaiter {
    pub fn new(poll_interval: Duration, page_size: usize) -> Self {
        Self {
            poll_interval,
            page_size: page_size.clamp(1, 100),
        }
    }

    pub fn from_config(config: &CorrelationConfig) -> Self {
        Self::new(config.poll_interval, config.page_size)
    }

    /// Wait for the reply to `request_id`, reading frames after `after`.
    ///
    /// Failed polls are logged and retried until `deadline`. Frames are only
    /// ever read forward: the cursor moves to the newest frame seen, so no
    /// frame is examined twice. A full page is followed by an immediate
    /// re-poll instead of a pause.
    pub async fn wait<T>(
        &self,
        transport: &T,
        request_id: &CorrelationId,
        after: FramePosition,
        deadline: Instant,
    ) -> ResponseResult
    where
        T: ChannelTransport + ?Sized,
    {
        let started = Instant::now();
        let mut cursor = after;
        let mut drain = false;

        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    request_id = %request_id,
                    "No reply within {:?}",
                    deadline.saturating_duration_since(started)
                );
                return ResponseResult::Timeout {
                    waited: now.saturating_duration_since(started),
                };
            }

            let remaining = deadline - now;
            if !drain {
                tokio::time::sleep(self.poll_interval.min(remaining)).await;
            }

            let budget = deadline
                .saturating_duration_since(Instant::now())
                .max(self.poll_interval);
            let frames = match tokio::time::timeout(
                budget,
                transport.list_after(&cursor, self.page_size),
            )
            .await
            {
                Ok(Ok(frames)) => frames,
                Ok(Err(e)) => {
                    warn!(request_id = %request_id, error = %e, "Poll failed, retrying");
                    drain = false;
                    continue;
                }
                Err(_) => {
                    warn!(request_id = %request_id, "Poll did not complete within {:?}", budget);
                    drain = false;
                    continue;
                }
            };

            drain = frames.len() >= self.page_size;

            for frame in &frames {
                if let Some(reply) = classify_reply(&frame.text, request_id) {
                    debug!(request_id = %request_id, position = %frame.position, "Matched reply");
                    return reply.into();
                }
            }

            if let Some(last) = frames.last() {
                cursor = last.position.clone();
            }
        }
    }
}
