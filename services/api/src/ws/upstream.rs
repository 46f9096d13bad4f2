//! Client → backend: classifies client messages and feeds the ingress queue.

use super::{
    error::RelayError,
    protocol::{ClientFrame, decode_text_message},
};
use futures_util::{Stream, StreamExt};
use mission_core::{IngressQueue, MediaFrame};
use tracing::{debug, info, warn};

/// Counters reported when the read loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamStats {
    pub frames: usize,
    pub dropped: usize,
}

/// Reads client messages until the connection closes, pushing one frame per
/// valid message in arrival order.
///
/// A close message or the end of the stream is a clean exit. Malformed text
/// messages are dropped without ending the session.
pub async fn run_upstream<S>(
    mut client: S,
    queue: IngressQueue,
    depth_warning: usize,
) -> Result<UpstreamStats, RelayError>
where
    S: Stream<Item = Result<ClientFrame, RelayError>> + Unpin,
{
    let mut stats = UpstreamStats::default();
    let mut depth_alarm = DepthAlarm::new(depth_warning);

    while let Some(message) = client.next().await {
        let frame = match message? {
            ClientFrame::Closed => {
                info!("Client sent close frame.");
                break;
            }
            ClientFrame::Binary(data) => MediaFrame::binary_audio(data),
            ClientFrame::Text(text) => match decode_text_message(&text) {
                Some(frame) => frame,
                None => {
                    stats.dropped += 1;
                    debug!(len = text.len(), "Dropping malformed client message.");
                    continue;
                }
            },
        };

        if let Some(text) = frame.as_text() {
            info!("User says: {}", text);
        }
        let depth = queue.push(frame)?;
        stats.frames += 1;
        depth_alarm.observe(depth);
    }

    debug!(frames = stats.frames, dropped = stats.dropped, "Upstream loop finished.");
    Ok(stats)
}

/// Warns once each time the queue depth climbs past the threshold.
struct DepthAlarm {
    threshold: usize,
    raised: bool,
}

impl DepthAlarm {
    fn new(threshold: usize) -> Self {
        Self {
            threshold,
            raised: false,
        }
    }

    fn observe(&mut self, depth: usize) -> bool {
        if self.threshold == 0 {
            return false;
        }
        if !self.raised && depth >= self.threshold {
            warn!(depth, threshold = self.threshold, "Ingress queue is backing up.");
            self.raised = true;
            return true;
        }
        if self.raised && depth < self.threshold / 2 {
            self.raised = false;
        }
        false
    }
}
