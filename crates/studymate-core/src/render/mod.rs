use tracing::{debug, warn};
use uuid::Uuid;

use crate::conversation::Message;

/// One render slot, unique per (message id, diagram index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub message_id: Uuid,
    pub index: usize,
}

impl RenderTarget {
    pub fn element_id(&self) -> String {
        format!("diagram-{}-{}", self.message_id, self.index)
    }
}

/// Boundary to the external diagram-to-pixels service. Implementations must
/// be idempotent — re-invoking with the same target and source is an
/// overwrite or a no-op, never an error — and must not crash the host on a
/// bad description.
pub trait DiagramRenderer: Send + Sync {
    /// Hand diagram source to the rendering service for the given target.
    fn render(&self, target: &RenderTarget, source: &str);
}

/// Renderer that logs and discards; the headless default.
pub struct NullRenderer;

impl DiagramRenderer for NullRenderer {
    fn render(&self, target: &RenderTarget, _source: &str) {
        debug!(target = %target.element_id(), "no renderer attached, diagram dropped");
    }
}

/// Best-effort render pass over a message's diagrams. Malformed descriptions
/// are skipped and logged; the pass itself never fails and the message text
/// is displayed regardless.
pub fn render_message(renderer: &dyn DiagramRenderer, message: &Message) {
    for (index, diagram) in message.diagrams.iter().enumerate() {
        let target = RenderTarget {
            message_id: message.id,
            index,
        };
        match diagram.validate() {
            Ok(()) => renderer.render(&target, &diagram.render_source()),
            Err(reason) => {
                warn!(target = %target.element_id(), "skipping malformed diagram: {reason}");
            }
        }
    }
}
