//! Search-index notifications fired after a transaction commits
//!
//! One low-level event per kind of change. The engine never waits on the
//! sink and never learns whether it succeeded.

use crate::graph::{ElementId, ShareLevel};

/// A change that an external search index may want to mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// Element created or its indexed content changed
    Upserted { id: ElementId },
    /// Element deleted (including cascades and merges)
    Removed { id: ElementId },
    /// Visibility changed; the index must re-filter who can find it
    ShareLevelChanged { id: ElementId, level: ShareLevel },
    /// Label or comment edited
    LabelChanged { id: ElementId },
    /// Tag set attached to the element changed
    TagsChanged { id: ElementId },
}

impl IndexEvent {
    pub fn id(&self) -> &ElementId {
        match self {
            Self::Upserted { id }
            | Self::Removed { id }
            | Self::ShareLevelChanged { id, .. }
            | Self::LabelChanged { id }
            | Self::TagsChanged { id } => id,
        }
    }
}

/// Receiver of committed changes
pub trait SearchIndexSink: Send + Sync {
    fn notify(&self, event: &IndexEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndexSink;

impl SearchIndexSink for NoopIndexSink {
    fn notify(&self, _event: &IndexEvent) {}
}

/// Sink that logs every event at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingIndexSink;

impl SearchIndexSink for TracingIndexSink {
    fn notify(&self, event: &IndexEvent) {
        tracing::debug!(?event, "index notification");
    }
}
