//! Shared application state handed to every component.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::fetch::MetadataSource;
use crate::queue::WorkQueue;
use crate::slack::client::ReplySink;

/// Process-wide handles. Everything here is immutable or internally
/// synchronized, so one instance is shared by all invocations.
pub struct AppState {
    /// Global configuration, including the tenant registry.
    pub config: Arc<GlobalConfig>,
    /// Queue work items are sent to.
    pub queue: Arc<dyn WorkQueue>,
    /// Content fetcher.
    pub source: Arc<dyn MetadataSource>,
    /// Outbound Slack poster.
    pub sink: Arc<dyn ReplySink>,
}
