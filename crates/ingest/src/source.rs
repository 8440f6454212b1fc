use {async_trait::async_trait, futures::stream::BoxStream};

use crate::Result;

/// Lines of console output, in emission order.
pub type LineStream = BoxStream<'static, Result<String>>;

/// Locates the running game-server instance and follows its console output.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Resolve the current instance for `selector`.
    async fn resolve(&self, selector: &str) -> Result<String>;

    /// Follow `instance`'s output. The stream ends when the remote side closes.
    async fn stream_output(&self, instance: &str) -> Result<LineStream>;

    /// Namespace or scope the source resolves within, used in logs.
    fn scope(&self) -> &str {
        ""
    }
}
