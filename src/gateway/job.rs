use super::worker::Dispatcher;
use crate::error::WorkspaceError;
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::oneshot;
use tracing::debug;

/// A queued request with its result channel, with the result type erased.
#[async_trait]
pub(crate) trait Job: Send {
    async fn run(self: Box<Self>, dispatcher: &Dispatcher);
}

pub(crate) struct Entry<T, F> {
    pub(crate) request: F,
    pub(crate) reply: oneshot::Sender<Result<T, WorkspaceError>>,
}

#[async_trait]
impl<T, F, Fut> Job for Entry<T, F>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, WorkspaceError>> + Send + 'static,
{
    async fn run(self: Box<Self>, dispatcher: &Dispatcher) {
        let Entry { request, reply } = *self;
        let result = dispatcher.dispatch(request).await;
        if reply.send(result).is_err() {
            debug!("Gateway caller went away before its request settled");
        }
    }
}
