use crate::error::PushError;
use crate::push::dispatch::PushRequest;

/// Delivers one encrypted, signed message to one push endpoint.
pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), PushError>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, request: &'a PushRequest) -> Self::Fut<'a>;
}
