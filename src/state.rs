use crate::adapters::MemoryStore;
use crate::push::PushQueue;

#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
    /// `None` while push is disabled.
    pub push: Option<PushQueue>,
}
