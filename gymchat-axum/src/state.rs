use std::sync::Arc;

use gymchat_auth::ChatAuthService;

/// Router state: the chat service, shared by every handler.
#[derive(Clone)]
pub struct ChatAxumState {
    pub service: Arc<ChatAuthService>,
}

impl ChatAxumState {
    pub fn new(service: ChatAuthService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
