use axum::handler::Handler;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::routing::get;
use axum::Router;
use gymchat_auth::ChatAuthService;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::routes::chat_router;
use crate::ChatAxumState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fresh UUID v4 for requests that arrive without an id.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

#[derive(Clone)]
pub struct AxumApp {
    pub state: ChatAxumState,
    router: Router<()>,
}

impl AxumApp {
    /// An app serving the chat endpoints for `service`.
    pub fn new(service: ChatAuthService) -> Self {
        let state = ChatAxumState::new(service);
        Self {
            router: chat_router(state.clone()),
            state,
        }
    }

    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// The routes with request-id and trace layers applied.
    pub fn router(&self) -> Router<()> {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);
        self.router
            .clone()
            .layer(PropagateRequestIdLayer::new(header.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(header, MakeRequestUuidV4))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = ?listener.local_addr().ok(), "gymchat listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

pub fn axum(service: ChatAuthService) -> AxumApp {
    AxumApp::new(service)
}
