use std::net::SocketAddr;
use std::sync::Arc;
use todobin::hub::Hub;
use todobin::server::{AppState, build_router};
use todobin::service::{ListService, ServiceSettings};
use todobin::store::MemoryStore;
use tokio::net::TcpListener;

#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Arc<Hub>,
    pub service: Arc<ListService>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_server(websocket: bool) -> TestServer {
    let service = Arc::new(ListService::new(
        Arc::new(MemoryStore::new()),
        ServiceSettings::default(),
    ));
    let hub = Arc::new(Hub::new(websocket));
    let app = build_router(AppState::new(service.clone(), hub.clone()), 64 * 1024);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    TestServer { addr, hub, service }
}
