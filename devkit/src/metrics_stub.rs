/*!
Serveurs mock pour développer sans serveur de jeu

- `MockMetricsServer` : sert un corps exposition-format sur `/metrics`, avec
  statut HTTP et latence configurables à chaud
- `MockGamePort` : listener TCP qui accepte et ferme, compte les connexions
- `closed_port()` : un port local sur lequel personne n'écoute
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct StubResponse {
    status: u16,
    body: String,
    delay: Duration,
}

#[derive(Clone)]
struct StubState {
    response: Arc<Mutex<StubResponse>>,
    requests: Arc<AtomicUsize>,
}

/// Exporter `/metrics` factice sur 127.0.0.1, port éphémère
pub struct MockMetricsServer {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl MockMetricsServer {
    /// Démarre le serveur avec un corps initial (statut 200)
    pub async fn start<S: Into<String>>(body: S) -> Result<Self> {
        let state = StubState {
            response: Arc::new(Mutex::new(StubResponse {
                status: 200,
                body: body.into(),
                delay: Duration::ZERO,
            })),
            requests: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/metrics", get(serve_metrics))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ [MOCK] metrics server stopped: {}", e);
            }
        });

        log::info!("📈 [MOCK] metrics endpoint at http://{}/metrics", addr);
        Ok(Self { addr, state, task })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("http://{}/metrics", self.addr)
    }

    /// Remplace le corps servi
    pub fn set_body<S: Into<String>>(&self, body: S) {
        self.state.response.lock().unwrap().body = body.into();
    }

    /// Force un statut HTTP (ex: 500 pour simuler un exporter en panne)
    pub fn set_status(&self, status: u16) {
        self.state.response.lock().unwrap().status = status;
    }

    /// Ajoute une latence avant chaque réponse (tests de timeout)
    pub fn set_delay(&self, delay: Duration) {
        self.state.response.lock().unwrap().delay = delay;
    }

    /// Nombre de scrapes reçus
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockMetricsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_metrics(State(state): State<StubState>) -> (StatusCode, String) {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let response = state.response.lock().unwrap().clone();

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body)
}

/// Port de jeu factice : accepte puis ferme chaque connexion
pub struct MockGamePort {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockGamePort {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let connections = Arc::new(AtomicUsize::new(0));

        let counter = connections.clone();
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        counter.fetch_add(1, Ordering::SeqCst);
                        log::debug!("🎮 [MOCK] game port connection from {}", peer);
                        drop(stream);
                    }
                    Err(e) => {
                        log::warn!("⚠️ [MOCK] accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
        });

        Ok(Self { addr, connections, task })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockGamePort {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Réserve un port local puis le libère : plus rien n'écoute dessus
pub fn closed_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn raw_get(port: u16) -> String {
        use tokio::io::AsyncReadExt;

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_body_and_counts_requests() {
        let server = MockMetricsServer::start("minecraft_tps 20\n").await.unwrap();

        let response = raw_get(server.port()).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("minecraft_tps 20\n"));
        assert_eq!(server.request_count(), 1);
        assert!(server.url().ends_with("/metrics"));
    }

    #[tokio::test]
    async fn test_status_can_be_switched() {
        let server = MockMetricsServer::start("").await.unwrap();
        server.set_status(503);

        let response = raw_get(server.port()).await;
        assert!(response.starts_with("HTTP/1.1 503"));
    }

    #[tokio::test]
    async fn test_game_port_counts_connections() {
        let game = MockGamePort::start().await.unwrap();
        let stream = tokio::net::TcpStream::connect(("127.0.0.1", game.port())).await.unwrap();
        drop(stream);

        // laisse la boucle accept tourner
        for _ in 0..20 {
            if game.connection_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(game.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_port_refuses() {
        let port = closed_port().unwrap();
        assert!(tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }
}
