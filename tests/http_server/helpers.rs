use std::{net::SocketAddr, sync::Arc};

use reqwest::Client;
use tempfile::TempDir;
use tokio::task;
use tokio_util::sync::CancellationToken;
use vigil::{
    config::RuntimeConfig,
    http_server::{self, ApiState, API_KEY_HEADER},
    loader::ConfigLoader,
    persistence::{
        sqlite::{SqliteEntityRepository, SqliteHeartbeatRepository, SqliteMetricsRepository},
        traits::{EntityRepository, HeartbeatRepository, MetricsRepository},
        SqliteStore,
    },
    probe::{DbSink, ProbeKind, ProbeRegistry, ProcSystemReader},
    scheduler::{DiscardSink, HeartbeatSink, Scheduler},
};

pub const TEST_API_KEY: &str = "test-key";

pub fn test_runtime_config(port: u16) -> RuntimeConfig {
    RuntimeConfig {
        config_path: "unused.json".to_string(),
        api_key: TEST_API_KEY.to_string(),
        port,
        db_path: "unused.db".to_string(),
        log_level: "INFO".to_string(),
        log_format: "text".to_string(),
        log_output: "stdout".to_string(),
        dev_mode: false,
    }
}

/// A full application instance bound to an ephemeral port, with direct
/// repository handles for seeding test data.
pub struct TestApp {
    pub address: SocketAddr,
    pub client: Client,
    pub entities: Arc<dyn EntityRepository>,
    pub heartbeats: Arc<dyn HeartbeatRepository>,
    pub metrics: Arc<dyn MetricsRepository>,
    shutdown: CancellationToken,
    _server_handle: task::JoinHandle<Result<(), std::io::Error>>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("observations.db");
        let store = SqliteStore::new(&format!("sqlite:{}", db_path.display()))
            .await
            .expect("failed to open test db");
        store.run_migrations().await.expect("failed to run migrations");

        let entities: Arc<dyn EntityRepository> =
            Arc::new(SqliteEntityRepository::new(store.pool().clone()));
        let heartbeats: Arc<dyn HeartbeatRepository> =
            Arc::new(SqliteHeartbeatRepository::new(store.pool().clone()));
        let metrics: Arc<dyn MetricsRepository> =
            Arc::new(SqliteMetricsRepository::new(store.pool().clone()));

        let monitor_scheduler = Arc::new(Scheduler::new(
            ProbeKind::Monitor,
            ProbeRegistry::monitors(Client::new()),
            Arc::clone(&entities),
            Arc::new(HeartbeatSink::new(Arc::clone(&heartbeats))),
        ));
        let metric_scheduler = Arc::new(Scheduler::new(
            ProbeKind::Metric,
            ProbeRegistry::metrics(
                Arc::new(DbSink::new(Arc::clone(&metrics))),
                Arc::new(ProcSystemReader),
            ),
            Arc::clone(&entities),
            Arc::new(DiscardSink),
        ));

        let loader = Arc::new(ConfigLoader::new(vec![monitor_scheduler, metric_scheduler]));

        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("failed to bind");
        let address = listener.local_addr().expect("failed to get address");

        let state = ApiState {
            config: Arc::new(test_runtime_config(address.port())),
            loader: Arc::clone(&loader),
            entities: Arc::clone(&entities),
            heartbeats: Arc::clone(&heartbeats),
            metrics: Arc::clone(&metrics),
        };

        let shutdown = CancellationToken::new();
        let server_handle =
            task::spawn(http_server::run_server(listener, state, shutdown.clone()));

        Self {
            address,
            client: Client::new(),
            entities,
            heartbeats,
            metrics,
            shutdown,
            _server_handle: server_handle,
            _db_dir: db_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header(API_KEY_HEADER, TEST_API_KEY)
            .send()
            .await
            .expect("request failed")
    }

    pub async fn get_with_key(&self, path: &str, api_key: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request.send().await.expect("request failed")
    }

    pub async fn post_config(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/v1/config"))
            .header(API_KEY_HEADER, TEST_API_KEY)
            .json(body)
            .send()
            .await
            .expect("request failed")
    }

    pub fn cleanup(self) {
        self.shutdown.cancel();
    }
}
