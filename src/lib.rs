pub mod config;
pub mod error;
pub mod graph;
pub mod report;
pub mod routes;
pub mod telemetry;

pub use config::Config;

use graph::GraphClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub graph: GraphClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let graph = GraphClient::new(&config.login_base_url, &config.graph_base_url);
        Self { config, graph }
    }
}
