//! HTTP client for the traffic simulation server.

use reqwest::{Client, Response};

use super::error::FetchError;
use super::wire::{parse_positions, AgentRecord, ObstacleRecord, SignalRecord};
use crate::engine::snapshot::{AgentSnapshot, ObstacleSnapshot, SignalSnapshot};

pub const INIT_ENDPOINT: &str = "/init";
pub const UPDATE_ENDPOINT: &str = "/update";
pub const AGENTS_ENDPOINT: &str = "/getAgents";
pub const SIGNALS_ENDPOINT: &str = "/getSemaphores";
pub const OBSTACLES_ENDPOINT: &str = "/getObstacles";

/// Form field carrying the requested car count in the `/init` handshake.
pub const MAX_CARS_FIELD: &str = "numero_coches_max";

/// Thin wrapper over one `reqwest::Client` bound to the server base URL.
#[derive(Clone)]
pub struct SimClient {
    http: Client,
    base_url: String,
}

impl SimClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: Client::new(), base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Configuration handshake: `POST /init` with the requested car count.
    pub async fn init(&self, max_cars: u32) -> Result<(), FetchError> {
        let max_cars = max_cars.to_string();
        let form = [(MAX_CARS_FIELD, max_cars.as_str())];

        log_request("POST", INIT_ENDPOINT);
        let response = self
            .http
            .post(self.url(INIT_ENDPOINT))
            .form(&form)
            .send()
            .await?;
        check_status(INIT_ENDPOINT, response)?;
        Ok(())
    }

    /// Advance the simulation by one tick (`GET /update`).
    pub async fn step(&self) -> Result<(), FetchError> {
        self.get(UPDATE_ENDPOINT).await?;
        Ok(())
    }

    pub async fn agents(&self) -> Result<Vec<AgentSnapshot>, FetchError> {
        let body = self.get_text(AGENTS_ENDPOINT).await?;
        parse_positions::<AgentRecord, _>(&body)
            .map_err(|source| FetchError::Malformed { endpoint: AGENTS_ENDPOINT, source })
    }

    pub async fn signals(&self) -> Result<Vec<SignalSnapshot>, FetchError> {
        let body = self.get_text(SIGNALS_ENDPOINT).await?;
        parse_positions::<SignalRecord, _>(&body)
            .map_err(|source| FetchError::Malformed { endpoint: SIGNALS_ENDPOINT, source })
    }

    pub async fn obstacles(&self) -> Result<Vec<ObstacleSnapshot>, FetchError> {
        let body = self.get_text(OBSTACLES_ENDPOINT).await?;
        parse_positions::<ObstacleRecord, _>(&body)
            .map_err(|source| FetchError::Malformed { endpoint: OBSTACLES_ENDPOINT, source })
    }

    async fn get(&self, endpoint: &'static str) -> Result<Response, FetchError> {
        log_request("GET", endpoint);
        let response = self.http.get(self.url(endpoint)).send().await?;
        check_status(endpoint, response)
    }

    async fn get_text(&self, endpoint: &'static str) -> Result<String, FetchError> {
        Ok(self.get(endpoint).await?.text().await?)
    }
}

fn log_request(method: &str, endpoint: &str) {
    log::trace!("{} {}", method, endpoint);
}

fn check_status(endpoint: &'static str, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status { endpoint, status })
    }
}
