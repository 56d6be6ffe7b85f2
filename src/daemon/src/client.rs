use std::time::Duration;

use nshide_common::{AddOutcome, RemoveOutcome};
pub use reqwest::Result;

use crate::handlers::add::ADD_ENDPOINT;
use crate::handlers::disable::DISABLE_ENDPOINT;
use crate::handlers::enable::ENABLE_ENDPOINT;
use crate::handlers::info::INFO_ENDPOINT;
use crate::handlers::list::LIST_ENDPOINT;
use crate::handlers::remove::REMOVE_ENDPOINT;
use crate::handlers::terminate::TERMINATE_ENDPOINT;
use crate::service::EnableOutcome;
use crate::structs::{DisableResponse, InfoResponse, ListResponse, NameRequest};

pub struct DaemonClient {
    base_uri: String,
    pub client: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_uri: impl Into<String>) -> Result<Self> {
        // disable waits for the monitor teardown, which is bounded by the handoff timeout
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_uri: base_uri.into(),
            client,
        })
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    pub async fn send_enable_request(&self) -> Result<EnableOutcome> {
        self.client
            .post(self.get_url(ENABLE_ENDPOINT))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_disable_request(&self) -> Result<DisableResponse> {
        self.client
            .post(self.get_url(DISABLE_ENDPOINT))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_add_request(&self, name: &str) -> Result<AddOutcome> {
        self.client
            .post(self.get_url(ADD_ENDPOINT))
            .json(&NameRequest {
                name: name.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_remove_request(&self, name: &str) -> Result<RemoveOutcome> {
        self.client
            .post(self.get_url(REMOVE_ENDPOINT))
            .json(&NameRequest {
                name: name.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_list_request(&self) -> Result<ListResponse> {
        self.client
            .get(self.get_url(LIST_ENDPOINT))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_info_request(&self) -> Result<InfoResponse> {
        self.client
            .get(self.get_url(INFO_ENDPOINT))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    pub async fn send_terminate_request(&self) -> Result<()> {
        self.client
            .post(self.get_url(TERMINATE_ENDPOINT))
            .send()
            .await?
            .error_for_status()
            .map(|_| ())
    }
}
