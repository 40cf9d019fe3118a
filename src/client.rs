use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::cache::IdentityLookup;
use crate::error::LookupError;
use crate::models::domain::Endpoint;
use crate::models::dto::EndpointDTO;

/// Blocking client for the agent's endpoint API.
#[derive(Clone)]
pub struct AgentClient {
    http: Client,
    host: String,
}

impl AgentClient {
    pub fn new(host: &str) -> Result<Self, LookupError> {
        let http = Client::builder().build()?;
        Ok(Self { http, host: host.trim_end_matches('/').to_string() })
    }

    pub fn endpoint_url(&self, id: &str) -> String {
        format!("{}/v1/endpoint/{}", self.host, id)
    }
}

impl IdentityLookup for AgentClient {
    fn endpoint_get(&self, id: &str) -> Result<Endpoint, LookupError> {
        let response = self.http.get(self.endpoint_url(id)).send()?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(LookupError::NotFound { id: id.to_string() }),
            status if !status.is_success() => {
                return Err(LookupError::Status { id: id.to_string(), status: status.as_u16() })
            }
            _ => {}
        }

        let body = response.text()?;
        let endpoint: EndpointDTO = serde_json::from_str(&body)?;
        Ok(endpoint.into())
    }
}
