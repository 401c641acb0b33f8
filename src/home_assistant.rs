use rust_decimal::Decimal;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// Minimal Home Assistant REST client, used to read the live value of the
/// entity that feeds a source meter.
#[derive(Clone)]
pub struct HomeAssistantAPI {
    endpoint_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl HomeAssistantAPI {
    pub fn new(endpoint_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn read_sensor(&self, entity_id: &str) -> Result<HASensor, anyhow::Error> {
        if self.endpoint_url.is_empty() {
            anyhow::bail!("No HA connection");
        }
        let result = self
            .client
            .get(format!("{}/api/states/{}", self.endpoint_url, entity_id))
            .bearer_auth(&self.auth_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(result)
    }

    /// Reads an entity state as an exact decimal. States such as
    /// `unavailable` or `unknown` are errors.
    pub async fn read_decimal_state(&self, entity_id: &str) -> Result<Decimal, anyhow::Error> {
        let sensor = self.read_sensor(entity_id).await?;
        sensor.decimal_state()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HASensor {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_updated: String,
}

impl HASensor {
    pub fn decimal_state(&self) -> Result<Decimal, anyhow::Error> {
        let state = self.state.trim();
        Decimal::from_str(state)
            .or_else(|_| Decimal::from_scientific(state))
            .map_err(|e| {
                anyhow::anyhow!(
                    "Sensor {} state '{}' is not a number: {}",
                    self.entity_id,
                    self.state,
                    e
                )
            })
    }
}
