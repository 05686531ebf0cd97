//! Access-point and Wi-Fi client settings of the host.

use shared::{
    domain::Ssid,
    protocol::{InterfaceMap, WifiNetworksResponse},
};
use thiserror::Error;
use tracing::info;

use crate::{service::ServiceError, Controller};

#[derive(Debug, Error)]
pub enum WifiError {
    #[error("SSID must not be empty")]
    EmptySsid,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

fn normalize_ssid(raw: &str) -> Result<Ssid, WifiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WifiError::EmptySsid);
    }
    Ok(Ssid::new(trimmed))
}

impl Controller {
    pub async fn access_point_ssid(&self) -> Result<Ssid, WifiError> {
        Ok(self.service.access_point_ssid().await?)
    }

    /// Renames the host's access point; returns the SSID the service applied.
    pub async fn set_access_point_ssid(&self, raw: &str) -> Result<Ssid, WifiError> {
        let ssid = normalize_ssid(raw)?;
        let applied = self.service.set_access_point_ssid(&ssid).await?;
        info!(ssid = %applied, "access point renamed");
        Ok(applied)
    }

    /// Networks visible to the client interface. `has_wifi` is false when the
    /// host has no client-capable interface.
    pub async fn scan_wifi_networks(&self) -> Result<WifiNetworksResponse, WifiError> {
        Ok(self.service.wifi_networks().await?)
    }

    pub async fn connect_wifi(&self, raw: &str) -> Result<Ssid, WifiError> {
        let ssid = normalize_ssid(raw)?;
        self.service.connect_wifi(&ssid).await?;
        info!(%ssid, "wifi client connect requested");
        Ok(ssid)
    }

    pub async fn wifi_interfaces(&self) -> Result<InterfaceMap, WifiError> {
        Ok(self.service.wifi_interfaces().await?)
    }
}
