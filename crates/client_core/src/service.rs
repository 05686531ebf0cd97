//! Contract of the remote device-management service and its HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Device, DeviceInfo, Filter, Mac, Ssid},
    protocol::{
        ActionResponse, DeviceListResponse, InterfaceMap, MacRequest, ScanCommand,
        ScanStatusResponse, SsidPayload, TestAudioRequest, WifiNetworksResponse,
    },
};
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEVICES_ROUTE: &str = "api/devices";
const INFO_ROUTE: &str = "api/info";
const SCAN_STATUS_ROUTE: &str = "api/scan_status";
const CONNECT_ROUTE: &str = "api/connect";
const DISCONNECT_ROUTE: &str = "api/disconnect";
const FORGET_ROUTE: &str = "api/forget";
const TEST_AUDIO_ROUTE: &str = "api/test_audio";
const ACCESS_POINT_ROUTE: &str = "api/ap";
const WIFI_LIST_ROUTE: &str = "api/wifi/list";
const WIFI_CONNECT_ROUTE: &str = "api/wifi/connect";
const WIFI_INFO_ROUTE: &str = "api/wifi/info";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid service url for {route}: {source}")]
    Url {
        route: &'static str,
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("request to /{route} failed: {source}")]
    Transport {
        route: &'static str,
        source: reqwest::Error,
    },
    #[error("/{route} returned HTTP {status}")]
    Status {
        route: &'static str,
        status: StatusCode,
    },
    #[error("failed to decode /{route} response: {source}")]
    Decode {
        route: &'static str,
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait RemoteDeviceService: Send + Sync {
    async fn list_devices(&self, filter: Filter) -> Result<Vec<Device>, ServiceError>;
    async fn device_info(&self, mac: &Mac) -> Result<DeviceInfo, ServiceError>;
    async fn scan_status(&self) -> Result<ScanStatusResponse, ServiceError>;
    async fn set_scan(&self, command: ScanCommand) -> Result<(), ServiceError>;
    async fn connect(&self, mac: &Mac) -> Result<ActionResponse, ServiceError>;
    async fn disconnect(&self, mac: &Mac) -> Result<ActionResponse, ServiceError>;
    async fn forget(&self, mac: &Mac) -> Result<ActionResponse, ServiceError>;
    async fn test_audio(&self, mac: Option<&Mac>) -> Result<ActionResponse, ServiceError>;
    async fn access_point_ssid(&self) -> Result<Ssid, ServiceError>;
    async fn set_access_point_ssid(&self, ssid: &Ssid) -> Result<Ssid, ServiceError>;
    async fn wifi_networks(&self) -> Result<WifiNetworksResponse, ServiceError>;
    async fn connect_wifi(&self, ssid: &Ssid) -> Result<(), ServiceError>;
    async fn wifi_interfaces(&self) -> Result<InterfaceMap, ServiceError>;
}

pub struct HttpDeviceService {
    http: Client,
    base: Url,
}

impl HttpDeviceService {
    pub fn new(base: Url) -> Self {
        Self {
            http: Client::new(),
            base: with_trailing_slash(base),
        }
    }

    /// Builds a client whose requests give up after `timeout`. `None` waits
    /// for as long as the transport allows.
    pub fn with_timeout(base: Url, timeout: Option<Duration>) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build().map_err(ServiceError::Client)?,
            base: with_trailing_slash(base),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, route: &'static str) -> Result<Url, ServiceError> {
        self.base
            .join(route)
            .map_err(|source| ServiceError::Url { route, source })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        route: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, ServiceError> {
        let response = self
            .http
            .get(self.endpoint(route)?)
            .query(query)
            .send()
            .await
            .map_err(|source| ServiceError::Transport { route, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status { route, status });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| ServiceError::Transport { route, source })?;
        serde_json::from_slice(&body).map_err(|source| ServiceError::Decode { route, source })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        route: &'static str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ServiceError> {
        let mut request = self.http.post(self.endpoint(route)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        debug!(route, "dispatching device service request");
        request
            .send()
            .await
            .map_err(|source| ServiceError::Transport { route, source })
    }

    async fn post_action<B: Serialize + ?Sized>(
        &self,
        route: &'static str,
        body: &B,
    ) -> Result<ActionResponse, ServiceError> {
        let response = self.post_json(route, Some(body)).await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ServiceError::Transport { route, source })?;
        // A failed action still answers with `{ok, log, stage}`, often under a 5xx status.
        match serde_json::from_slice::<ActionResponse>(&bytes) {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(ServiceError::Status { route, status }),
            Err(source) => Err(ServiceError::Decode { route, source }),
        }
    }

    async fn post_expect_success<B: Serialize + ?Sized>(
        &self,
        route: &'static str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = self.post_json(route, body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status { route, status });
        }
        Ok(response)
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl RemoteDeviceService for HttpDeviceService {
    async fn list_devices(&self, filter: Filter) -> Result<Vec<Device>, ServiceError> {
        let body: DeviceListResponse = self
            .get_json(DEVICES_ROUTE, &[("audio_only", filter.query_value())])
            .await?;
        Ok(body.devices)
    }

    async fn device_info(&self, mac: &Mac) -> Result<DeviceInfo, ServiceError> {
        self.get_json(INFO_ROUTE, &[("mac", mac.as_str())]).await
    }

    async fn scan_status(&self) -> Result<ScanStatusResponse, ServiceError> {
        self.get_json(SCAN_STATUS_ROUTE, &[]).await
    }

    async fn set_scan(&self, command: ScanCommand) -> Result<(), ServiceError> {
        self.post_expect_success::<()>(command.route(), None)
            .await
            .map(|_| ())
    }

    async fn connect(&self, mac: &Mac) -> Result<ActionResponse, ServiceError> {
        self.post_action(CONNECT_ROUTE, &MacRequest { mac: mac.clone() })
            .await
    }

    async fn disconnect(&self, mac: &Mac) -> Result<ActionResponse, ServiceError> {
        self.post_action(DISCONNECT_ROUTE, &MacRequest { mac: mac.clone() })
            .await
    }

    async fn forget(&self, mac: &Mac) -> Result<ActionResponse, ServiceError> {
        self.post_action(FORGET_ROUTE, &MacRequest { mac: mac.clone() })
            .await
    }

    async fn test_audio(&self, mac: Option<&Mac>) -> Result<ActionResponse, ServiceError> {
        self.post_action(
            TEST_AUDIO_ROUTE,
            &TestAudioRequest {
                mac: mac.cloned(),
            },
        )
        .await
    }

    async fn access_point_ssid(&self) -> Result<Ssid, ServiceError> {
        let body: SsidPayload = self.get_json(ACCESS_POINT_ROUTE, &[]).await?;
        Ok(body.ssid)
    }

    async fn set_access_point_ssid(&self, ssid: &Ssid) -> Result<Ssid, ServiceError> {
        let route = ACCESS_POINT_ROUTE;
        let response = self
            .post_expect_success(route, Some(&SsidPayload { ssid: ssid.clone() }))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ServiceError::Transport { route, source })?;
        let body: SsidPayload =
            serde_json::from_slice(&bytes).map_err(|source| ServiceError::Decode { route, source })?;
        Ok(body.ssid)
    }

    async fn wifi_networks(&self) -> Result<WifiNetworksResponse, ServiceError> {
        self.get_json(WIFI_LIST_ROUTE, &[]).await
    }

    async fn connect_wifi(&self, ssid: &Ssid) -> Result<(), ServiceError> {
        self.post_expect_success(WIFI_CONNECT_ROUTE, Some(&SsidPayload { ssid: ssid.clone() }))
            .await
            .map(|_| ())
    }

    async fn wifi_interfaces(&self) -> Result<InterfaceMap, ServiceError> {
        self.get_json(WIFI_INFO_ROUTE, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_below_base_path() {
        let service = HttpDeviceService::new(Url::parse("http://pi.local:5000/bt").expect("url"));
        assert_eq!(
            service.endpoint(DEVICES_ROUTE).expect("endpoint").as_str(),
            "http://pi.local:5000/bt/api/devices"
        );

        let service = HttpDeviceService::new(Url::parse("http://pi.local:5000").expect("url"));
        assert_eq!(
            service.endpoint(ScanCommand::On.route()).expect("endpoint").as_str(),
            "http://pi.local:5000/api/scan_on"
        );
    }

    #[test]
    fn transport_errors_name_the_route() {
        let err = ServiceError::Status {
            route: CONNECT_ROUTE,
            status: StatusCode::BAD_GATEWAY,
        };
        assert_eq!(err.to_string(), "/api/connect returned HTTP 502 Bad Gateway");
    }
}
