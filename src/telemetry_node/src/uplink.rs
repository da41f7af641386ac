use alloc::string::String;

use cubesat_board::{NetworkError, NetworkServices, SystemServices};

use crate::record::{RecordError, TelemetryRecord};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const DEFAULT_SEND_TIMEOUT_MS: u32 = 5000;

const ASSOCIATION_POLL_MS: u32 = 100;
const ASSOCIATION_RETRY_MS: u32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NetworkFault {
    #[error("timeout")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("dns or association failure")]
    Unresolved,
    #[error("non-success status {0}")]
    NonSuccessStatus(u16),
    #[error("{0}")]
    Encode(RecordError),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<NetworkError> for NetworkFault {
    fn from(error: NetworkError) -> Self {
        match error {
            NetworkError::Timeout => NetworkFault::Timeout,
            NetworkError::ConnectionRefused => NetworkFault::ConnectionRefused,
            NetworkError::Unresolved | NetworkError::NotAssociated => NetworkFault::Unresolved,
            NetworkError::Transport(detail) => NetworkFault::Transport(detail),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Failed(NetworkFault),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Posts one record per call to the collector. Never retries.
pub struct UplinkClient<N: NetworkServices> {
    network: N,
    endpoint: String,
    timeout_ms: u32,
}

impl<N: NetworkServices> UplinkClient<N> {
    pub fn new(network: N, endpoint: &str, timeout_ms: u32) -> Self {
        UplinkClient {
            network,
            endpoint: String::from(endpoint),
            timeout_ms,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn network(&mut self) -> &mut N {
        &mut self.network
    }

    /// Associates with the access point, blocking until the link is up.
    /// There is no timeout.
    pub fn establish_link(&mut self, ssid: &str, secret: &str, system: &mut impl SystemServices) {
        info!("connecting to {}", ssid);
        while let Err(err) = self.network.begin_association(ssid, secret) {
            warn!("association request to {} failed: {}", ssid, err);
            system.delay_ms(ASSOCIATION_RETRY_MS);
        }
        while !self.network.is_connected() {
            system.delay_ms(ASSOCIATION_POLL_MS);
        }
        info!("connected to {}", ssid);
    }

    pub fn is_connected(&mut self) -> bool {
        self.network.is_connected()
    }

    pub fn send(&mut self, record: &TelemetryRecord) -> DeliveryOutcome {
        let body = match record.to_json() {
            Ok(body) => body,
            Err(err) => return DeliveryOutcome::Failed(NetworkFault::Encode(err)),
        };

        match self.network.post(
            &self.endpoint,
            CONTENT_TYPE_JSON,
            body.as_bytes(),
            self.timeout_ms,
        ) {
            Ok(status) if (200..300).contains(&status) => DeliveryOutcome::Delivered { status },
            Ok(status) => DeliveryOutcome::Failed(NetworkFault::NonSuccessStatus(status)),
            Err(err) => DeliveryOutcome::Failed(err.into()),
        }
    }
}
