use std::error::Error;
use std::io;
use std::time::Duration;

use cubesat_board::{NetworkError, NetworkServices};
use ureq::{Agent, AgentBuilder, ErrorKind};

/// Host networking. The machine is already on a network, so association
/// completes as soon as it is requested.
pub struct HttpNetwork {
    agent: Agent,
    associated_ssid: Option<String>,
}

impl HttpNetwork {
    pub fn new() -> Self {
        HttpNetwork {
            agent: AgentBuilder::new().build(),
            associated_ssid: None,
        }
    }

    pub fn associated_ssid(&self) -> Option<&str> {
        self.associated_ssid.as_deref()
    }
}

impl Default for HttpNetwork {
    fn default() -> Self {
        Self::new()
    }
}

fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    let mut source: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if matches!(io_err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = current.source();
    }
    false
}

fn is_refused(err: &(dyn Error + 'static)) -> bool {
    let mut source: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = current.source();
    }
    false
}

fn network_error(transport: ureq::Transport) -> NetworkError {
    if is_timeout(&transport) {
        return NetworkError::Timeout;
    }
    if is_refused(&transport) {
        return NetworkError::ConnectionRefused;
    }
    match transport.kind() {
        ErrorKind::Dns => NetworkError::Unresolved,
        _ => NetworkError::Transport(transport.to_string()),
    }
}

impl NetworkServices for HttpNetwork {
    fn begin_association(&mut self, ssid: &str, _secret: &str) -> Result<(), NetworkError> {
        log::info!("host network stands in for access point {}", ssid);
        self.associated_ssid = Some(ssid.to_string());
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        self.associated_ssid.is_some()
    }

    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<u16, NetworkError> {
        let response = self
            .agent
            .post(url)
            .timeout(Duration::from_millis(timeout_ms as u64))
            .set("Content-Type", content_type)
            .send_bytes(body);

        match response {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(status, _)) => Ok(status),
            Err(ureq::Error::Transport(transport)) => Err(network_error(transport)),
        }
    }
}
