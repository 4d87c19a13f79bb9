use std::time::Duration;

use anyhow::Result;
use embedded_svc::http::client::Client;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::{info, warn};

use crate::error::FetchError;
use crate::fetch::StatusApi;
use crate::status::{parse_status_body, StatusSnapshot};

/// Largest status body accepted
const MAX_BODY: usize = 4096;
const READ_CHUNK: usize = 512;

fn connection(url: &str, timeout: Duration) -> Result<EspHttpConnection, FetchError> {
    let tls = url.starts_with("https");
    let config = Configuration {
        timeout: Some(timeout),
        use_global_ca_store: tls,
        crt_bundle_attach: if tls {
            Some(esp_idf_svc::sys::esp_crt_bundle_attach)
        } else {
            None
        },
        ..Default::default()
    };
    EspHttpConnection::new(&config).map_err(|e| FetchError::Transport(e.to_string()))
}

/// GET the status endpoint with the ESP HTTP client
pub struct HttpStatusApi {
    url: String,
    timeout: Duration,
    utc_offset_hours: i32,
    client: Option<Client<EspHttpConnection>>,
}

impl HttpStatusApi {
    pub fn new(url: &str, timeout: Duration, utc_offset_hours: i32) -> Self {
        Self {
            url: url.to_owned(),
            timeout,
            utc_offset_hours,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut Client<EspHttpConnection>, FetchError> {
        if self.client.is_none() {
            self.client = Some(Client::wrap(connection(&self.url, self.timeout)?));
        }
        self.client
            .as_mut()
            .ok_or_else(|| FetchError::Transport("client unavailable".into()))
    }

    fn get(&mut self) -> Result<Vec<u8>, FetchError> {
        let url = self.url.clone();
        let client = self.client()?;
        let transport = |e: esp_idf_svc::io::EspIOError| FetchError::Transport(e.to_string());

        let request = client.get(&url).map_err(transport)?;
        let mut response = request.submit().map_err(transport)?;
        let status = response.status();
        if status != 200 {
            return Err(FetchError::Status(status));
        }

        let mut body = Vec::new();
        body.try_reserve(READ_CHUNK)
            .map_err(|_| FetchError::ResourceExhausted(READ_CHUNK))?;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|e| FetchError::Transport(format!("{:?}", e)))?;
            if read == 0 {
                break;
            }
            if body.len() + read > MAX_BODY {
                return Err(FetchError::ResourceExhausted(body.len() + read));
            }
            body.try_reserve(read)
                .map_err(|_| FetchError::ResourceExhausted(body.len() + read))?;
            body.extend_from_slice(&chunk[..read]);
        }
        Ok(body)
    }
}

impl StatusApi for HttpStatusApi {
    fn fetch(&mut self) -> Result<StatusSnapshot, FetchError> {
        match self.get() {
            Ok(body) => parse_status_body(&body, self.utc_offset_hours),
            Err(err) => {
                // a failed request may leave the connection half open
                self.client = None;
                Err(err)
            }
        }
    }

    fn release(&mut self) {
        if self.client.take().is_some() {
            info!("Released HTTP client");
        }
    }
}

/// Log whether each endpoint answers at all
pub fn probe_connectivity(endpoints: &[(&str, String)], timeout: Duration) {
    info!("Testing network connectivity");
    for (name, url) in endpoints {
        let result = connection(url, timeout).and_then(|conn| {
            let mut client = Client::wrap(conn);
            let transport = |e: esp_idf_svc::io::EspIOError| FetchError::Transport(e.to_string());
            let response = client
                .get(url)
                .map_err(transport)?
                .submit()
                .map_err(transport)?;
            Ok(response.status())
        });
        match result {
            Ok(status) => info!("{} reachable at {} (status: {})", name, url, status),
            Err(err) => warn!("{} not reachable at {}: {}", name, url, err),
        }
    }
}
