use anyhow::{Context, Result};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

const CONNECT_ATTEMPTS: u32 = 3;

/// Station mode connection to the home network
pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
    ssid: String,
    password: String,
}

impl WifiManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        ssid: &str,
        password: &str,
    ) -> Result<Self> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;
        Ok(Self {
            wifi,
            ssid: ssid.to_owned(),
            password: password.to_owned(),
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID too long: {}", self.ssid))?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| anyhow::anyhow!("WiFi password too long"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config)?;
        self.wifi.start()?;

        match self.is_visible() {
            Ok(true) => info!("Found network {}", self.ssid),
            Ok(false) => warn!("Network {} not seen in scan, trying anyway", self.ssid),
            Err(err) => warn!("WiFi scan failed: {:#}", err),
        }

        let mut last_err = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            info!("Connecting to WiFi {} (attempt {}/{})", self.ssid, attempt, CONNECT_ATTEMPTS);
            match self.wifi.connect().and_then(|_| self.wifi.wait_netif_up()) {
                Ok(()) => {
                    info!("Connected to {}, IP: {}", self.ssid, self.ip()?);
                    return Ok(());
                }
                Err(err) => {
                    warn!("Failed to connect to {}: {}", self.ssid, err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err
            .map(anyhow::Error::from)
            .unwrap_or_else(|| anyhow::anyhow!("no connection attempt made")))
        .with_context(|| format!("connecting to {}", self.ssid))
    }

    fn is_visible(&mut self) -> Result<bool> {
        let access_points = self.wifi.scan().context("scanning for networks")?;
        info!("Found {} available networks", access_points.len());
        Ok(access_points.iter().any(|ap| ap.ssid.as_str() == self.ssid))
    }

    pub fn ip(&self) -> Result<std::net::Ipv4Addr> {
        Ok(self.wifi.wifi().sta_netif().get_ip_info()?.ip)
    }
}
