//! WiFi station-mode manager.
//!
//! Validates credentials, associates with the configured AP, and retries
//! a bounded number of times before reporting failure.  Network failure
//! is never fatal — the caller decides whether to continue without
//! connectivity (the core task set always does).

use log::{info, warn};

use crate::error::NetError;

/// Association attempts before `connect()` gives up.
const MAX_RETRY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
}

pub struct WifiManager {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    state: WifiState,
    #[cfg(target_os = "espidf")]
    driver: Option<
        esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    >,
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), NetError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), NetError> {
    // Empty means an open network.
    if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
        return Err(NetError::InvalidPassword);
    }
    Ok(())
}

impl WifiManager {
    pub fn new(ssid: &str, password: &str) -> Result<Self, NetError> {
        validate_ssid(ssid)?;
        validate_password(password)?;

        let mut stored_ssid = heapless::String::new();
        stored_ssid.push_str(ssid).map_err(|()| NetError::InvalidSsid)?;
        let mut stored_password = heapless::String::new();
        stored_password
            .push_str(password)
            .map_err(|()| NetError::InvalidPassword)?;

        Ok(Self {
            ssid: stored_ssid,
            password: stored_password,
            state: WifiState::Disconnected,
            #[cfg(target_os = "espidf")]
            driver: None,
        })
    }

    /// Associate with the configured AP, retrying up to [`MAX_RETRY`]
    /// times.
    pub fn connect(&mut self) -> Result<(), NetError> {
        if self.state == WifiState::Connected {
            return Ok(());
        }
        info!("WiFi: connecting to '{}'", self.ssid);

        for attempt in 1..=MAX_RETRY {
            match self.platform_connect() {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    info!("WiFi: connected (attempt {attempt})");
                    return Ok(());
                }
                Err(e) => {
                    warn!("WiFi: attempt {attempt}/{MAX_RETRY} failed — {e}");
                }
            }
        }
        Err(NetError::ConnectionFailed)
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), NetError> {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::hal::peripherals::Peripherals;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use esp_idf_svc::wifi::{
            AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
        };

        if self.driver.is_none() {
            let sysloop = EspSystemEventLoop::take().map_err(|_| NetError::ConnectionFailed)?;
            let nvs = EspDefaultNvsPartition::take().ok();
            let peripherals = Peripherals::take().map_err(|_| NetError::ConnectionFailed)?;
            let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), nvs)
                .map_err(|_| NetError::ConnectionFailed)?;
            let mut wifi =
                BlockingWifi::wrap(esp_wifi, sysloop).map_err(|_| NetError::ConnectionFailed)?;

            let auth_method = if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: self.ssid.clone(),
                password: self.password.clone(),
                auth_method,
                ..Default::default()
            }))
            .map_err(|_| NetError::ConnectionFailed)?;
            wifi.start().map_err(|_| NetError::ConnectionFailed)?;
            self.driver = Some(wifi);
        }

        let wifi = self.driver.as_mut().expect("driver installed above");
        wifi.connect().map_err(|_| NetError::ConnectionFailed)?;
        wifi.wait_netif_up().map_err(|_| NetError::ConnectionFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), NetError> {
        info!("WiFi(sim): associated with '{}'", self.ssid);
        Ok(())
    }
}
