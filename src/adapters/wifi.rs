//! WiFi station-mode bring-up.
//!
//! Network join happens once, before the node boots.  There is no
//! reconnection policy: if the station drops later, the next publish fails,
//! the job fails, and the fail-safe resets the board, which rejoins.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !password.is_empty() && !(8..=64).contains(&password.len()) {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub use espidf::join;

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{error, info};

    use super::{validate_credentials, ConnectivityError};

    /// Join `ssid` and wait for an IP address.  The returned driver must
    /// stay alive for as long as the network is needed.
    pub fn join(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        ssid: &str,
        password: &str,
    ) -> Result<BlockingWifi<EspWifi<'static>>, ConnectivityError> {
        validate_credentials(ssid, password)?;

        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs).map_err(fail("driver init"))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop).map_err(fail("event wrap"))?;

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password.try_into().map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        wifi.set_configuration(&config).map_err(fail("configure"))?;
        wifi.start().map_err(fail("start"))?;
        wifi.connect().map_err(fail("associate"))?;
        wifi.wait_netif_up().map_err(fail("DHCP"))?;

        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: joined '{}' as {}", ssid, ip.ip);
        }
        Ok(wifi)
    }

    fn fail(stage: &'static str) -> impl Fn(EspError) -> ConnectivityError {
        move |e| {
            error!("WiFi: {} failed: {:?}", stage, e);
            ConnectivityError::ConnectionFailed
        }
    }
}
