//! Device identity derived from the ESP32 factory MAC address.
//!
//! The full MAC in lowercase hex (`aabbccddeeff`) is the payload of the
//! connect announcement and of the broker last-will, so the broker side can
//! tell which board came and went even when two nodes share a client id.

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// 12 lowercase hex digits.
pub type MacHex = heapless::String<12>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn mac_hex(mac: &MacAddress) -> MacHex {
    use core::fmt::Write;
    let mut out = MacHex::new();
    for b in mac {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
