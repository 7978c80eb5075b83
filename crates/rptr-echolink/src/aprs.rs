// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! APRS position beacon (§4.4 "APRS position reports").

pub const EL_APRS_INTERVAL_S: u64 = 600;
pub const EL_APRS_START_DELAY_S: u64 = 10;
pub const GPS_VALID_SECS: u64 = 120;
pub const APRS_COLLECTOR_HOST: &str = "aprs.echolink.org";
pub const APRS_COLLECTOR_PORT: u16 = 5199;

/// A live position source (serial GPS, etc). Config-file lat/lon is the
/// fallback when no provider is wired up or its last fix has gone stale.
pub trait GpsProvider: Send {
    /// Latest fix and how many seconds ago it was taken, if any.
    fn last_fix(&self) -> Option<(f64, f64, u64)>;
}

#[derive(Debug, Clone, Copy)]
pub struct StationParams {
    pub lat: f64,
    pub lon: f64,
    pub power: u8,
    pub height_ft: u16,
    pub gain_db: u8,
    pub dir_deg: Option<u16>,
    pub freq_mhz: f64,
    pub tone_hz: Option<f64>,
}

/// Resolve lat/lon: prefer a fresh GPS fix over the config defaults.
pub fn resolve_position(config_lat: f64, config_lon: f64, gps: Option<&dyn GpsProvider>) -> (f64, f64) {
    if let Some(provider) = gps {
        if let Some((lat, lon, age_s)) = provider.last_fix() {
            if age_s <= GPS_VALID_SECS {
                return (lat, lon);
            }
        }
    }
    (config_lat, config_lon)
}

/// APRS position/status string per §4.4: lat/lon, power/height/gain/dir,
/// frequency/tone, and an occupancy annotation.
pub fn format_status(params: &StationParams, lat: f64, lon: f64, occupants: usize) -> String {
    let phg = phg_code(params.power, params.height_ft, params.gain_db, params.dir_deg);
    format!(
        "{}{}{}{} {:.4}MHz T{} Users={}",
        format_lat(lat),
        format_lon(lon),
        phg,
        "",
        params.freq_mhz,
        params
            .tone_hz
            .map(|t| format!("{t:.1}"))
            .unwrap_or_else(|| "none".into()),
        occupants,
    )
}

fn format_lat(lat: f64) -> String {
    let hemi = if lat >= 0.0 { 'N' } else { 'S' };
    format!("{:07.2}{hemi}", lat.abs() * 100.0)
}

fn format_lon(lon: f64) -> String {
    let hemi = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:08.2}{hemi}", lon.abs() * 100.0)
}

/// Power-height-gain-directivity code, APRS's single-digit-per-field
/// encoding (`PHGphgd`).
fn phg_code(power: u8, height_ft: u16, gain_db: u8, dir_deg: Option<u16>) -> String {
    let p = power_digit(power);
    let h = height_digit(height_ft);
    let g = gain_db.min(9);
    let d = dir_deg.map(|deg| ((deg % 360) / 45) as u8).unwrap_or(0);
    format!("PHG{p}{h}{g}{d}")
}

fn power_digit(watts: u8) -> u8 {
    // APRS PHG power digit is watts = digit^2.
    (0..=9).rev().find(|&d| d * d <= watts).unwrap_or(0)
}

fn height_digit(height_ft: u16) -> u8 {
    // APRS PHG height digit is feet = 10 * 2^digit.
    let mut digit = 0u8;
    let mut feet = 10u32;
    while feet * 2 <= height_ft as u32 && digit < 9 {
        feet *= 2;
        digit += 1;
    }
    digit
}

/// Should the beacon fire this interval, given how long the instance has
/// been up?
pub fn is_due(uptime_s: u64, last_sent_s: Option<u64>) -> bool {
    if uptime_s < EL_APRS_START_DELAY_S {
        return false;
    }
    match last_sent_s {
        None => true,
        Some(last) => uptime_s.saturating_sub(last) >= EL_APRS_INTERVAL_S,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGps(Option<(f64, f64, u64)>);
    impl GpsProvider for FixedGps {
        fn last_fix(&self) -> Option<(f64, f64, u64)> {
            self.0
        }
    }

    #[test]
    fn prefers_fresh_gps_fix_over_config() {
        let gps = FixedGps(Some((42.0, -71.0, 10)));
        let (lat, lon) = resolve_position(0.0, 0.0, Some(&gps));
        assert_eq!((lat, lon), (42.0, -71.0));
    }

    #[test]
    fn falls_back_to_config_when_fix_is_stale() {
        let gps = FixedGps(Some((42.0, -71.0, GPS_VALID_SECS + 1)));
        let (lat, lon) = resolve_position(10.0, 20.0, Some(&gps));
        assert_eq!((lat, lon), (10.0, 20.0));
    }

    #[test]
    fn falls_back_to_config_without_a_provider() {
        let (lat, lon) = resolve_position(10.0, 20.0, None);
        assert_eq!((lat, lon), (10.0, 20.0));
    }

    #[test]
    fn not_due_before_start_delay() {
        assert!(!is_due(5, None));
        assert!(is_due(10, None));
    }

    #[test]
    fn due_only_after_full_interval_since_last_send() {
        assert!(!is_due(700, Some(500)));
        assert!(is_due(1_100, Some(500)));
    }

    #[test]
    fn phg_code_has_expected_shape() {
        let params = StationParams {
            lat: 0.0,
            lon: 0.0,
            power: 9,
            height_ft: 40,
            gain_db: 6,
            dir_deg: Some(90),
            freq_mhz: 146.94,
            tone_hz: Some(100.0),
        };
        let status = format_status(&params, 42.5, -71.25, 3);
        assert!(status.contains("PHG"));
        assert!(status.contains("146.94MHz"));
        assert!(status.contains("Users=3"));
    }
}
