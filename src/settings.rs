//! Wheel settings
//!
//! Native: JSON file named by `LUCKY_DRAW_CONFIG` (default `lucky-draw.json`),
//! with `PORT` overriding the listen port. Web: LocalStorage.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::draw::SpinTiming;
use crate::error::StorageError;
use crate::persistence::Store;

/// Wheel and server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Spin ===
    /// Spin length (ms), 3000 - 9000
    pub spin_duration_ms: f64,
    /// Full turns before landing
    pub extra_turns: u32,
    /// Pointer position (degrees clockwise from 3 o'clock)
    pub pointer_angle_deg: f64,
    /// Pause between stop and winner announcement (ms)
    pub announce_delay_ms: f64,
    /// Remove the winner from the wheel once announced
    pub auto_remove_winner: bool,

    // === Participants ===
    pub max_participants: usize,
    pub max_name_len: usize,

    // === Rendering ===
    /// Logical wheel size (px)
    pub view_size: f32,

    // === Server ===
    /// Spin endpoint the browser asks for a draw; empty draws locally only
    pub spin_endpoint: String,
    pub bind_addr: String,
    pub data_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spin_duration_ms: SPIN_DURATION_DEFAULT_MS,
            extra_turns: EXTRA_TURNS,
            pointer_angle_deg: POINTER_ANGLE_DEG,
            announce_delay_ms: ANNOUNCE_DELAY_MS,
            auto_remove_winner: false,

            max_participants: MAX_PARTICIPANTS,
            max_name_len: MAX_NAME_LEN,

            view_size: VIEW_SIZE,

            spin_endpoint: "/api/spin".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Settings {
    /// Storage key (web)
    pub const STORAGE_KEY: &'static str = "lucky_draw_settings";

    /// Pull out-of-range values back into bounds
    pub fn clamped(mut self) -> Self {
        self.spin_duration_ms = self
            .spin_duration_ms
            .clamp(SPIN_DURATION_MIN_MS, SPIN_DURATION_MAX_MS);
        self.announce_delay_ms = self.announce_delay_ms.max(0.0);
        self.extra_turns = self.extra_turns.clamp(1, 20);
        if !self.pointer_angle_deg.is_finite() {
            self.pointer_angle_deg = POINTER_ANGLE_DEG;
        }
        self.max_participants = self.max_participants.clamp(MIN_PARTICIPANTS, MAX_PARTICIPANTS);
        self.max_name_len = self.max_name_len.max(1);
        if !(self.view_size.is_finite() && self.view_size >= 100.0) {
            self.view_size = VIEW_SIZE;
        }
        self
    }

    /// Set spin length from a seconds slider (3 - 9)
    pub fn set_spin_seconds(&mut self, seconds: f64) {
        self.spin_duration_ms =
            (seconds * 1000.0).clamp(SPIN_DURATION_MIN_MS, SPIN_DURATION_MAX_MS);
    }

    pub fn timing(&self) -> SpinTiming {
        SpinTiming {
            duration_ms: self.spin_duration_ms,
            announce_delay_ms: self.announce_delay_ms,
            extra_turns: self.extra_turns,
            pointer_angle_deg: self.pointer_angle_deg,
        }
    }

    /// Replace the port in `bind_addr`
    pub fn with_port(mut self, port: u16) -> Self {
        let host = self
            .bind_addr
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| self.bind_addr.clone());
        self.bind_addr = format!("{}:{}", host, port);
        self
    }

    /// Parse a JSON document, falling back to defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.clamped())
    }

    /// Load from the config file and environment (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let path =
            std::env::var("LUCKY_DRAW_CONFIG").unwrap_or_else(|_| "lucky-draw.json".to_string());

        let mut settings = match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(s) => {
                    log::info!("Loaded settings from {}", path);
                    s
                }
                Err(e) => {
                    log::warn!("Ignoring {}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        };

        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            settings = settings.with_port(port);
        }
        settings
    }

    /// Load from `store` (web)
    pub fn load_from(store: &dyn Store) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(s) => {
                    log::info!("Loaded settings from storage");
                    return s;
                }
                Err(e) => log::warn!("Discarding stored settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings: {}", e),
        }
        log::info!("Using default settings");
        Self::default()
    }

    pub fn save_to(&self, store: &mut dyn Store) -> Result<(), StorageError> {
        store.set(Self::STORAGE_KEY, &serde_json::to_string(self)?)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{"extra_turns": 5}"#).unwrap();
        assert_eq!(s.extra_turns, 5);
        assert_eq!(s.pointer_angle_deg, 90.0);
        assert_eq!(s.spin_duration_ms, 6000.0);
        assert_eq!(s.spin_endpoint, "/api/spin");

        let s = Settings::from_json(r#"{"spin_endpoint": ""}"#).unwrap();
        assert!(s.spin_endpoint.is_empty());
    }

    #[test]
    fn test_clamps_duration() {
        let s = Settings::from_json(r#"{"spin_duration_ms": 100}"#).unwrap();
        assert_eq!(s.spin_duration_ms, 3000.0);

        let mut s = Settings::default();
        s.set_spin_seconds(12.0);
        assert_eq!(s.spin_duration_ms, 9000.0);
    }

    #[test]
    fn test_with_port() {
        let s = Settings::default().with_port(8080);
        assert_eq!(s.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_store_roundtrip_and_corrupt() {
        let mut store = MemoryStore::default();
        let mut s = Settings::default();
        s.auto_remove_winner = true;
        s.save_to(&mut store).unwrap();
        assert_eq!(Settings::load_from(&store), s);

        store.set(Settings::STORAGE_KEY, "[]").unwrap();
        assert_eq!(Settings::load_from(&store), Settings::default());
    }
}
