//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::{
    Bounds, Building, Coordinate, LocationOptions, OutdoorLocationOptions, Placement,
};
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Indoor positioning session runner
#[derive(Parser, Debug)]
#[command(name = "indoor-session", version, about)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    pub config: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundsConfig {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildingConfig {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    pub bounds: BoundsConfig,
    pub center: Coordinate,
    /// Rotation in radians
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_marker_icon_size")]
    pub marker_icon_size: u32,
    #[serde(default = "default_route_color")]
    pub route_color: String,
    #[serde(default = "default_route_width")]
    pub route_width: u32,
    #[serde(default = "default_position_marker_title")]
    pub position_marker_title: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            marker_icon_size: default_marker_icon_size(),
            route_color: default_route_color(),
            route_width: default_route_width(),
            position_marker_title: default_position_marker_title(),
        }
    }
}

fn default_zoom() -> u8 {
    20
}

fn default_marker_icon_size() -> u32 {
    35
}

fn default_route_color() -> String {
    "#754967".to_string()
}

fn default_route_width() -> u32 {
    4
}

fn default_position_marker_title() -> String {
    "Current position".to_string()
}

/// Default location request, merged with the building at start time
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub use_dead_reckoning: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_indoor_provider")]
    pub indoor_provider: String,
    #[serde(default = "default_true")]
    pub use_ble: bool,
    #[serde(default = "default_true")]
    pub use_wifi: bool,
    #[serde(default = "default_motion_mode")]
    pub motion_mode: String,
    #[serde(default = "default_true")]
    pub use_foreground_service: bool,
    #[serde(default)]
    pub outdoor: OutdoorConfig,
    #[serde(default)]
    pub beacon_filters: Vec<String>,
    #[serde(default = "default_smallest_displacement")]
    pub smallest_displacement: f64,
    #[serde(default = "default_interval_ms")]
    pub realtime_update_interval_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            use_dead_reckoning: false,
            interval_ms: default_interval_ms(),
            indoor_provider: default_indoor_provider(),
            use_ble: true,
            use_wifi: true,
            motion_mode: default_motion_mode(),
            use_foreground_service: true,
            outdoor: OutdoorConfig::default(),
            beacon_filters: Vec::new(),
            smallest_displacement: default_smallest_displacement(),
            realtime_update_interval_ms: default_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutdoorConfig {
    #[serde(default = "default_true")]
    pub continuous_mode: bool,
    #[serde(default)]
    pub user_defined_threshold: bool,
    #[serde(default = "default_burst_interval")]
    pub burst_interval: u32,
    #[serde(default = "default_average_snr_threshold")]
    pub average_snr_threshold: f64,
}

impl Default for OutdoorConfig {
    fn default() -> Self {
        Self {
            continuous_mode: true,
            user_defined_threshold: false,
            burst_interval: default_burst_interval(),
            average_snr_threshold: default_average_snr_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_indoor_provider() -> String {
    "INPHONE".to_string()
}

fn default_motion_mode() -> String {
    "BY_FOOT".to_string()
}

fn default_smallest_displacement() -> f64 {
    1.0
}

fn default_burst_interval() -> u32 {
    1
}

fn default_average_snr_threshold() -> f64 {
    25.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Index into the loaded POI list used as route target
    #[serde(default = "default_target_poi_index")]
    pub target_poi_index: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self { target_poi_index: default_target_poi_index() }
    }
}

fn default_target_poi_index() -> usize {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_secs: default_cache_max_age_secs() }
    }
}

fn default_cache_max_age_secs() -> u64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_notifier_duration_ms")]
    pub duration_ms: u64,
    #[serde(default)]
    pub placement: Placement,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { duration_ms: default_notifier_duration_ms(), placement: Placement::Bottom }
    }
}

fn default_notifier_duration_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_journal_file")]
    pub file: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { enabled: false, file: default_journal_file() }
    }
}

fn default_journal_file() -> String {
    "session.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_simulation_steps")]
    pub steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { update_interval_ms: default_interval_ms(), steps: default_simulation_steps() }
    }
}

fn default_simulation_steps() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub building: BuildingConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    building: Building,
    map_zoom: u8,
    marker_icon_size: u32,
    route_color: String,
    route_width: u32,
    position_marker_title: String,
    location: LocationConfig,
    target_poi_index: usize,
    cache_max_age_secs: u64,
    notifier_duration_ms: u64,
    notifier_placement: Placement,
    journal_enabled: bool,
    journal_file: String,
    metrics_interval_secs: u64,
    simulation_update_interval_ms: u64,
    simulation_steps: usize,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            building: Self::default_building(),
            map_zoom: default_zoom(),
            marker_icon_size: default_marker_icon_size(),
            route_color: default_route_color(),
            route_width: default_route_width(),
            position_marker_title: default_position_marker_title(),
            location: LocationConfig::default(),
            target_poi_index: default_target_poi_index(),
            cache_max_age_secs: default_cache_max_age_secs(),
            notifier_duration_ms: default_notifier_duration_ms(),
            notifier_placement: Placement::Bottom,
            journal_enabled: false,
            journal_file: default_journal_file(),
            metrics_interval_secs: default_metrics_interval(),
            simulation_update_interval_ms: default_interval_ms(),
            simulation_steps: default_simulation_steps(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    fn default_building() -> Building {
        Building {
            identifier: "demo".to_string(),
            name: "Demo building".to_string(),
            bounds: Bounds {
                south_west: Coordinate::new(42.8720, -8.5640),
                north_east: Coordinate::new(42.8730, -8.5625),
            },
            center: Coordinate::new(42.8725, -8.56325),
            rotation: 0.0,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let b = toml_config.building;
        Ok(Self {
            building: Building {
                identifier: b.identifier,
                name: b.name,
                bounds: Bounds { south_west: b.bounds.south_west, north_east: b.bounds.north_east },
                center: b.center,
                rotation: b.rotation,
            },
            map_zoom: toml_config.map.zoom,
            marker_icon_size: toml_config.map.marker_icon_size,
            route_color: toml_config.map.route_color,
            route_width: toml_config.map.route_width,
            position_marker_title: toml_config.map.position_marker_title,
            location: toml_config.location,
            target_poi_index: toml_config.route.target_poi_index,
            cache_max_age_secs: toml_config.cache.max_age_secs,
            notifier_duration_ms: toml_config.notifier.duration_ms,
            notifier_placement: toml_config.notifier.placement,
            journal_enabled: toml_config.journal.enabled,
            journal_file: toml_config.journal.file,
            // Zero periods would panic the interval timers
            metrics_interval_secs: toml_config.metrics.interval_secs.max(1),
            simulation_update_interval_ms: toml_config.simulation.update_interval_ms.max(1),
            simulation_steps: toml_config.simulation.steps,
            config_file: path.display().to_string(),
        })
    }

    /// Load from an explicit path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Location request for this building: configured defaults plus the
    /// building identifier
    pub fn location_options(&self, building: &Building) -> LocationOptions {
        let l = &self.location;
        LocationOptions {
            building_identifier: building.identifier.clone(),
            use_dead_reckoning: l.use_dead_reckoning,
            interval_ms: l.interval_ms,
            indoor_provider: l.indoor_provider.clone(),
            use_ble: l.use_ble,
            use_wifi: l.use_wifi,
            motion_mode: l.motion_mode.clone(),
            use_foreground_service: l.use_foreground_service,
            outdoor: OutdoorLocationOptions {
                continuous_mode: l.outdoor.continuous_mode,
                user_defined_threshold: l.outdoor.user_defined_threshold,
                burst_interval: l.outdoor.burst_interval,
                average_snr_threshold: l.outdoor.average_snr_threshold,
            },
            beacon_filters: l.beacon_filters.clone(),
            smallest_displacement: l.smallest_displacement,
            realtime_update_interval_ms: l.realtime_update_interval_ms,
        }
    }

    // Getters for all config fields
    pub fn building(&self) -> &Building {
        &self.building
    }

    pub fn map_zoom(&self) -> u8 {
        self.map_zoom
    }

    pub fn marker_icon_size(&self) -> u32 {
        self.marker_icon_size
    }

    pub fn route_color(&self) -> &str {
        &self.route_color
    }

    pub fn route_width(&self) -> u32 {
        self.route_width
    }

    pub fn position_marker_title(&self) -> &str {
        &self.position_marker_title
    }

    pub fn target_poi_index(&self) -> usize {
        self.target_poi_index
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }

    pub fn notifier_duration_ms(&self) -> u64 {
        self.notifier_duration_ms
    }

    pub fn notifier_placement(&self) -> Placement {
        self.notifier_placement
    }

    pub fn journal_enabled(&self) -> bool {
        self.journal_enabled
    }

    pub fn journal_file(&self) -> &str {
        &self.journal_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn simulation_update_interval_ms(&self) -> u64 {
        self.simulation_update_interval_ms
    }

    pub fn simulation_steps(&self) -> usize {
        self.simulation_steps
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to replace the building
    pub fn with_building(mut self, building: Building) -> Self {
        self.building = building;
        self
    }

    /// Builder method to set the route target index
    pub fn with_target_poi_index(mut self, index: usize) -> Self {
        self.target_poi_index = index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.map_zoom(), 20);
        assert_eq!(config.marker_icon_size(), 35);
        assert_eq!(config.route_color(), "#754967");
        assert_eq!(config.route_width(), 4);
        assert_eq!(config.target_poi_index(), 2);
        assert_eq!(config.cache_max_age(), Duration::from_secs(7));
        assert_eq!(config.notifier_placement(), Placement::Bottom);
        assert!(!config.journal_enabled());
    }

    #[test]
    fn test_location_options_merge_building() {
        let config = Config::default();
        let mut building = config.building().clone();
        building.identifier = "10342".to_string();

        let options = config.location_options(&building);
        assert_eq!(options.building_identifier, "10342");
        assert_eq!(options.indoor_provider, "INPHONE");
        assert_eq!(options.motion_mode, "BY_FOOT");
        assert_eq!(options.interval_ms, 1000);
        assert!(options.use_ble && options.use_wifi && options.use_foreground_service);
        assert!(!options.use_dead_reckoning);
        assert_eq!(options.outdoor.average_snr_threshold, 25.0);
        assert!(options.beacon_filters.is_empty());

        // Merging never mutates the configured defaults
        let other = config.location_options(config.building());
        assert_eq!(other.building_identifier, "demo");
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[building]
identifier = "b1"
rotation = 0.5
bounds = { south_west = { latitude = 1.0, longitude = 1.0 }, north_east = { latitude = 2.0, longitude = 2.0 } }
center = { latitude = 1.5, longitude = 1.5 }
"#,
        )
        .unwrap();
        assert_eq!(toml_config.map.zoom, 20);
        assert_eq!(toml_config.route.target_poi_index, 2);
        assert_eq!(toml_config.location.realtime_update_interval_ms, 1000);
        assert!(toml_config.location.outdoor.continuous_mode);
        assert_eq!(toml_config.building.rotation, 0.5);
    }
}
