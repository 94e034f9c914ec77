use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleConfig {
    /// Minimum pixel gap between two rendered handles on one boundary.
    pub min_gap_px: f32,
    /// Relaxation iterations before giving up and requesting growth.
    pub relax_iterations: usize,
    /// Fraction of a circular section reserved for incoming handles; the
    /// remainder carries outgoing ones.
    pub incoming_fraction: f32,
    /// Reserved data-store band on a process circle, clockwise degrees.
    pub store_band_start_deg: f32,
    pub store_band_end_deg: f32,
    /// In/out sub-bands inside the store band.
    pub store_in_start_deg: f32,
    pub store_in_end_deg: f32,
    pub store_out_start_deg: f32,
    pub store_out_end_deg: f32,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            min_gap_px: 25.0,
            relax_iterations: 10,
            incoming_fraction: 0.5,
            store_band_start_deg: 0.0,
            store_band_end_deg: 180.0,
            store_in_start_deg: 20.0,
            store_in_end_deg: 80.0,
            store_out_start_deg: 100.0,
            store_out_end_deg: 160.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Radius of the semicircular arc drawn where one edge crosses another.
    pub jump_radius: f32,
    /// Stub length leaving each endpoint before a smart path may bend.
    pub smart_stub: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            jump_radius: 6.0,
            smart_stub: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Keyboard nudge applied to an edge's label offset per key press.
    pub nudge_step: f32,
    /// Live range of the fractional label offset.
    pub min_offset: f32,
    pub max_offset: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            nudge_step: 0.05,
            min_offset: 0.1,
            max_offset: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosizeConfig {
    /// Delay before an auto-resize request is released to the store, so a
    /// drag in progress can supersede it.
    pub debounce_ms: u64,
}

impl Default for AutosizeConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// UI affordance visibility, threaded through layout results as plain data
/// rather than ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFlags {
    pub show_handles: bool,
    pub show_direction_toggles: bool,
    pub show_grid: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            show_handles: true,
            show_direction_toggles: true,
            show_grid: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub handles: HandleConfig,
    pub routing: RoutingConfig,
    pub label: LabelConfig,
    pub autosize: AutosizeConfig,
    pub view: ViewFlags,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HandleConfigFile {
    min_gap_px: Option<f32>,
    relax_iterations: Option<usize>,
    incoming_fraction: Option<f32>,
    store_band_start_deg: Option<f32>,
    store_band_end_deg: Option<f32>,
    store_in_start_deg: Option<f32>,
    store_in_end_deg: Option<f32>,
    store_out_start_deg: Option<f32>,
    store_out_end_deg: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    jump_radius: Option<f32>,
    smart_stub: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelConfigFile {
    nudge_step: Option<f32>,
    min_offset: Option<f32>,
    max_offset: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AutosizeConfigFile {
    debounce_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ViewFlagsFile {
    show_handles: Option<bool>,
    show_direction_toggles: Option<bool>,
    show_grid: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    handles: Option<HandleConfigFile>,
    routing: Option<RoutingConfigFile>,
    label: Option<LabelConfigFile>,
    autosize: Option<AutosizeConfigFile>,
    view: Option<ViewFlagsFile>,
}

fn merge(config: &mut EngineConfig, parsed: ConfigFile) {
    if let Some(handles) = parsed.handles {
        if let Some(v) = handles.min_gap_px {
            config.handles.min_gap_px = v;
        }
        if let Some(v) = handles.relax_iterations {
            config.handles.relax_iterations = v;
        }
        if let Some(v) = handles.incoming_fraction {
            config.handles.incoming_fraction = v;
        }
        if let Some(v) = handles.store_band_start_deg {
            config.handles.store_band_start_deg = v;
        }
        if let Some(v) = handles.store_band_end_deg {
            config.handles.store_band_end_deg = v;
        }
        if let Some(v) = handles.store_in_start_deg {
            config.handles.store_in_start_deg = v;
        }
        if let Some(v) = handles.store_in_end_deg {
            config.handles.store_in_end_deg = v;
        }
        if let Some(v) = handles.store_out_start_deg {
            config.handles.store_out_start_deg = v;
        }
        if let Some(v) = handles.store_out_end_deg {
            config.handles.store_out_end_deg = v;
        }
    }
    if let Some(routing) = parsed.routing {
        if let Some(v) = routing.jump_radius {
            config.routing.jump_radius = v;
        }
        if let Some(v) = routing.smart_stub {
            config.routing.smart_stub = v;
        }
    }
    if let Some(label) = parsed.label {
        if let Some(v) = label.nudge_step {
            config.label.nudge_step = v;
        }
        if let Some(v) = label.min_offset {
            config.label.min_offset = v;
        }
        if let Some(v) = label.max_offset {
            config.label.max_offset = v;
        }
    }
    if let Some(autosize) = parsed.autosize {
        if let Some(v) = autosize.debounce_ms {
            config.autosize.debounce_ms = v;
        }
    }
    if let Some(view) = parsed.view {
        if let Some(v) = view.show_handles {
            config.view.show_handles = v;
        }
        if let Some(v) = view.show_direction_toggles {
            config.view.show_direction_toggles = v;
        }
        if let Some(v) = view.show_grid {
            config.view.show_grid = v;
        }
    }
}

/// Load engine configuration, merging an optional JSON (or JSON5) file over
/// the defaults. A missing path yields the defaults unchanged.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let parsed: ConfigFile = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    merge(&mut config, parsed);
    Ok(config)
}
