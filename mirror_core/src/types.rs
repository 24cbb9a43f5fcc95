// Strong typing over strings. Newtypes for timestamps, value types for geometry,
// and the JSON configuration passed from JS.

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms.saturating_mul(1000))
    }

    /// From a JS clock reading (`Date.now()` / `performance.now()`).
    /// Negative and non-finite readings clamp to zero.
    pub fn from_js_millis(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp((ms * 1000.0).round() as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// The instant `ms` milliseconds after this one.
    pub fn after_millis(&self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms.saturating_mul(1000)))
    }
}

/// Identifies one live preview session. Capture failures reported for an
/// earlier session are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SessionId(u32);

impl SessionId {
    pub fn new(id: u32) -> Self {
        SessionId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> SessionId {
        SessionId(self.0.wrapping_add(1))
    }
}

/// Point in either normalized (0-1) or pixel space; the owner knows which.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Destination canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        CanvasSize { width, height }
    }
}

/// The three mutually exclusive UI modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Dashboard widgets (weather, news, crypto, calendar) are shown.
    Idle,
    /// Catalog candidates are shown for selection.
    OptionPicker,
    /// Camera preview with the garment overlay.
    LivePreview,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Idle => "Idle",
            SessionMode::OptionPicker => "OptionPicker",
            SessionMode::LivePreview => "LivePreview",
        }
    }
}

/// Visibility of the widget groups for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub dashboard: bool,
    pub options: bool,
    pub preview: bool,
}

impl Layout {
    pub fn for_mode(mode: SessionMode) -> Self {
        Layout {
            dashboard: mode == SessionMode::Idle,
            options: mode == SessionMode::OptionPicker,
            preview: mode == SessionMode::LivePreview,
        }
    }

    /// Number of visible groups. Always 1 for layouts built by `for_mode`.
    pub fn visible_count(&self) -> usize {
        [self.dashboard, self.options, self.preview]
            .iter()
            .filter(|v| **v)
            .count()
    }
}

/// One selectable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryOnCandidate {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(alias = "image_url")]
    pub thumbnail_url: String,
    #[serde(alias = "processed_image_url")]
    pub processed_overlay_url: String,
    #[serde(default)]
    pub id: Option<u64>,
}

/// The garment bitmap currently composited onto the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayItem {
    /// Opaque handle for the host: the URL it loads the bitmap from.
    pub source_url: String,
    pub natural_width: Option<f64>,
    pub natural_height: Option<f64>,
}

impl OverlayItem {
    pub fn new(source_url: impl Into<String>) -> Self {
        OverlayItem {
            source_url: source_url.into(),
            natural_width: None,
            natural_height: None,
        }
    }

    /// Natural height / width, when the bitmap size is known and non-degenerate.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.natural_width, self.natural_height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(h / w),
            _ => None,
        }
    }
}

impl From<&TryOnCandidate> for OverlayItem {
    fn from(candidate: &TryOnCandidate) -> Self {
        OverlayItem::new(candidate.processed_overlay_url.clone())
    }
}

/// Sprite placement in destination pixel space.
/// The sprite is drawn centred on the anchor after rotating by `rotation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawInstruction {
    pub anchor_x: f64,
    pub anchor_y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

/// Engine configuration passed from JS. Every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timers: TimerSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default = "default_log_level")]
    pub log_level: LevelFilter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timers: TimerSettings::default(),
            overlay: OverlaySettings::default(),
            capture: CaptureSettings::default(),
            catalog: CatalogSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Parse and check a JSON configuration from JS.
    pub fn from_json(json: &str) -> Result<EngineConfig, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::InvalidConfig(msg.to_string()));

        if self.timers.picker_timeout_ms == 0 || self.timers.preview_timeout_ms == 0 {
            return invalid("timeouts must be positive");
        }
        if !(self.overlay.width_padding > 0.0 && self.overlay.height_padding > 0.0) {
            return invalid("overlay padding must be positive");
        }
        if !(0.0..=1.0).contains(&self.overlay.min_confidence) {
            return invalid("min_confidence must be within 0..=1");
        }
        if self.catalog.endpoint.trim().is_empty() {
            return invalid("catalog endpoint is empty");
        }
        Ok(())
    }
}

fn default_log_level() -> LevelFilter {
    LevelFilter::Info
}

/// How the live preview times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewTimeout {
    /// Close after `preview_timeout_ms` without a new overlay.
    Inactivity,
    /// Close `preview_timeout_ms` after opening, whatever happens.
    Fixed,
}

/// Auto-expiry durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_picker_timeout")]
    pub picker_timeout_ms: u64,
    #[serde(default = "default_preview_timeout")]
    pub preview_timeout_ms: u64,
    #[serde(default = "default_notice_duration")]
    pub notice_duration_ms: u64,
    #[serde(default = "default_preview_policy")]
    pub preview_policy: PreviewTimeout,
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings {
            picker_timeout_ms: default_picker_timeout(),
            preview_timeout_ms: default_preview_timeout(),
            notice_duration_ms: default_notice_duration(),
            preview_policy: default_preview_policy(),
        }
    }
}

fn default_picker_timeout() -> u64 {
    30_000
}

fn default_preview_timeout() -> u64 {
    20_000
}

fn default_notice_duration() -> u64 {
    4_000
}

fn default_preview_policy() -> PreviewTimeout {
    PreviewTimeout::Inactivity
}

/// How the overlay height is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlaySizing {
    /// Shoulder-to-hip distance times `height_padding`.
    TorsoHeight,
    /// Width times the sprite's natural aspect ratio.
    AspectRatio,
}

/// Garment placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Garments drape beyond the shoulder line.
    #[serde(default = "default_width_padding")]
    pub width_padding: f64,
    #[serde(default = "default_height_padding")]
    pub height_padding: f64,
    /// Minimum landmark confidence for all four torso points.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_sizing")]
    pub sizing: OverlaySizing,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        OverlaySettings {
            width_padding: default_width_padding(),
            height_padding: default_height_padding(),
            min_confidence: default_min_confidence(),
            sizing: default_sizing(),
        }
    }
}

fn default_width_padding() -> f64 {
    1.8
}

fn default_height_padding() -> f64 {
    1.1
}

fn default_min_confidence() -> f64 {
    0.7
}

fn default_sizing() -> OverlaySizing {
    OverlaySizing::TorsoHeight
}

/// Camera and pose estimator settings, forwarded to the host on capture start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_capture_width")]
    pub width: u32,
    #[serde(default = "default_capture_height")]
    pub height: u32,
    #[serde(default = "default_model_complexity")]
    pub model_complexity: u8,
    #[serde(default = "default_true")]
    pub smooth_landmarks: bool,
    #[serde(default = "default_estimator_confidence")]
    pub min_detection_confidence: f64,
    #[serde(default = "default_estimator_confidence")]
    pub min_tracking_confidence: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        CaptureSettings {
            width: default_capture_width(),
            height: default_capture_height(),
            model_complexity: default_model_complexity(),
            smooth_landmarks: default_true(),
            min_detection_confidence: default_estimator_confidence(),
            min_tracking_confidence: default_estimator_confidence(),
        }
    }
}

fn default_capture_width() -> u32 {
    640
}

fn default_capture_height() -> u32 {
    480
}

fn default_model_complexity() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

fn default_estimator_confidence() -> f64 {
    0.5
}

/// Catalog query and picker text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_currency_label")]
    pub currency_label: String,
    #[serde(default = "default_no_matches_text")]
    pub no_matches_text: String,
    #[serde(default = "default_capture_error_text")]
    pub capture_error_text: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            endpoint: default_endpoint(),
            currency_label: default_currency_label(),
            no_matches_text: default_no_matches_text(),
            capture_error_text: default_capture_error_text(),
        }
    }
}

fn default_endpoint() -> String {
    "/find_clothing".to_string()
}

fn default_currency_label() -> String {
    "lei".to_string()
}

fn default_no_matches_text() -> String {
    "No matching items found.".to_string()
}

fn default_capture_error_text() -> String {
    "Camera unavailable".to_string()
}
