//! Mapping profile loader and validator
//!
//! Loads the key/mouse -> controller mapping from a TOML file in the
//! configs/ directory, or from the defaults embedded in the binary.
//! A profile is validated completely before anything uses it; an invalid
//! profile is a startup failure.

use crate::gamepad::{Button, Direction, Stick, Trigger};
use crate::input::{parse_key_name, KeyCode, MouseButton};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default profile shipped with the binary
const EMBEDDED_PROFILE: &str = include_str!("../../configs/default.toml");

/// Default profile location relative to the working directory
pub const DEFAULT_PROFILE_PATH: &str = "configs/default.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Wheel rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    Up,
    Down,
}

/// Physical input a binding is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bind {
    Key(KeyCode),
    Mouse(MouseButton),
    Wheel(WheelDirection),
}

impl FromStr for Bind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "mouse_left" => Ok(Bind::Mouse(MouseButton::Left)),
            "mouse_right" => Ok(Bind::Mouse(MouseButton::Right)),
            "mouse_middle" => Ok(Bind::Mouse(MouseButton::Middle)),
            "mouse_x1" => Ok(Bind::Mouse(MouseButton::X1)),
            "mouse_x2" => Ok(Bind::Mouse(MouseButton::X2)),
            "wheel_up" => Ok(Bind::Wheel(WheelDirection::Up)),
            "wheel_down" => Ok(Bind::Wheel(WheelDirection::Down)),
            _ => parse_key_name(&name).map(Bind::Key),
        }
    }
}

impl TryFrom<String> for Bind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bind> for String {
    fn from(bind: Bind) -> Self {
        bind.to_string()
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bind::Key(code) => write!(f, "{}", code),
            Bind::Mouse(MouseButton::Left) => f.write_str("mouse_left"),
            Bind::Mouse(MouseButton::Right) => f.write_str("mouse_right"),
            Bind::Mouse(MouseButton::Middle) => f.write_str("mouse_middle"),
            Bind::Mouse(MouseButton::X1) => f.write_str("mouse_x1"),
            Bind::Mouse(MouseButton::X2) => f.write_str("mouse_x2"),
            Bind::Wheel(WheelDirection::Up) => f.write_str("wheel_up"),
            Bind::Wheel(WheelDirection::Down) => f.write_str("wheel_down"),
        }
    }
}

/// Radius-limit adjustments for the mouse-driven stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitAction {
    Toggle,
    Increase,
    Decrease,
    Reset,
}

/// Logical controller action a bind triggers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Consume the input without doing anything
    None,

    /// Flip between pass-through and emulation
    Toggle,

    /// Hold a digital button while the input is held
    Button { button: Button },

    /// Hold a trigger fully while the input is held
    Trigger { trigger: Trigger },

    /// Push a stick in one direction while held (WASD-style)
    Direction { stick: Stick, direction: Direction },

    /// Hold a stick at a fixed position while held
    Analog { stick: Stick, x: f32, y: f32 },

    /// Adjust the mouse stick radius limit (acts on press)
    Limit { action: LimitAction },
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// General settings
    pub settings: Settings,

    /// Mouse -> stick conversion
    pub mouse: MouseSettings,

    /// Radius limit behaviour
    pub limit: LimitSettings,

    /// Timed stick lock on the jump bind
    pub dodge: DodgeSettings,

    /// Input -> action bindings
    pub binds: HashMap<Bind, Action>,
}

/// Profile as written on disk, bind names not yet resolved.
///
/// Several names can spell the same input (`w` and `0x11`), so binds are
/// read by name first and resolved afterwards, where a clash is an error
/// instead of one entry silently replacing the other.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    #[serde(default)]
    settings: Settings,

    #[serde(default)]
    mouse: MouseSettings,

    #[serde(default)]
    limit: LimitSettings,

    #[serde(default)]
    dodge: DodgeSettings,

    #[serde(default)]
    binds: BTreeMap<String, Action>,
}

impl TryFrom<ProfileFile> for Config {
    type Error = ConfigError;

    fn try_from(file: ProfileFile) -> Result<Self, Self::Error> {
        let mut binds = HashMap::new();
        let mut spellings: HashMap<Bind, String> = HashMap::new();

        for (name, action) in file.binds {
            let bind: Bind = name
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("Bind '{}': {}", name, e)))?;

            if let Some(first) = spellings.get(&bind) {
                return Err(ConfigError::Invalid(format!(
                    "'{}' and '{}' both name input {}; bind it only once",
                    first, name, bind
                )));
            }

            spellings.insert(bind, name);
            binds.insert(bind, action);
        }

        Ok(Self {
            settings: file.settings,
            mouse: file.mouse,
            limit: file.limit,
            dodge: file.dodge,
            binds,
        })
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Decay timer period
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Longest the event thread blocks waiting on the device
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// How long a wheel-bound button stays pressed per notch
    #[serde(default = "default_wheel_hold_ms")]
    pub wheel_hold_ms: u64,

    /// Consecutive failed submissions before falling back to pass-through
    #[serde(default = "default_max_submit_failures")]
    pub max_submit_failures: u32,

    /// Extra attempts per snapshot before a submission counts as failed
    #[serde(default = "default_submit_retries")]
    pub submit_retries: u32,

    /// First retry backoff, doubled per attempt
    #[serde(default = "default_submit_backoff_ms")]
    pub submit_backoff_ms: u64,

    /// Where to publish the current mode as JSON (disabled when unset)
    #[serde(default)]
    pub status_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            wheel_hold_ms: default_wheel_hold_ms(),
            max_submit_failures: default_max_submit_failures(),
            submit_retries: default_submit_retries(),
            submit_backoff_ms: default_submit_backoff_ms(),
            status_file: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn wheel_hold(&self) -> Duration {
        Duration::from_millis(self.wheel_hold_ms)
    }

    pub fn submit_backoff(&self) -> Duration {
        Duration::from_millis(self.submit_backoff_ms)
    }
}

fn default_tick_interval_ms() -> u64 { 8 }
fn default_poll_timeout_ms() -> u64 { 4 }
fn default_wheel_hold_ms() -> u64 { 50 }
fn default_max_submit_failures() -> u32 { 3 }
fn default_submit_retries() -> u32 { 2 }
fn default_submit_backoff_ms() -> u64 { 1 }

/// How a mouse-derived stick returns to center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayMode {
    /// Halves the displacement every half-life
    Exponential,

    /// Loses half of full deflection every half-life
    Linear,
}

/// Mouse -> stick conversion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MouseSettings {
    /// Stick driven by mouse motion
    #[serde(default = "default_mouse_stick")]
    pub stick: Stick,

    #[serde(default = "default_sensitivity")]
    pub sensitivity_x: f32,

    #[serde(default = "default_sensitivity")]
    pub sensitivity_y: f32,

    /// Acceleration exponent applied to the normalized magnitude
    #[serde(default = "default_exponent")]
    pub exponent: f32,

    /// Radial deadzone in (sensitivity-scaled) mouse counts
    #[serde(default = "default_mouse_deadzone")]
    pub deadzone: f32,

    /// Counts of displacement that produce full deflection
    #[serde(default = "default_range")]
    pub range: f32,

    #[serde(default = "default_decay")]
    pub decay: DecayMode,

    #[serde(default = "default_half_life_ms")]
    pub half_life_ms: u64,

    /// Moving the mouse down pushes the stick up
    #[serde(default)]
    pub invert_y: bool,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            stick: default_mouse_stick(),
            sensitivity_x: default_sensitivity(),
            sensitivity_y: default_sensitivity(),
            exponent: default_exponent(),
            deadzone: default_mouse_deadzone(),
            range: default_range(),
            decay: default_decay(),
            half_life_ms: default_half_life_ms(),
            invert_y: false,
        }
    }
}

impl MouseSettings {
    pub fn half_life(&self) -> Duration {
        Duration::from_millis(self.half_life_ms)
    }
}

fn default_mouse_stick() -> Stick { Stick::Right }
fn default_sensitivity() -> f32 { 1.0 }
fn default_exponent() -> f32 { 1.0 }
fn default_mouse_deadzone() -> f32 { 5.0 }
fn default_range() -> f32 { 100.0 }
fn default_decay() -> DecayMode { DecayMode::Exponential }
fn default_half_life_ms() -> u64 { 40 }

/// Radius limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitSettings {
    /// Amount one increase/decrease press changes the limit by
    #[serde(default = "default_limit_step")]
    pub step: f32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self { step: default_limit_step() }
    }
}

fn default_limit_step() -> f32 { 0.1 }

/// Dodge: pressing `jump` locks the mouse-driven stick to the sum of the
/// held direction binds for `lock_ms`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DodgeSettings {
    /// Dodge is disabled without a jump bind
    #[serde(default)]
    pub jump: Option<Bind>,

    #[serde(default)]
    pub forwards: Option<Bind>,

    #[serde(default)]
    pub backwards: Option<Bind>,

    #[serde(default)]
    pub left: Option<Bind>,

    #[serde(default)]
    pub right: Option<Bind>,

    #[serde(default = "default_dodge_lock_ms")]
    pub lock_ms: u64,
}

impl DodgeSettings {
    pub fn lock(&self) -> Duration {
        Duration::from_millis(self.lock_ms)
    }

    /// Direction binds with the stick offset each one contributes
    pub fn directions(&self) -> impl Iterator<Item = (Bind, Direction)> + '_ {
        [
            (self.forwards, Direction::Up),
            (self.backwards, Direction::Down),
            (self.left, Direction::Left),
            (self.right, Direction::Right),
        ]
        .into_iter()
        .filter_map(|(bind, direction)| bind.map(|bind| (bind, direction)))
    }
}

fn default_dodge_lock_ms() -> u64 { 50 }

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        Self::from_toml_str(&content)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_PROFILE_PATH)
    }

    /// Defaults compiled into the binary
    pub fn embedded() -> Result<Self, ConfigError> {
        info!("Loading embedded default configuration");
        Self::from_toml_str(EMBEDDED_PROFILE)
    }

    /// Parse and validate a profile held in memory
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ProfileFile = toml::from_str(content)?;
        let config = Config::try_from(file)?;

        info!("✓ Config parsed successfully");
        debug!("  - Binds: {}", config.binds.len());
        debug!("  - Mouse stick: {:?}", config.mouse.stick);
        debug!("  - Tick interval: {} ms", config.settings.tick_interval_ms);

        config.validate()?;
        info!("✓ Config validation passed");

        Ok(config)
    }

    /// The key bound to the mode toggle, if any
    pub fn toggle_key(&self) -> Option<KeyCode> {
        self.binds.iter().find_map(|(bind, action)| match (bind, action) {
            (Bind::Key(code), Action::Toggle) => Some(*code),
            _ => None,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_settings()?;
        self.validate_mouse()?;
        self.validate_toggle()?;
        self.validate_dodge()?;

        for (bind, action) in &self.binds {
            self.validate_bind(bind, action)?;
        }

        Ok(())
    }

    fn validate_settings(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;

        if settings.tick_interval_ms == 0 || settings.tick_interval_ms > 100 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be between 1 and 100".into()
            ));
        }

        if settings.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid("poll_timeout_ms must be positive".into()));
        }

        if settings.wheel_hold_ms == 0 {
            return Err(ConfigError::Invalid("wheel_hold_ms must be positive".into()));
        }

        if settings.max_submit_failures == 0 {
            return Err(ConfigError::Invalid("max_submit_failures must be positive".into()));
        }

        if !self.limit.step.is_finite() || self.limit.step <= 0.0 || self.limit.step > 1.0 {
            return Err(ConfigError::Invalid(
                "limit step must be within (0.0, 1.0]".into()
            ));
        }

        Ok(())
    }

    fn validate_mouse(&self) -> Result<(), ConfigError> {
        let mouse = &self.mouse;

        let non_negative = [
            ("sensitivity_x", mouse.sensitivity_x),
            ("sensitivity_y", mouse.sensitivity_y),
            ("deadzone", mouse.deadzone),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(
                    format!("mouse {} must be finite and non-negative (got {})", name, value)
                ));
            }
        }

        let positive = [("exponent", mouse.exponent), ("range", mouse.range)];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(
                    format!("mouse {} must be finite and positive (got {})", name, value)
                ));
            }
        }

        if mouse.half_life_ms == 0 {
            return Err(ConfigError::Invalid("mouse half_life_ms must be positive".into()));
        }

        if mouse.deadzone >= mouse.range {
            warn!(
                "mouse deadzone ({}) is not below range ({}); the stick only ever reads 0 or full",
                mouse.deadzone, mouse.range
            );
        }

        Ok(())
    }

    /// Exactly one toggle bind must exist, and it must be a key
    fn validate_toggle(&self) -> Result<(), ConfigError> {
        let toggles: Vec<&Bind> = self.binds.iter()
            .filter(|(_, action)| matches!(action, Action::Toggle))
            .map(|(bind, _)| bind)
            .collect();

        match toggles.as_slice() {
            [] => Err(ConfigError::Invalid(
                "A toggle bind is required (e.g. grave = { type = \"toggle\" })".into()
            )),
            [Bind::Key(_)] => Ok(()),
            [other] => Err(ConfigError::Invalid(
                format!("Toggle must be bound to a keyboard key, not '{}'", other)
            )),
            many => Err(ConfigError::Invalid(
                format!("Exactly one toggle bind is allowed, found {}", many.len())
            )),
        }
    }

    /// Dodge binds must be held inputs that are also bound in `[binds]`
    fn validate_dodge(&self) -> Result<(), ConfigError> {
        let dodge = &self.dodge;
        let Some(jump) = dodge.jump else {
            if dodge.directions().next().is_some() {
                warn!("dodge directions are set without a jump bind; dodge is disabled");
            }
            return Ok(());
        };

        if dodge.lock_ms == 0 {
            return Err(ConfigError::Invalid("dodge lock_ms must be positive".into()));
        }

        let named = std::iter::once(("jump", jump)).chain(
            [
                ("forwards", dodge.forwards),
                ("backwards", dodge.backwards),
                ("left", dodge.left),
                ("right", dodge.right),
            ]
            .into_iter()
            .filter_map(|(name, bind)| bind.map(|bind| (name, bind))),
        );

        for (name, bind) in named {
            if let Bind::Wheel(_) = bind {
                return Err(ConfigError::Invalid(
                    format!("dodge {} '{}' must be a key or mouse button", name, bind)
                ));
            }
            match self.binds.get(&bind) {
                None => {
                    return Err(ConfigError::Invalid(
                        format!("dodge {} '{}' is not bound in [binds]", name, bind)
                    ));
                }
                Some(Action::Toggle) => {
                    return Err(ConfigError::Invalid(
                        format!("dodge {} '{}' is the toggle key", name, bind)
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Validate a single bind and its action
    fn validate_bind(&self, bind: &Bind, action: &Action) -> Result<(), ConfigError> {
        if let Bind::Key(code) = bind {
            if code.raw() == 0 {
                return Err(ConfigError::Invalid("scan code 0x00 cannot be bound".into()));
            }
        }

        match action {
            Action::Analog { x, y, .. } => {
                if !x.is_finite() || !y.is_finite() || x.abs() > 1.0 || y.abs() > 1.0 {
                    return Err(ConfigError::Invalid(
                        format!("Analog bind '{}' must use coordinates within [-1.0, 1.0]", bind)
                    ));
                }
            }
            Action::None | Action::Toggle | Action::Button { .. } | Action::Trigger { .. }
            | Action::Direction { .. } | Action::Limit { .. } => {}
        }

        // Wheel notches have no release, so they can only pulse digital actions
        if let Bind::Wheel(_) = bind {
            if !matches!(action, Action::Button { .. } | Action::Trigger { .. } | Action::None) {
                return Err(ConfigError::Invalid(
                    format!("Wheel bind '{}' can only map to a button or trigger", bind)
                ));
            }
        }

        Ok(())
    }
}
