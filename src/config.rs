use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, de};

use crate::error::AppError;
use crate::gpio::{Direction, PinDescriptor};

pub const DEFAULT_CHIP_PATH: &str = "/dev/gpiochip0";

fn default_chip() -> String {
    DEFAULT_CHIP_PATH.to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    pub name: String,
    #[serde(default = "default_chip")]
    pub chip: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PinEntry {
    pub name: Option<String>,
    pub module: Option<String>,
    #[serde(default, deserialize_with = "deserialize_pin")]
    pub pin: Option<u32>,
}

/// The slice of a gpio2mqtt config this tool cares about. Every other
/// section (mqtt, analog channels, ...) is ignored.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GpioConfig {
    #[serde(default)]
    pub gpio_modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub digital_inputs: Vec<PinEntry>,
    #[serde(default)]
    pub digital_outputs: Vec<PinEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PinValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

fn deserialize_pin<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<PinValue>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let line = match &value {
        PinValue::Integer(n) => u32::try_from(*n).ok(),
        // `5.0` still names line 5
        PinValue::Float(f) if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(f) => {
            Some(*f as u32)
        }
        PinValue::Float(_) => None,
        PinValue::Text(text) => text.trim().parse::<u32>().ok(),
    };
    line.map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid pin number: {value}")))
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinValue::Integer(n) => write!(f, "{n}"),
            PinValue::Float(x) => write!(f, "{x}"),
            PinValue::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl GpioConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::ConfigNotFound(path.display().to_string()),
            _ => AppError::Config(format!("Failed to read config: {e}")),
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, AppError> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid config yaml: {e}")))?;
        // empty or comment-only document
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value)
            .map_err(|e| AppError::Config(format!("Invalid config yaml: {e}")))
    }

    /// Module name to chip device path. Later duplicates win.
    pub fn module_chips(&self) -> FxHashMap<&str, &str> {
        self.gpio_modules
            .iter()
            .map(|m| (m.name.as_str(), m.chip.as_str()))
            .collect()
    }

    /// Flattens inputs then outputs into pin descriptors, in document order.
    /// Entries without a pin number are dropped.
    pub fn collect_pins(&self) -> Vec<PinDescriptor> {
        let chips = self.module_chips();
        let inputs = self.digital_inputs.iter().map(|e| (e, Direction::Input));
        let outputs = self.digital_outputs.iter().map(|e| (e, Direction::Output));

        inputs
            .chain(outputs)
            .filter_map(|(entry, direction)| {
                let line = entry.pin?;
                let module = entry.module.clone().unwrap_or_default();
                let chip_path = chips
                    .get(module.as_str())
                    .copied()
                    .unwrap_or(DEFAULT_CHIP_PATH);
                let name = entry
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{direction}_{line}"));

                Some(PinDescriptor {
                    name,
                    module,
                    line,
                    chip_path: PathBuf::from(chip_path),
                    direction,
                })
            })
            .collect()
    }
}
