//! Runtime configuration for the monitor.
//!
//! A `Configuration` is validated before a run starts and again whenever it is
//! swapped into a running worker. The worker never sees a half-valid value.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_modules::colormap::Colormap;
use crate::error::{Error, Result};

/// Unit of the sensor readings and of the temperature threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TempUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            TempUnit::Celsius => "C",
            TempUnit::Fahrenheit => "F",
        }
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TempUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "C" | "c" => Ok(TempUnit::Celsius),
            "F" | "f" => Ok(TempUnit::Fahrenheit),
            other => Err(Error::Configuration(format!(
                "temp_unit must be 'C' or 'F' (got '{other}')"
            ))),
        }
    }
}

/// Everything the worker needs to process frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Faces at or above this reading are in violation. Must be positive.
    pub temp_threshold: f32,
    pub temp_unit: TempUnit,
    /// Index into the palette table, `0..22`.
    pub colormap_index: i32,
    /// Identifier or path of the detector model.
    pub model_name: String,
    /// Minimum detector confidence, `0.0..=1.0`.
    pub confidence_threshold: f32,
    pub use_gpu: bool,
    pub sound_enabled: bool,
    /// Stamp the frame rate onto presented images.
    pub show_fps: bool,
    /// Width of presented images. `None` keeps the sensor resolution.
    pub display_width: Option<i32>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            temp_threshold: 38.0,
            temp_unit: TempUnit::Celsius,
            colormap_index: Colormap::Jet.index(),
            model_name: "face-detector".to_string(),
            confidence_threshold: 0.5,
            use_gpu: false,
            sound_enabled: true,
            show_fps: false,
            display_width: None,
        }
    }
}

impl Configuration {
    /// Checks every field against its domain.
    pub fn validate(&self) -> Result<()> {
        if !(self.temp_threshold.is_finite() && self.temp_threshold > 0.0) {
            return Err(Error::Configuration(format!(
                "temp_threshold must be a positive number (got {})",
                self.temp_threshold
            )));
        }
        self.colormap()?;
        if self.model_name.trim().is_empty() {
            return Err(Error::Configuration("model_name must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Configuration(format!(
                "confidence_threshold must be within [0, 1] (got {})",
                self.confidence_threshold
            )));
        }
        if let Some(width) = self.display_width {
            if width <= 0 {
                return Err(Error::Configuration(format!(
                    "display_width must be greater than 0 (got {width})"
                )));
            }
        }
        Ok(())
    }

    /// The palette selected by `colormap_index`.
    pub fn colormap(&self) -> Result<Colormap> {
        Colormap::from_index(self.colormap_index).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Builds a configuration from the flat key/value settings written by the
    /// settings dialog. Flags are stored as `0`/`1`, the palette by name.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self> {
        let config = Self {
            temp_threshold: parse_number(settings, "temp_thresh")?,
            temp_unit: setting(settings, "temp_unit")?.parse()?,
            colormap_index: Colormap::from_name(setting(settings, "color_map")?)
                .map_err(|e| Error::Configuration(e.to_string()))?
                .index(),
            model_name: setting(settings, "model")?.trim().to_string(),
            confidence_threshold: parse_number(settings, "confidence_thresh")?,
            use_gpu: parse_flag(settings, "use_gpu")?,
            sound_enabled: parse_flag(settings, "sound")?,
            show_fps: parse_flag(settings, "fps")?,
            display_width: match settings.get("display_width") {
                Some(value) => Some(value.trim().parse().map_err(|_| {
                    Error::Configuration(format!(
                        "display_width must be an integer (got '{value}')"
                    ))
                })?),
                None => None,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    settings
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| Error::Configuration(format!("missing setting '{key}'")))
}

fn parse_number(settings: &HashMap<String, String>, key: &str) -> Result<f32> {
    let value = setting(settings, key)?;
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{key} must be a number (got '{value}')")))
}

fn parse_flag(settings: &HashMap<String, String>, key: &str) -> Result<bool> {
    let value = setting(settings, key)?;
    value
        .trim()
        .parse::<i64>()
        .map(|v| v != 0)
        .map_err(|_| Error::Configuration(format!("{key} must be 0 or 1 (got '{value}')")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> HashMap<String, String> {
        [
            ("temp_thresh", "37.5"),
            ("temp_unit", "C"),
            ("color_map", "INFERNO"),
            ("model", "yolo-face"),
            ("confidence_thresh", "0.4"),
            ("use_gpu", "0"),
            ("sound", "1"),
            ("fps", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn default_configuration_is_valid() {
        Configuration::default().validate().unwrap();
    }

    #[test]
    fn settings_are_parsed_into_a_configuration() {
        let config = Configuration::from_settings(&settings()).unwrap();
        assert_eq!(config.temp_threshold, 37.5);
        assert_eq!(config.temp_unit, TempUnit::Celsius);
        assert_eq!(config.colormap_index, Colormap::Inferno.index());
        assert_eq!(config.model_name, "yolo-face");
        assert!(!config.use_gpu);
        assert!(config.sound_enabled);
        assert!(config.show_fps);
        assert_eq!(config.display_width, None);
    }

    #[test]
    fn missing_or_malformed_settings_fail() {
        let mut missing = settings();
        missing.remove("model");
        assert!(matches!(Configuration::from_settings(&missing), Err(Error::Configuration(_))));

        let mut malformed = settings();
        malformed.insert("sound".to_string(), "yes".to_string());
        assert!(matches!(Configuration::from_settings(&malformed), Err(Error::Configuration(_))));

        let mut unknown_palette = settings();
        unknown_palette.insert("color_map".to_string(), "SEPIA".to_string());
        assert!(matches!(
            Configuration::from_settings(&unknown_palette),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn out_of_domain_fields_are_rejected() {
        let breakages: [fn(&mut Configuration); 7] = [
            |c| c.temp_threshold = 0.0,
            |c| c.temp_threshold = f32::NAN,
            |c| c.colormap_index = 22,
            |c| c.colormap_index = -1,
            |c| c.model_name = "  ".to_string(),
            |c| c.confidence_threshold = 1.5,
            |c| c.display_width = Some(0),
        ];
        for breakage in breakages {
            let mut config = Configuration::default();
            breakage(&mut config);
            assert!(
                matches!(config.validate(), Err(Error::Configuration(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn configuration_round_trips_through_json() {
        let config = Configuration {
            temp_unit: TempUnit::Fahrenheit,
            display_width: Some(320),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"temp_unit\":\"F\""));
        let parsed: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let parsed: Configuration = serde_json::from_str(r#"{"temp_threshold": 99.5}"#).unwrap();
        assert_eq!(parsed.temp_threshold, 99.5);
        assert_eq!(parsed.model_name, Configuration::default().model_name);
    }
}
