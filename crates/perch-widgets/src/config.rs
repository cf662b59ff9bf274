//! Option presets loaded from a TOML file.
//!
//! Every section and field is optional; anything missing keeps the widget's
//! built-in default. A missing file is not an error.
//!
//! ```toml
//! [popup]
//! show = "click"
//! hide = "blur"
//!
//! [tooltip]
//! placement = "bottom"
//! show_delay_ms = 300
//!
//! [uploader]
//! accept = "png,jpg"
//! max_size = 1048576
//! ```

use crate::position::Placement;
use crate::tooltip::TooltipOptions;
use crate::trigger::TriggerSpec;
use crate::uploader::UploaderOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[{section}] {field}: {reason}")]
    Invalid {
        section: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Trigger configuration shared by generic popups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Comma-separated show triggers, e.g. `"over,click"`.
    pub show: String,
    pub hide: String,
    pub show_delay_ms: u64,
    pub hide_delay_ms: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            show: "click".to_string(),
            hide: "blur".to_string(),
            show_delay_ms: 0,
            hide_delay_ms: 0,
        }
    }
}

fn spec(section: &'static str, field: &'static str, kinds: &str, delay_ms: u64) -> Result<TriggerSpec, ConfigError> {
    TriggerSpec::parse(kinds, Duration::from_millis(delay_ms)).map_err(|e| ConfigError::Invalid {
        section,
        field,
        reason: e.to_string(),
    })
}

impl PopupConfig {
    pub fn show_spec(&self) -> Result<TriggerSpec, ConfigError> {
        spec("popup", "show", &self.show, self.show_delay_ms)
    }

    pub fn hide_spec(&self) -> Result<TriggerSpec, ConfigError> {
        spec("popup", "hide", &self.hide, self.hide_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    pub title: Option<String>,
    pub placement: String,
    pub show: String,
    pub hide: String,
    pub show_delay_ms: u64,
    pub hide_delay_ms: u64,
    pub share: bool,
    pub max_width: u16,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            title: None,
            placement: "top".to_string(),
            show: "over".to_string(),
            hide: "out".to_string(),
            show_delay_ms: 200,
            hide_delay_ms: 200,
            share: true,
            max_width: 40,
        }
    }
}

impl TooltipConfig {
    pub fn options(&self) -> Result<TooltipOptions, ConfigError> {
        let placement = self
            .placement
            .parse::<Placement>()
            .map_err(|()| ConfigError::Invalid {
                section: "tooltip",
                field: "placement",
                reason: format!("unknown placement `{}`", self.placement),
            })?;
        Ok(TooltipOptions {
            title: self.title.clone(),
            placement,
            show: spec("tooltip", "show", &self.show, self.show_delay_ms)?,
            hide: spec("tooltip", "hide", &self.hide, self.hide_delay_ms)?,
            share: self.share,
            max_width: self.max_width,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Comma-separated extensions; empty accepts everything.
    pub accept: String,
    pub max_size: Option<u64>,
    pub multiple: bool,
    pub auto_start: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            accept: String::new(),
            max_size: None,
            multiple: true,
            auto_start: false,
        }
    }
}

impl UploaderConfig {
    pub fn options(&self) -> UploaderOptions {
        UploaderOptions {
            max_size: self.max_size,
            multiple: self.multiple,
            auto_start: self.auto_start,
            ..UploaderOptions::default()
        }
        .accept(&self.accept)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub popup: PopupConfig,
    pub tooltip: TooltipConfig,
    pub uploader: UploaderConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`; a file that does not exist yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::from_toml(&text)?;
                tracing::debug!(path = %path.display(), "loaded presets");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no preset file, using defaults");
                Ok(Config::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::TriggerKind;

    #[test]
    fn defaults_match_widget_defaults() {
        let config = Config::default();
        assert_eq!(config.tooltip.options().unwrap(), TooltipOptions::default());
        assert_eq!(config.uploader.options(), UploaderOptions::default());
        assert_eq!(
            config.popup.show_spec().unwrap(),
            TriggerSpec::new([TriggerKind::Click], Duration::ZERO)
        );
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = Config::from_toml(
            r#"
            [tooltip]
            placement = "bottom"
            show_delay_ms = 300

            [uploader]
            accept = ".png, jpg"
            max_size = 1024
            "#,
        )
        .unwrap();
        let tip = config.tooltip.options().unwrap();
        assert_eq!(tip.placement, Placement::Bottom);
        assert_eq!(tip.show.delay, Duration::from_millis(300));
        assert_eq!(tip.hide.delay, Duration::from_millis(200));
        assert!(tip.share);

        let up = config.uploader.options();
        assert_eq!(up.accept, vec!["png", "jpg"]);
        assert_eq!(up.max_size, Some(1024));
        assert!(up.multiple);
        assert_eq!(config.popup, PopupConfig::default());
    }

    #[test]
    fn invalid_values_are_reported() {
        let config = Config::from_toml("[tooltip]\nplacement = \"middle\"").unwrap();
        assert!(matches!(
            config.tooltip.options(),
            Err(ConfigError::Invalid { field: "placement", .. })
        ));

        let config = Config::from_toml("[popup]\nshow = \"hover\"").unwrap();
        assert!(matches!(config.popup.show_spec(), Err(ConfigError::Invalid { field: "show", .. })));

        assert!(matches!(Config::from_toml("[popup\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_reads_file_or_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load(dir.path().join("perch.toml")).unwrap();
        assert_eq!(missing, Config::default());

        let path = dir.path().join("presets.toml");
        std::fs::write(&path, "[popup]\nshow = \"over\"\nshow_delay_ms = 50\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.popup.show_spec().unwrap(),
            TriggerSpec::new([TriggerKind::Over], Duration::from_millis(50))
        );

        assert!(matches!(Config::load(dir.path()), Err(ConfigError::Io { .. })));
    }
}
