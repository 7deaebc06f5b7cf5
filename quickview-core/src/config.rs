//! Process-wide quick-mode configuration.
//!
//! [`QuickConfig`] is built once at startup (defaults, a TOML file and/or
//! environment variables), validated, and then shared read-only through
//! `Arc` with every viewset.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `QUICKVIEW_ALWAYS_QUICK` | `always_quick` |
//! | `QUICKVIEW_DATETIME_FORMAT` | `datetime_format` |
//! | `QUICKVIEW_HANDLE_DATETIMES` | `handle_datetimes` |
//! | `QUICKVIEW_PAGE_SIZE_PARAM` | `page_size_param` |
//! | `QUICKVIEW_QUICK_PARAM` | `quick_param` |
//! | `QUICKVIEW_PAGE_PARAM` | `page_param` |
//! | `QUICKVIEW_DEFAULT_PAGE_SIZE` | `default_page_size` |
//! | `QUICKVIEW_MAX_PAGE_SIZE` | `max_page_size` |
//!
//! ```rust
//! use quickview_core::config::{MapEnvSource, QuickConfig};
//!
//! let env = MapEnvSource::new()
//!     .set("QUICKVIEW_ALWAYS_QUICK", "true")
//!     .set("QUICKVIEW_DATETIME_FORMAT", "%d.%m.%Y");
//!
//! let config = QuickConfig::default().with_env(&env).unwrap();
//! assert!(config.always_quick);
//! assert_eq!(config.datetime_format, "%d.%m.%Y");
//! assert_eq!(config.quick_param, "quick");
//! ```

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{QuickError, QuickResult};

/// Default datetime render format.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y/%m/%d";

/// Default name of the quick-mode query parameter.
pub const DEFAULT_QUICK_PARAM: &str = "quick";

/// Default name of the page size query parameter.
pub const DEFAULT_PAGE_SIZE_PARAM: &str = "page_size";

/// Default name of the page number query parameter.
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// Quick-mode configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickConfig {
    /// Force quick mode for every request.
    pub always_quick: bool,

    /// strftime-style format applied to datetime values.
    pub datetime_format: String,

    /// Render datetime values with `datetime_format`.
    pub handle_datetimes: bool,

    /// Name of the page size query parameter.
    pub page_size_param: String,

    /// Name of the quick-mode toggle query parameter.
    pub quick_param: String,

    /// Name of the page number query parameter.
    pub page_param: String,

    /// Page size used when the request gives none; `None` disables
    /// pagination unless requested.
    pub default_page_size: Option<usize>,

    /// Upper bound on the page size a request may ask for.
    pub max_page_size: Option<usize>,
}

impl Default for QuickConfig {
    fn default() -> Self {
        Self {
            always_quick: false,
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            handle_datetimes: true,
            page_size_param: DEFAULT_PAGE_SIZE_PARAM.to_string(),
            quick_param: DEFAULT_QUICK_PARAM.to_string(),
            page_param: DEFAULT_PAGE_PARAM.to_string(),
            default_page_size: None,
            max_page_size: None,
        }
    }
}

impl QuickConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> QuickResult<Self> {
        let config: QuickConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> QuickResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> QuickResult<Self> {
        Self::default().with_env(&StdEnvSource)
    }

    /// Override fields from environment variables, then validate.
    pub fn with_env<S: EnvSource>(mut self, env: &S) -> QuickResult<Self> {
        if let Some(v) = env.get("QUICKVIEW_ALWAYS_QUICK") {
            self.always_quick = parse_bool("QUICKVIEW_ALWAYS_QUICK", &v)?;
        }
        if let Some(v) = env.get("QUICKVIEW_DATETIME_FORMAT") {
            self.datetime_format = v;
        }
        if let Some(v) = env.get("QUICKVIEW_HANDLE_DATETIMES") {
            self.handle_datetimes = parse_bool("QUICKVIEW_HANDLE_DATETIMES", &v)?;
        }
        if let Some(v) = env.get("QUICKVIEW_PAGE_SIZE_PARAM") {
            self.page_size_param = v;
        }
        if let Some(v) = env.get("QUICKVIEW_QUICK_PARAM") {
            self.quick_param = v;
        }
        if let Some(v) = env.get("QUICKVIEW_PAGE_PARAM") {
            self.page_param = v;
        }
        if let Some(v) = env.get("QUICKVIEW_DEFAULT_PAGE_SIZE") {
            self.default_page_size = Some(parse_size("QUICKVIEW_DEFAULT_PAGE_SIZE", &v)?);
        }
        if let Some(v) = env.get("QUICKVIEW_MAX_PAGE_SIZE") {
            self.max_page_size = Some(parse_size("QUICKVIEW_MAX_PAGE_SIZE", &v)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Set `always_quick`.
    pub fn always_quick(mut self, always: bool) -> Self {
        self.always_quick = always;
        self
    }

    /// Set the datetime format.
    pub fn datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Enable or disable datetime rendering.
    pub fn handle_datetimes(mut self, handle: bool) -> Self {
        self.handle_datetimes = handle;
        self
    }

    /// Set the quick-mode parameter name.
    pub fn quick_param(mut self, name: impl Into<String>) -> Self {
        self.quick_param = name.into();
        self
    }

    /// Set the page size parameter name.
    pub fn page_size_param(mut self, name: impl Into<String>) -> Self {
        self.page_size_param = name.into();
        self
    }

    /// Set the page number parameter name.
    pub fn page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = name.into();
        self
    }

    /// Set the default page size.
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = Some(size);
        self
    }

    /// Set the maximum page size.
    pub fn max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = Some(size);
        self
    }

    /// Check the configuration for values that would fail at request time.
    pub fn validate(&self) -> QuickResult<()> {
        validate_datetime_format(&self.datetime_format)?;

        let params = [
            ("quick_param", &self.quick_param),
            ("page_size_param", &self.page_size_param),
            ("page_param", &self.page_param),
        ];
        for (field, name) in &params {
            if name.trim().is_empty() {
                return Err(QuickError::configuration(format!("{} must not be empty", field))
                    .with_field(*field));
            }
        }
        for (i, (field, name)) in params.iter().enumerate() {
            if let Some((other, _)) = params[i + 1..].iter().find(|(_, n)| n == name) {
                return Err(QuickError::configuration(format!(
                    "{} and {} both use the parameter name '{}'",
                    field, other, name
                )));
            }
        }

        if self.default_page_size == Some(0) || self.max_page_size == Some(0) {
            return Err(QuickError::configuration("page sizes must be greater than zero"));
        }
        if let (Some(default), Some(max)) = (self.default_page_size, self.max_page_size) {
            if default > max {
                return Err(QuickError::configuration(format!(
                    "default_page_size ({}) exceeds max_page_size ({})",
                    default, max
                )));
            }
        }
        Ok(())
    }
}

/// Reject strftime formats chrono cannot render for a naive datetime.
///
/// Offset and zone items (`%z`, `%Z`, `%:z`) parse but fail at render time,
/// so the format is also rendered once against a sample value.
pub fn validate_datetime_format(format: &str) -> QuickResult<()> {
    let invalid = || {
        QuickError::configuration(format!("invalid datetime format '{}'", format))
            .with_field("datetime_format")
    };
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    let mut sample = String::new();
    write!(sample, "{}", NaiveDateTime::default().format(format)).map_err(|_| {
        invalid().with_suggestion("naive datetimes carry no offset or time zone")
    })?;
    Ok(())
}

fn parse_bool(name: &str, value: &str) -> QuickResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(QuickError::configuration(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_size(name: &str, value: &str) -> QuickResult<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        QuickError::configuration(format!("{} must be a positive integer: {}", name, e))
            .with_source(e)
    })
}

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = QuickConfig::default();
        assert!(!config.always_quick);
        assert_eq!(config.datetime_format, "%Y/%m/%d");
        assert!(config.handle_datetimes);
        assert_eq!(config.page_size_param, "page_size");
        assert_eq!(config.quick_param, "quick");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = QuickConfig::from_toml_str(
            r#"
            always_quick = true
            quick_param = "fast"
            "#,
        )
        .unwrap();
        assert!(config.always_quick);
        assert_eq!(config.quick_param, "fast");
        assert_eq!(config.datetime_format, DEFAULT_DATETIME_FORMAT);
    }

    #[test]
    fn test_toml_rejects_bad_format() {
        let err = QuickConfig::from_toml_str(r#"datetime_format = "%Y-%Q""#).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_rejects_offset_formats() {
        for format in ["%Y %z", "%d.%m.%Y %Z", "%H:%M%:z"] {
            let err = QuickConfig::default().datetime_format(format).validate().unwrap_err();
            assert_eq!(err.context.field.as_deref(), Some("datetime_format"), "{format}");
        }
        let toml = r#"datetime_format = "%Y %z""#;
        assert!(QuickConfig::from_toml_str(toml).unwrap_err().is_configuration_error());
        assert!(validate_datetime_format("%Y-%m-%dT%H:%M:%S%.3f").is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env = MapEnvSource::new()
            .set("QUICKVIEW_HANDLE_DATETIMES", "no")
            .set("QUICKVIEW_PAGE_SIZE_PARAM", "limit")
            .set("QUICKVIEW_MAX_PAGE_SIZE", "50");
        let config = QuickConfig::default().with_env(&env).unwrap();
        assert!(!config.handle_datetimes);
        assert_eq!(config.page_size_param, "limit");
        assert_eq!(config.max_page_size, Some(50));
    }

    #[test]
    fn test_env_bad_bool() {
        let env = MapEnvSource::new().set("QUICKVIEW_ALWAYS_QUICK", "sometimes");
        assert!(QuickConfig::default().with_env(&env).is_err());
    }

    #[test]
    fn test_param_names_must_differ() {
        let config = QuickConfig::default().quick_param("page");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(QuickConfig::default().default_page_size(0).validate().is_err());
        let config = QuickConfig::default().default_page_size(100).max_page_size(10);
        assert!(config.validate().is_err());
        let config = QuickConfig::default().default_page_size(10).max_page_size(100);
        assert!(config.validate().is_ok());
    }
}
