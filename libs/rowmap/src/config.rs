use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_DELIMITER: &str = "\t";

/// Mapper settings, loadable from JSON or TOML.
///
/// ```toml
/// delimiter = "\\t"
/// header = ["eventDate", "count"]
/// require_binary = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Field separator of text rows. The escapes `\t` and `\n` are accepted
    /// in their two-character form.
    pub delimiter: String,

    /// Active field order. Empty = full schema order.
    pub header: Vec<String>,

    /// Fail construction unless every field's codec has a binary encoding.
    pub require_binary: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            header: Vec::new(),
            require_binary: false,
        }
    }
}

impl MapperConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validated()
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, Error> {
        let cfg: Self = toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validated()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    fn validated(mut self) -> Result<Self, Error> {
        self.delimiter = parse_delimiter(&self.delimiter)?;
        Ok(self)
    }
}

/// Resolve escaped delimiter spellings; rejects the empty delimiter.
pub fn parse_delimiter(s: &str) -> Result<String, Error> {
    match s {
        "" => Err(Error::Config("delimiter must not be empty".to_string())),
        "\\t" => Ok("\t".to_string()),
        "\\n" => Ok("\n".to_string()),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_tab_and_full_header() {
        let cfg = MapperConfig::from_json("{}").unwrap();
        assert_eq!(cfg, MapperConfig::default());
        assert_eq!(cfg.delimiter, "\t");
    }

    #[test]
    fn toml_with_escaped_delimiter() {
        let cfg = MapperConfig::from_toml(
            r#"
            delimiter = "\\t"
            header = ["count", "eventDate"]
            require_binary = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.delimiter, "\t");
        assert_eq!(cfg.header, ["count", "eventDate"]);
        assert!(cfg.require_binary);
    }

    #[test]
    fn json_multi_char_delimiter() {
        let cfg = MapperConfig::from_json(r#"{"delimiter": "||"}"#).unwrap();
        assert_eq!(cfg.delimiter, "||");
    }

    #[test]
    fn empty_delimiter_is_rejected() {
        assert!(matches!(
            MapperConfig::from_json(r#"{"delimiter": ""}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unknown_type_is_config_error() {
        assert!(MapperConfig::from_toml("header = 3").is_err());
    }
}
