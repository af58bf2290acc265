use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for directive documents.
///
/// This struct holds the settings that control how directive points are
/// created in the document and how many copies are printed by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Paragraph style applied to the heading of new directive points.
    point_style: String,

    /// Text written into the first-point marker when it is switched on.
    first_point_placeholder: String,

    /// Number of copies printed for a point when no count is given.
    pub default_copies: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            point_style: default_point_style(),
            first_point_placeholder: default_first_point_placeholder(),
            default_copies: default_copies(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The paragraph style of directive point headings.
    #[must_use]
    pub fn point_style(&self) -> &str {
        &self.point_style
    }

    /// The placeholder written into the first-point marker.
    #[must_use]
    pub fn first_point_placeholder(&self) -> &str {
        &self.first_point_placeholder
    }

    /// Copy counts for `points` points: the given counts, padded with
    /// [`Config::default_copies`].
    #[must_use]
    pub fn copies_for(&self, points: usize, given: &[u32]) -> Vec<u32> {
        (0..points)
            .map(|index| given.get(index).copied().unwrap_or(self.default_copies))
            .collect()
    }
}

fn default_point_style() -> String {
    "FormboxVerfuegungspunkt".to_string()
}

fn default_first_point_placeholder() -> String {
    "I.".to_string()
}

const fn default_copies() -> u32 {
    1
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_point_style")]
        point_style: String,

        #[serde(default = "default_first_point_placeholder")]
        first_point_placeholder: String,

        #[serde(default = "default_copies")]
        default_copies: u32,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                point_style,
                first_point_placeholder,
                default_copies,
            } => Self {
                point_style,
                first_point_placeholder,
                default_copies,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            point_style: config.point_style,
            first_point_placeholder: config.first_point_placeholder,
            default_copies: config.default_copies,
        }
    }
}
