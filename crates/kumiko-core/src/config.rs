//! Configuration: TOML on disk, validated tables in memory.
//!
//! The file is deserialized into a raw shape with serde defaults, then
//! validated into [`Config`]: binding strings become a lookup table,
//! color strings become parsed colors, autoconf patterns become compiled
//! regexes. Any invalid value fails the whole load; the compositor
//! refuses to start on a bad config rather than running with part of it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geometry::Anchor;
use crate::input::{BindingError, Bindings};
use crate::mark::MarkId;
use crate::sheet::SheetIndex;
use crate::split::{ContainerLayout, Spacing, Split, SplitTree};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid color value: {0}")]
    Color(String),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("invalid autoconf pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("layout {0:?} referenced but not defined")]
    UnknownLayout(String),
}

/// An opaque 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    /// Parse "#rrggbb".
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::Color(s.to_string()))?;
        if hex.len() != 6 {
            return Err(ConfigError::Color(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| ConfigError::Color(s.to_string()))
    }
}

/// Indicator and border colors.
#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub active: Color,
    pub inactive: Color,
    pub insert: Color,
    pub selected: Color,
    pub conflict: Color,
    pub background: Color,
}

/// One per-app-id rule applied when a surface maps.
#[derive(Debug, Clone)]
pub struct AutoconfRule {
    pub pattern: Regex,
    pub sheet: Option<SheetIndex>,
    pub group: Option<String>,
    pub mark: Option<MarkId>,
    pub position: Option<Anchor>,
    pub focus: bool,
}

impl AutoconfRule {
    pub fn matches(&self, app_id: &str) -> bool {
        self.pattern.is_match(app_id)
    }
}

/// Validated configuration.
#[derive(Debug)]
pub struct Config {
    pub spacing: Spacing,
    pub font: String,
    pub indicator_height: u32,
    pub colors: Colors,
    pub bindings: Bindings,
    pub layouts: HashMap<String, SplitTree>,
    pub macros: IndexMap<String, String>,
    pub autoconf: Vec<AutoconfRule>,
    pub backgrounds: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        RawConfig::default()
            .validate()
            .unwrap_or_else(|_| unreachable!("builtin defaults are valid"))
    }
}

impl Config {
    /// Load from `path`, or from the first discovered config file. A
    /// missing file yields the defaults; a malformed one is fatal.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(Self::find_config_file);
        let raw = match path {
            Some(path) if path.exists() => {
                info!("loading configuration from {path:?}");
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path:?}"))?;
                toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file {path:?}"))?
            }
            Some(path) => {
                warn!("config file not found at {path:?}, using defaults");
                RawConfig::default()
            }
            None => {
                info!("no config file found, using defaults");
                RawConfig::default()
            }
        };
        raw.validate().context("invalid configuration")
    }

    fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("kumiko/kumiko.toml")),
            dirs::home_dir().map(|p| p.join(".config/kumiko/kumiko.toml")),
            Some(PathBuf::from("/etc/kumiko/kumiko.toml")),
        ];
        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// First autoconf rule matching `app_id`.
    pub fn autoconf_for(&self, app_id: &str) -> Option<&AutoconfRule> {
        self.autoconf.iter().find(|r| r.matches(app_id))
    }

    pub fn layout(&self, name: &str) -> Option<SplitTree> {
        self.layouts.get(name).map(Arc::clone)
    }
}

// ── Raw on-disk shape ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    ui: RawUi,
    colors: RawColors,
    bindings: HashMap<String, String>,
    layouts: HashMap<String, Split>,
    macros: IndexMap<String, String>,
    autoconf: Vec<RawAutoconf>,
    outputs: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawUi {
    gap: u32,
    border: u32,
    font: String,
    indicator_height: u32,
}

impl Default for RawUi {
    fn default() -> Self {
        Self {
            gap: 10,
            border: 2,
            font: "monospace 10".to_string(),
            indicator_height: 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawColors {
    active: String,
    inactive: String,
    insert: String,
    selected: String,
    conflict: String,
    background: String,
}

impl Default for RawColors {
    fn default() -> Self {
        Self {
            active: "#5f875f".to_string(),
            inactive: "#465945".to_string(),
            insert: "#87875f".to_string(),
            selected: "#875f87".to_string(),
            conflict: "#875f5f".to_string(),
            background: "#1d2021".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAutoconf {
    app_id: String,
    #[serde(default)]
    sheet: Option<SheetIndex>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    mark: Option<MarkId>,
    #[serde(default)]
    position: Option<Anchor>,
    #[serde(default)]
    focus: bool,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    name: String,
    #[serde(default)]
    background: Option<String>,
}

impl RawConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        let colors = Colors {
            active: Color::parse(&self.colors.active)?,
            inactive: Color::parse(&self.colors.inactive)?,
            insert: Color::parse(&self.colors.insert)?,
            selected: Color::parse(&self.colors.selected)?,
            conflict: Color::parse(&self.colors.conflict)?,
            background: Color::parse(&self.colors.background)?,
        };

        let bindings = if self.bindings.is_empty() {
            default_bindings()?
        } else {
            Bindings::from_entries(
                self.bindings
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )?
        };

        let layouts: HashMap<String, SplitTree> = self
            .layouts
            .is_empty()
            .then(default_layouts)
            .unwrap_or_else(|| {
                self.layouts
                    .into_iter()
                    .map(|(name, split)| (name, SplitTree::new(split)))
                    .collect()
            });

        for action in bindings.actions() {
            if let crate::input::Action::ApplyLayout(name) = action {
                if !layouts.contains_key(name) {
                    return Err(ConfigError::UnknownLayout(name.clone()));
                }
            }
        }

        let autoconf = self
            .autoconf
            .into_iter()
            .map(|raw| {
                let pattern = Regex::new(&raw.app_id).map_err(|source| ConfigError::Pattern {
                    pattern: raw.app_id.clone(),
                    source,
                })?;
                Ok(AutoconfRule {
                    pattern,
                    sheet: raw.sheet,
                    group: raw.group,
                    mark: raw.mark,
                    position: raw.position,
                    focus: raw.focus,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let backgrounds = self
            .outputs
            .into_iter()
            .filter_map(|o| o.background.map(|bg| (o.name, bg)))
            .collect();

        Ok(Config {
            spacing: Spacing {
                gap: self.ui.gap,
                border: self.ui.border,
            },
            font: self.ui.font,
            indicator_height: self.ui.indicator_height,
            colors,
            bindings,
            layouts,
            macros: self.macros,
            autoconf,
            backgrounds,
        })
    }
}

fn default_bindings() -> Result<Bindings, BindingError> {
    Bindings::from_entries([
        ("super+return", "exec foot"),
        ("super+shift+q", "close"),
        ("super+shift+e", "quit"),
        ("super+n", "cycle view next"),
        ("super+p", "cycle view prev"),
        ("super+tab", "sheet alternate"),
        ("super+period", "sheet next"),
        ("super+comma", "sheet prev"),
        ("super+f", "maximize full"),
        ("super+v", "maximize vertical"),
        ("super+h", "maximize horizontal"),
        ("super+u", "unmaximize"),
        ("super+shift+r", "reset"),
        ("super+space", "floating"),
        ("super+i", "hide"),
        ("super+shift+i", "show all"),
        ("super+o", "group raise"),
        ("super+shift+o", "group lower"),
        ("super+r", "mode resize"),
        ("super+m", "mode move"),
        ("super+g", "mode group-assign"),
        ("super+s", "mode sheet-assign"),
        ("super+apostrophe", "mode mark-assign"),
        ("super+semicolon", "mode mark-select"),
        ("super+t", "mode layout-select"),
        ("super+x", "mode exec"),
        ("super+escape", "mode input-grab"),
        ("super+backspace", "lock"),
        ("super+1", "sheet 1"),
        ("super+2", "sheet 2"),
        ("super+3", "sheet 3"),
        ("super+4", "sheet 4"),
        ("super+5", "sheet 5"),
        ("super+6", "sheet 6"),
        ("super+7", "sheet 7"),
        ("super+8", "sheet 8"),
        ("super+9", "sheet 9"),
        ("super+0", "sheet 0"),
    ])
}

fn default_layouts() -> HashMap<String, SplitTree> {
    let mut layouts = HashMap::new();
    layouts.insert(
        "queue".to_string(),
        SplitTree::new(Split::container(ContainerLayout::Queue, None)),
    );
    layouts.insert(
        "stack".to_string(),
        SplitTree::new(Split::container(ContainerLayout::Stack, None)),
    );
    layouts.insert(
        "grid".to_string(),
        SplitTree::new(Split::container(ContainerLayout::Grid, None)),
    );
    layouts.insert(
        "full".to_string(),
        SplitTree::new(Split::container(ContainerLayout::Full, None)),
    );
    layouts.insert(
        "main".to_string(),
        SplitTree::new(Split::vertical(
            0.6,
            Split::container(ContainerLayout::Single, None),
            Split::container(ContainerLayout::Stack, None),
        )),
    );
    layouts
}
