use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::controller::ViewOptions;
use crate::dialect::Dialect;
use crate::import::ImportOptions;
use crate::model::{
    EdgeStyle, MAX_EDGE_WIDTH, MAX_NODE_RADIUS, MIN_EDGE_WIDTH, MIN_NODE_RADIUS, NodeStyle,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Editor settings. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Dialect shown in the live preview at startup.
    pub dialect: Dialect,
    pub node: NodeStyle,
    pub edge: EdgeStyle,
    pub view: ViewOptions,
    pub import: ImportOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::NetworkX,
            node: NodeStyle::default(),
            edge: EdgeStyle::default(),
            view: ViewOptions::default(),
            import: ImportOptions::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_NODE_RADIUS..=MAX_NODE_RADIUS).contains(&self.node.radius) {
            return Err(ConfigError::Invalid(format!(
                "node.radius must be between 20 and 100, got {}",
                self.node.radius
            )));
        }
        if !(MIN_EDGE_WIDTH..=MAX_EDGE_WIDTH).contains(&self.edge.width) {
            return Err(ConfigError::Invalid(format!(
                "edge.width must be between 1 and 10, got {}",
                self.edge.width
            )));
        }
        if !self.view.zoom_step.is_finite() || self.view.zoom_step <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "view.zoom_step must be greater than 1, got {}",
                self.view.zoom_step
            )));
        }
        if !self.view.hit_tolerance.is_finite() || self.view.hit_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "view.hit_tolerance must be a finite non-negative number, got {}",
                self.view.hit_tolerance
            )));
        }
        if !self.import.layout_radius.is_finite() || self.import.layout_radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "import.layout_radius must be a finite non-negative number, got {}",
                self.import.layout_radius
            )));
        }
        if !self.import.layout_center.iter().all(|c| c.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "import.layout_center must be finite, got {:?}",
                self.import.layout_center
            )));
        }
        if self.import.max_statements == 0 || self.import.max_nodes == 0 {
            return Err(ConfigError::Invalid(
                "import limits must be at least 1".to_string(),
            ));
        }
        if let Some(dialect) = self.import.enabled.iter().find(|d| !d.supports_import()) {
            return Err(ConfigError::Invalid(format!(
                "{} cannot be enabled for import",
                dialect.name()
            )));
        }
        Ok(())
    }
}

/// Defaults when no path is given, otherwise the file layered over them.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EditorConfig::from_toml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(EditorConfig::from_toml("").unwrap(), EditorConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = EditorConfig::from_toml(
            "dialect = \"pyvis\"\n\
             [node]\nradius = 30\ncolor = \"#00ff00\"\n\
             [view]\nzoom_step = 1.5\n\
             [import]\nenabled = [\"networkx\", \"graph-tool\"]\nmax_nodes = 50\n",
        )
        .unwrap();
        assert_eq!(config.dialect, Dialect::PyVis);
        assert_eq!(config.node.radius, 30.0);
        assert_eq!(config.node.color, Color::rgb(0, 255, 0));
        assert_eq!(config.node.label_color, Color::BLACK);
        assert_eq!(config.view.zoom_step, 1.5);
        assert_eq!(config.view.hit_tolerance, 3.0);
        assert_eq!(config.import.enabled, vec![Dialect::NetworkX, Dialect::GraphTool]);
        assert_eq!(config.import.max_nodes, 50);
        assert_eq!(config.import.max_statements, 10_000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EditorConfig::from_toml("[node]\nshape = \"square\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn bad_color_is_a_parse_error() {
        let err = EditorConfig::from_toml("[edge]\ncolor = \"red\"\n").unwrap_err();
        assert!(err.to_string().contains("invalid color `red`"), "{err}");
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        let err = EditorConfig::from_toml("[node]\nradius = 5\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: node.radius must be between 20 and 100, got 5"
        );
        let err = EditorConfig::from_toml("[view]\nzoom_step = 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = EditorConfig::from_toml("[import]\nenabled = [\"dgl\"]\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: DGL cannot be enabled for import");
    }

    #[test]
    fn non_finite_numbers_are_invalid() {
        for text in [
            "[view]\nzoom_step = inf\n",
            "[view]\nzoom_step = nan\n",
            "[view]\nhit_tolerance = inf\n",
            "[import]\nlayout_radius = nan\n",
            "[import]\nlayout_center = [300.0, -inf]\n",
        ] {
            let err = EditorConfig::from_toml(text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}: {err}");
        }
        let err = EditorConfig::from_toml("[view]\nzoom_step = inf\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: view.zoom_step must be greater than 1, got inf"
        );
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Some(Path::new("/nonexistent/graphpad.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
