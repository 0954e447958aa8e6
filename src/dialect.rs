use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Python graph library a snippet is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Dialect {
    #[serde(rename = "networkx")]
    NetworkX,
    #[serde(rename = "igraph")]
    Igraph,
    #[serde(rename = "pyvis")]
    PyVis,
    #[serde(rename = "graph-tool")]
    GraphTool,
    #[serde(rename = "pygraphviz")]
    PyGraphviz,
    #[serde(rename = "dgl")]
    Dgl,
    #[serde(rename = "snap")]
    Snap,
}

impl Dialect {
    pub const ALL: [Dialect; 7] = [
        Dialect::NetworkX,
        Dialect::Igraph,
        Dialect::PyVis,
        Dialect::GraphTool,
        Dialect::PyGraphviz,
        Dialect::Dgl,
        Dialect::Snap,
    ];

    pub const IMPORTABLE: [Dialect; 5] = [
        Dialect::NetworkX,
        Dialect::Igraph,
        Dialect::PyVis,
        Dialect::GraphTool,
        Dialect::PyGraphviz,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::NetworkX => "NetworkX",
            Dialect::Igraph => "igraph",
            Dialect::PyVis => "PyVis",
            Dialect::GraphTool => "Graph-tool",
            Dialect::PyGraphviz => "PyGraphviz",
            Dialect::Dgl => "DGL",
            Dialect::Snap => "SNAP",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Dialect::NetworkX => "networkx",
            Dialect::Igraph => "igraph",
            Dialect::PyVis => "pyvis",
            Dialect::GraphTool => "graph-tool",
            Dialect::PyGraphviz => "pygraphviz",
            Dialect::Dgl => "dgl",
            Dialect::Snap => "snap",
        }
    }

    pub fn supports_import(self) -> bool {
        Self::IMPORTABLE.contains(&self)
    }

    pub fn file_name(self) -> String {
        format!("graph_{}.py", self.name().to_lowercase())
    }

    /// Guesses the library a snippet targets from the names it mentions.
    /// Markers are checked in a fixed order and the first match wins.
    pub fn detect(source: &str) -> Option<Dialect> {
        if source.contains("networkx") {
            Some(Dialect::NetworkX)
        } else if source.contains("graph_tool") || source.contains("graph-tool") {
            Some(Dialect::GraphTool)
        } else if source.contains("igraph") {
            Some(Dialect::Igraph)
        } else if source.contains("pyvis") {
            Some(Dialect::PyVis)
        } else if source.contains("pygraphviz") {
            Some(Dialect::PyGraphviz)
        } else if source.contains("dgl") {
            Some(Dialect::Dgl)
        } else if source.contains("snap") {
            Some(Dialect::Snap)
        } else {
            None
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown library `{0}` (expected one of: networkx, igraph, pyvis, graph-tool, pygraphviz, dgl, snap)")]
pub struct ParseDialectError(String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Dialect::ALL
            .into_iter()
            .find(|d| d.key() == wanted || d.name().to_lowercase() == wanted)
            .ok_or_else(|| ParseDialectError(s.to_string()))
    }
}
