//! One editing session: the graph, the controller driving it and the code
//! pane showing either the live export or a snippet being imported.

use log::debug;

use crate::config::EditorConfig;
use crate::controller::{InteractionController, Outcome, PointerEvent};
use crate::dialect::Dialect;
use crate::error::ImportError;
use crate::export;
use crate::import;
use crate::metrics::GraphMetrics;
use crate::model::GraphModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePane {
    /// Read-only export of the current graph.
    #[default]
    Preview,
    /// User-editable snippet waiting to be imported.
    Import,
}

#[derive(Debug)]
struct CachedPreview {
    revision: u64,
    dialect: Dialect,
    text: String,
}

#[derive(Debug)]
pub struct Editor {
    model: GraphModel,
    controller: InteractionController,
    config: EditorConfig,
    dialect: Dialect,
    pane: CodePane,
    preview: Option<CachedPreview>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            model: GraphModel::with_styles(config.node, config.edge),
            controller: InteractionController::new(config.view),
            dialect: config.dialect,
            config,
            pane: CodePane::Preview,
            preview: None,
        }
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut InteractionController {
        &mut self.controller
    }

    /// Borrows both halves at once so callers can drive the controller.
    pub fn parts_mut(&mut self) -> (&mut InteractionController, &mut GraphModel) {
        (&mut self.controller, &mut self.model)
    }

    pub fn handle(&mut self, event: PointerEvent) -> Outcome {
        self.controller.handle(&mut self.model, event)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    pub fn pane(&self) -> CodePane {
        self.pane
    }

    pub fn set_pane(&mut self, pane: CodePane) {
        self.pane = pane;
    }

    /// Export of the current graph in the selected dialect. Regenerated only
    /// after the graph or the dialect changed.
    pub fn preview(&mut self) -> &str {
        let revision = self.model.revision();
        let stale = !matches!(
            &self.preview,
            Some(cached) if cached.revision == revision && cached.dialect == self.dialect
        );
        if stale {
            debug!("regenerating {} preview at revision {revision}", self.dialect);
            self.preview = Some(CachedPreview {
                revision,
                dialect: self.dialect,
                text: export::export(self.dialect, &self.model),
            });
        }
        self.preview.as_ref().map_or("", |cached| cached.text.as_str())
    }

    pub fn export_file_name(&self) -> String {
        self.dialect.file_name()
    }

    /// Replaces the graph with the one `source` builds. On failure the graph
    /// is unchanged and the import pane stays open for correction.
    pub fn import(&mut self, source: &str) -> Result<Dialect, ImportError> {
        match import::import_snippet(source, &mut self.model, &self.config.import) {
            Ok(dialect) => {
                self.controller.reset();
                self.pane = CodePane::Preview;
                Ok(dialect)
            }
            Err(e) => {
                self.pane = CodePane::Import;
                Err(e)
            }
        }
    }

    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics::compute(&self.model)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
