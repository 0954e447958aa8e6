pub mod config;
pub mod controller;
pub mod dialect;
pub mod editor;
pub mod error;
pub mod export;
pub mod import;
pub mod interp;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod snippet_ast;
pub mod snippet_parser;

use crate::dialect::Dialect;
use crate::error::ImportError;
use crate::import::ImportOptions;
use crate::model::GraphModel;

/// Imports `source` into a fresh model. `from` forces a dialect instead of
/// detecting it from the snippet.
pub fn load(
    source: &str,
    from: Option<Dialect>,
    model: &mut GraphModel,
    options: &ImportOptions,
) -> Result<Dialect, ImportError> {
    match from {
        Some(dialect) => {
            import::import_as(dialect, source, model, options)?;
            Ok(dialect)
        }
        None => import::import_snippet(source, model, options),
    }
}

/// Rewrites a snippet for one graph library as the equivalent code for another.
pub fn translate(source: &str, from: Option<Dialect>, to: Dialect) -> Result<String, ImportError> {
    let mut model = GraphModel::new();
    load(source, from, &mut model, &ImportOptions::default())?;
    Ok(export::export(to, &model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_unknown_library_returns_error() {
        let err = translate("print('hello')\n", None, Dialect::NetworkX).unwrap_err();
        assert!(
            err.to_string().contains("no supported graph library found"),
            "error should mention missing library, got: {err}"
        );
        assert!(err.to_string().contains("networkx, igraph"), "got: {err}");
    }

    #[test]
    fn translate_export_only_library_returns_error() {
        let err = translate("import dgl\n", None, Dialect::NetworkX).unwrap_err();
        assert_eq!(
            err.to_string(),
            "DGL import is not available: it is an export-only format"
        );
    }

    #[test]
    fn forced_dialect_skips_detection() {
        let code = translate(
            "G.add_node('a', pos=(1, 2))\n",
            Some(Dialect::NetworkX),
            Dialect::Snap,
        )
        .unwrap();
        assert!(code.contains("G.AddNode(0)"), "got: {code}");
    }
}
