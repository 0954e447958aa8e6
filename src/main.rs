use std::io::Read;

use clap::Parser;

use graphpad::config::load_config;
use graphpad::dialect::Dialect;
use graphpad::editor::Editor;

#[derive(Parser)]
#[command(
    name = "graphpad",
    about = "Convert graph snippets between Python graph libraries (NetworkX, igraph, PyVis, graph-tool, PyGraphviz, DGL, SNAP)"
)]
struct Cli {
    /// Input snippet (reads from stdin if not provided)
    file: Option<std::path::PathBuf>,

    /// Library the snippet is written for (detected when omitted)
    #[arg(long)]
    from: Option<Dialect>,

    /// Library to generate code for (defaults to the configured dialect)
    #[arg(long)]
    to: Option<Dialect>,

    /// Print the metrics report instead of code
    #[arg(long, short = 'm')]
    metrics: bool,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<std::path::PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    });

    let input = match cli.file {
        Some(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!("ERROR: failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
                eprintln!("ERROR: failed to read stdin: {e}");
                std::process::exit(1);
            });
            buf
        }
    };

    let mut editor = Editor::new(config);
    let options = editor.config().import.clone();
    if let Err(e) = graphpad::load(&input, cli.from, editor.model_mut(), &options) {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }

    if cli.metrics {
        print!("{}", editor.metrics());
    } else {
        if let Some(dialect) = cli.to {
            editor.set_dialect(dialect);
        }
        print!("{}", editor.preview());
    }
}
