//! gnuplot-viewer binary: parse flags, load config, open the window.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gnuplot_viewer::{run_viewer, OpenIntent, ViewerApp, ViewerConfig};

#[derive(Parser)]
#[command(name = "gnuplot-viewer")]
#[command(about = "Render gnuplot scripts, re-render on change, export the plot")]
struct Cli {
    /// Script to render on start
    script: Option<PathBuf>,

    /// Show an already rendered image instead of a script
    #[arg(long, conflicts_with = "script")]
    image: Option<PathBuf>,

    /// Plotting binary to run (default: gnuplot)
    #[arg(long)]
    renderer: Option<String>,

    /// File name the renderer writes the plot to (default: outpic.png)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Config file (default: ~/.gnuplot-viewer/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to the default path and exit
    #[arg(long)]
    save_config: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ViewerConfig::load_from(path),
        None => ViewerConfig::load_from_default_path(),
    };
    let mut cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("failed to load config, using defaults: {e}");
            ViewerConfig::default()
        }
    };
    if let Some(program) = cli.renderer {
        cfg.renderer.program = program;
    }
    if let Some(output) = cli.output {
        cfg.renderer.output_file = output;
    }

    if cli.save_config {
        return match cfg.save_to_default_path() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to save config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut app = ViewerApp::new(&cfg);
    if let Some(script) = cli.script {
        app = app.open_on_start(OpenIntent::Render(script));
    } else if let Some(image) = cli.image {
        app = app.open_on_start(OpenIntent::Display(image));
    }

    match run_viewer(app, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("viewer exited with error: {e}");
            ExitCode::FAILURE
        }
    }
}
