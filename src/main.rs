//! # formfill CLI
//!
//! Command-line interface for overlaying field data onto form templates.
//!
//! ## Usage
//!
//! ```bash
//! # Render sample data onto a form shown 800px wide in the editor
//! formfill render --template blank.png --display-width 800
//!
//! # Render extracted fields with positions saved from the editor
//! formfill render --template blank.png --display-width 800 \
//!     --fields fields.json --layout layout.json --out signed.png
//!
//! # Serve the HTTP API for a browser editor
//! formfill serve --listen 0.0.0.0:8080 --extractor http://localhost:8001
//! ```

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use formfill::{
    OverlayError,
    config::OverlayConfig,
    element::StyleUpdate,
    fields::FieldMap,
    logging,
    render::font::FontBook,
    server::{self, ServerConfig},
    session::OverlaySession,
    template::{DisplaySize, FixedMeasurement, decode_template},
    transform::DisplayPoint,
};

/// formfill - place extracted fields on a blank form
#[derive(Parser, Debug)]
#[command(name = "formfill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of .ttf/.otf fonts (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    fonts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Composite fields onto a template and write a PNG
    Render {
        /// Blank form image (PNG/JPEG)
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Width the template was shown at while placing fields
        #[arg(long)]
        display_width: f32,

        /// Height the template was shown at (defaults to the aspect-preserving height)
        #[arg(long)]
        display_height: Option<f32>,

        /// Field data as a JSON object (defaults to sample data)
        #[arg(long, value_name = "FILE")]
        fields: Option<PathBuf>,

        /// Per-field placement and style overrides (JSON list, matched by label)
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Output file (defaults to the configured output filename)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Base URL of the field-extraction service
        #[arg(long, value_name = "URL")]
        extractor: Option<String>,
    },
}

/// One entry of a `--layout` file.
#[derive(Debug, Deserialize)]
struct ElementOverride {
    label: String,
    text: Option<String>,
    x: Option<f32>,
    y: Option<f32>,
    font_size_px: Option<f32>,
    font_family: Option<String>,
    color: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), OverlayError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => OverlayConfig::load(path)?,
        None => OverlayConfig::default(),
    };
    if let Some(dir) = cli.fonts {
        config.font_dir = Some(dir);
    }

    match cli.command {
        Commands::Render {
            template,
            display_width,
            display_height,
            fields,
            layout,
            out,
        } => {
            let out = out.unwrap_or_else(|| PathBuf::from(&config.output_filename));
            render(
                config,
                &template,
                display_width,
                display_height,
                fields.as_deref(),
                layout.as_deref(),
                &out,
            )
            .await?;
            println!("Saved to {}", out.display());
        }
        Commands::Serve { listen, extractor } => {
            server::serve(ServerConfig {
                listen_addr: listen,
                extractor_url: extractor,
                overlay: config,
            })
            .await?;
        }
    }

    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, OverlayError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))
}

async fn render(
    config: OverlayConfig,
    template_path: &Path,
    display_width: f32,
    display_height: Option<f32>,
    fields_path: Option<&Path>,
    layout_path: Option<&Path>,
    out: &Path,
) -> Result<(), OverlayError> {
    let bytes = std::fs::read(template_path)?;
    let template = decode_template(bytes).await?;

    let shown = match display_height {
        Some(height) => DisplaySize::new(display_width, height),
        None => DisplaySize::fit_width(
            display_width,
            template.natural_width(),
            template.natural_height(),
        ),
    };
    if !shown.is_valid() {
        return Err(OverlayError::Config(format!(
            "display size must be positive, got {}x{}",
            shown.width, shown.height
        )));
    }
    tracing::info!(
        natural_width = template.natural_width(),
        natural_height = template.natural_height(),
        shown_width = shown.width,
        shown_height = shown.height,
        "template decoded"
    );

    let fonts = Arc::new(FontBook::from_config(&config)?);
    let mut session = OverlaySession::new(config, fonts, FixedMeasurement::new(shown));
    let ticket = session.begin_template_load();
    session.complete_template_load(ticket, Ok(template))?;

    let fields = match fields_path {
        Some(path) => read_json::<FieldMap>(path)?,
        None => FieldMap::sample(),
    };
    session.load_fields(&fields);

    if let Some(path) = layout_path {
        let overrides: Vec<ElementOverride> = read_json(path)?;
        apply_overrides(&mut session, overrides);
    }

    let png = session.export_png().await?;
    std::fs::write(out, png)?;
    Ok(())
}

fn apply_overrides(session: &mut OverlaySession, overrides: Vec<ElementOverride>) {
    for o in overrides {
        let Some(element) = session.elements().iter().find(|el| el.label == o.label) else {
            tracing::warn!("layout entry for unknown field {:?}", o.label);
            continue;
        };
        let id = element.id;
        let position = DisplayPoint::new(o.x.unwrap_or(element.x), o.y.unwrap_or(element.y));

        session.update_position(id, position);
        if let Some(text) = o.text {
            session.update_style(id, StyleUpdate::Text(text));
        }
        if let Some(size) = o.font_size_px {
            session.update_style(id, StyleUpdate::FontSize(size));
        }
        if let Some(family) = o.font_family {
            session.update_style(id, StyleUpdate::FontFamily(family));
        }
        if let Some(color) = o.color {
            session.update_style(id, StyleUpdate::Color(color));
        }
    }
}
