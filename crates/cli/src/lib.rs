mod raster;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use doc_model::{
    Annotation, AnnotationBody, AnnotationId, AnnotationPatch, AnnotationStore, Color, DeleteOutcome, DocPoint,
    NewAnnotation, Shape, Stamp, StampKind, ViewState, ViewportRect,
};
use pdf_engine::{default_engine, EmbedOptions, ExportJob, OpenSource, PageSize, PdfEngine, RenderRequest};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use viewer_core::{
    capture, OverlayRenderer, PageSurface, Projection, RecordedSelection, Scale, ScaleContext, ViewerConfig,
    ViewportBounds,
};

#[derive(Debug, Parser)]
#[command(name = "pdfmark")]
#[command(about = "Annotate PDFs and burn highlights into exported copies")]
pub struct Cli {
    /// TOML config with optional `[viewer]` and `[export]` tables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Highlight a selection given as page-pixel rects at a render scale.
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        /// TOP,LEFT,WIDTH,HEIGHT in page pixels. Repeat once per line fragment.
        #[arg(long = "rect", value_parser = parse_rect, required = true)]
        rects: Vec<[f32; 4]>,
        #[arg(long)]
        text: String,
        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,
        #[command(flatten)]
        scale: ScaleArgs,
        #[arg(long)]
        author: Option<String>,
    },
    /// Add a sticky note at a document-space point.
    Note {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        /// X,Y in document units.
        #[arg(long, value_parser = parse_point)]
        at: [f32; 2],
        #[arg(long)]
        content: String,
        #[arg(long)]
        author: Option<String>,
    },
    /// Add a rectangle, circle or arrow between two document-space points.
    Shape {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long, value_enum)]
        kind: ShapeKind,
        #[arg(long, value_parser = parse_point)]
        from: [f32; 2],
        #[arg(long, value_parser = parse_point)]
        to: [f32; 2],
        #[arg(long = "stroke-color", value_parser = parse_color)]
        stroke_color: Option<Color>,
        #[arg(long = "fill-color", value_parser = parse_color)]
        fill_color: Option<Color>,
        #[arg(long = "stroke-width", default_value_t = 2.0)]
        stroke_width: f32,
        #[arg(long)]
        author: Option<String>,
    },
    /// Add a stamp centered on a document-space point.
    Stamp {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: u32,
        #[arg(long, value_parser = parse_point)]
        at: [f32; 2],
        #[arg(long, value_enum)]
        kind: StampChoice,
        /// Label for `--kind custom`.
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value_t = 120.0)]
        width: f32,
        #[arg(long, default_value_t = 40.0)]
        height: f32,
        #[arg(long, default_value_t = 0.0)]
        rotation: f32,
        #[arg(long)]
        author: Option<String>,
    },
    /// Apply a JSON patch to one annotation.
    Update {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        id: AnnotationId,
        /// e.g. `{"color": "#FF0000"}`
        #[arg(long)]
        patch: String,
    },
    /// List stored annotations in creation order.
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Delete one annotation.
    Delete {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        id: AnnotationId,
    },
    /// Print the overlay primitives for one page as JSON.
    Overlay {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        scale: ScaleArgs,
    },
    /// Render one page with its annotation overlay to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[command(flatten)]
        scale: ScaleArgs,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a copy of the PDF with stored highlights burned in.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print CLI version.
    Version,
}

/// Render scale: explicit, or fitted to a viewport the way the viewer does.
#[derive(Debug, Args)]
struct ScaleArgs {
    #[arg(long, conflicts_with = "viewport")]
    scale: Option<f32>,
    /// WIDTHxHEIGHT of the hosting window in pixels.
    #[arg(long, value_parser = parse_size)]
    viewport: Option<[f32; 2]>,
    /// Zoom factor on top of the fitted scale. Only used with `--viewport`.
    #[arg(long, default_value_t = 1.0)]
    zoom: f32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeKind {
    Rectangle,
    Circle,
    Arrow,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StampChoice {
    Approved,
    Rejected,
    Reviewed,
    Confidential,
    Custom,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CliConfig {
    viewer: ViewerConfig,
    export: EmbedOptions,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Highlight { file, page, rects, text, color, scale, author } => {
            let body = HighlightInput { page, rects, text, color: color.unwrap_or(Color::YELLOW), author };
            run_highlight(&file, body, &scale, &config)
        }
        Commands::Note { file, page, at, content, author } => {
            let new = NewAnnotation::note(page, point(at), content);
            run_create(&file, with_author(new, author), &config)
        }
        Commands::Shape { file, page, kind, from, to, stroke_color, fill_color, stroke_width, author } => {
            let mut shape = Shape::new(point(from), point(to), stroke_color.unwrap_or(Color::RED), stroke_width);
            shape.fill_color = fill_color;
            let body = match kind {
                ShapeKind::Rectangle => AnnotationBody::Rectangle(shape),
                ShapeKind::Circle => AnnotationBody::Circle(shape),
                ShapeKind::Arrow => AnnotationBody::Arrow(shape),
            };
            run_create(&file, with_author(NewAnnotation::new(page, body), author), &config)
        }
        Commands::Stamp { file, page, at, kind, text, width, height, rotation, author } => {
            let kind = match kind {
                StampChoice::Approved => StampKind::Approved,
                StampChoice::Rejected => StampKind::Rejected,
                StampChoice::Reviewed => StampKind::Reviewed,
                StampChoice::Confidential => StampKind::Confidential,
                StampChoice::Custom => StampKind::Custom(text.unwrap_or_default()),
            };
            let body = AnnotationBody::Stamp(Stamp { anchor: point(at), width, height, rotation, kind });
            run_create(&file, with_author(NewAnnotation::new(page, body), author), &config)
        }
        Commands::Update { file, id, patch } => run_update(&file, id, &patch, &config),
        Commands::List { file, page } => run_list(&file, page, &config),
        Commands::Delete { file, id } => run_delete(&file, id, &config),
        Commands::Overlay { file, page, scale } => run_overlay(&file, page, &scale, &config),
        Commands::Render { file, page, scale, output } => run_render(&file, page, &scale, output.as_deref(), &config),
        Commands::Export { file, output } => run_export(&file, &output, &config),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => storage::Storage::from_default_project().ok().and_then(|dirs| dirs.existing_config_path()),
    };

    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: CliConfig =
                toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => CliConfig::default(),
    };

    config.viewer.apply_env(|name| std::env::var(name).ok()).context("invalid viewer configuration")?;
    Ok(config)
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let pages = engine
        .page_sizes(handle)?
        .iter()
        .zip(1..)
        .map(|(size, page)| PageOutput { page, width: size.width_pt, height: size.height_pt })
        .collect();

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };
    print_json(&payload)?;

    engine.close(handle)?;

    Ok(())
}

struct HighlightInput {
    page: u32,
    rects: Vec<[f32; 4]>,
    text: String,
    color: Color,
    author: Option<String>,
}

fn run_highlight(file: &Path, input: HighlightInput, scale_args: &ScaleArgs, config: &CliConfig) -> Result<()> {
    let page_size = page_size(file, input.page)?;
    let scale = resolve_scale(scale_args, page_size, &config.viewer)?;

    let (width, height) = (page_size.width_pt * scale.get(), page_size.height_pt * scale.get());
    let surface = PageSurface::at_origin(width, height);
    let client_rects =
        input.rects.iter().map(|[top, left, width, height]| ViewportRect::new(*top, *left, *width, *height)).collect();
    let mut selection = RecordedSelection::new(input.text, client_rects);

    let captured = capture(&mut selection, &surface)
        .context("selection is empty or lies entirely outside the rendered page")?;

    let new = NewAnnotation::highlight(input.page, captured.to_document_space(scale), captured.text, input.color);
    run_create(file, with_author(new, input.author), config)
}

fn run_create(file: &Path, new: NewAnnotation, config: &CliConfig) -> Result<()> {
    page_size(file, new.page_number)?;

    let mut store = open_store(file, config)?;
    let created = store.create(new).context("failed to create annotation")?;
    storage::save_store(file, &store).context("failed to save annotations")?;

    print_json(&created)
}

fn run_update(file: &Path, id: AnnotationId, patch: &str, config: &CliConfig) -> Result<()> {
    let patch: AnnotationPatch = serde_json::from_str(patch).context("invalid patch")?;

    let mut store = open_store(file, config)?;
    let updated = store.update(id, patch).context("failed to update annotation")?;
    storage::save_store(file, &store).context("failed to save annotations")?;

    print_json(&updated)
}

fn run_list(file: &Path, page: Option<u32>, config: &CliConfig) -> Result<()> {
    let store = open_store(file, config)?;

    let mut records: Vec<&Annotation> = match page {
        Some(page) => store.list_by_page(page),
        None => store.iter().collect(),
    };
    records.sort_by_key(|annotation| annotation.created_at());

    print_json(&records)
}

fn run_delete(file: &Path, id: AnnotationId, config: &CliConfig) -> Result<()> {
    let mut store = open_store(file, config)?;

    match store.delete(id) {
        DeleteOutcome::Deleted(_) => {
            storage::save_store(file, &store).context("failed to save annotations")?;
            println!("deleted");
        }
        DeleteOutcome::NotFound => println!("not found"),
    }

    Ok(())
}

fn run_overlay(file: &Path, page: u32, scale_args: &ScaleArgs, config: &CliConfig) -> Result<()> {
    let page_size = page_size(file, page)?;
    let scale = resolve_scale(scale_args, page_size, &config.viewer)?;
    let store = open_store(file, config)?;

    let renderer = OverlayRenderer::new(config.viewer.clone());
    let primitives = renderer.render_page(&store, page, &Projection::at_scale(scale), &ViewState::default());

    print_json(&primitives)
}

fn run_render(
    file: &Path,
    page: u32,
    scale_args: &ScaleArgs,
    output: Option<&Path>,
    config: &CliConfig,
) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;
    let page_size = engine.page_size(handle, page)?;
    let scale = resolve_scale(scale_args, page_size, &config.viewer)?;

    let mut image =
        engine.render_page(handle, RenderRequest { page_number: page, scale }).context("failed to render page")?;

    let store = open_store(file, config)?;
    let renderer = OverlayRenderer::new(config.viewer.clone());
    let primitives = renderer.render_page(&store, page, &Projection::at_scale(scale), &ViewState::default());
    raster::paint(&mut image, &primitives);

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image.save(&output).with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    engine.close(handle)?;

    Ok(())
}

fn run_export(file: &Path, output: &Path, config: &CliConfig) -> Result<()> {
    ensure_pdf_exists(file)?;
    if output == file {
        anyhow::bail!("output must differ from the source PDF");
    }

    let store = open_store(file, config)?;
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let annotations: Vec<Annotation> = store.iter().cloned().collect();

    let job = ExportJob::spawn(Arc::from(bytes), annotations, config.export.clone()).context("failed to start export")?;
    let exported = job.wait().context("failed to export PDF")?;

    fs::write(output, exported).with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", output.display());

    Ok(())
}

fn open_store(file: &Path, config: &CliConfig) -> Result<AnnotationStore> {
    ensure_pdf_exists(file)?;

    let mut store = AnnotationStore::with_undo_capacity(config.viewer.undo_capacity);
    storage::load_into(file, &mut store).context("failed to load annotations")?;
    Ok(store)
}

fn page_size(file: &Path, page: u32) -> Result<PageSize> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;
    let size = engine.page_size(handle, page)?;
    engine.close(handle)?;
    Ok(size)
}

fn resolve_scale(args: &ScaleArgs, page_size: PageSize, config: &ViewerConfig) -> Result<Scale> {
    if let Some(value) = args.scale {
        return Scale::new(value).with_context(|| format!("--scale must be finite and > 0, got {value}"));
    }

    match args.viewport {
        Some([width, height]) => {
            let mut context = ScaleContext::new(page_size.dimensions(), ViewportBounds::new(width, height), config);
            context.set_zoom(args.zoom);
            Ok(context.effective_scale())
        }
        None => Ok(Scale::ONE),
    }
}

fn with_author(new: NewAnnotation, author: Option<String>) -> NewAnnotation {
    match author {
        Some(author) => new.with_author(author),
        None => new,
    }
}

fn point([x, y]: [f32; 2]) -> DocPoint {
    DocPoint::new(x, y)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

fn parse_numbers<const N: usize>(value: &str, separator: char, shape: &str) -> Result<[f32; N], String> {
    let parts: Vec<f32> = value
        .split(separator)
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("expected {shape}, got {value:?}"))?;

    let numbers: [f32; N] = parts.try_into().map_err(|_| format!("expected {shape}, got {value:?}"))?;
    if numbers.iter().any(|number| !number.is_finite()) {
        return Err(format!("expected finite numbers in {value:?}"));
    }
    Ok(numbers)
}

fn parse_rect(value: &str) -> Result<[f32; 4], String> {
    parse_numbers(value, ',', "TOP,LEFT,WIDTH,HEIGHT")
}

fn parse_point(value: &str) -> Result<[f32; 2], String> {
    parse_numbers(value, ',', "X,Y")
}

fn parse_size(value: &str) -> Result<[f32; 2], String> {
    parse_numbers(value, 'x', "WIDTHxHEIGHT")
}

fn parse_color(value: &str) -> Result<Color, String> {
    value.parse::<Color>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_geometry() {
        assert_eq!(parse_rect("10, 20,30,8"), Ok([10.0, 20.0, 30.0, 8.0]));
        assert_eq!(parse_point("1.5,2"), Ok([1.5, 2.0]));
        assert_eq!(parse_size("1000x540"), Ok([1000.0, 540.0]));
    }

    #[test]
    fn rejects_wrong_arity_and_non_finite_values() {
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_point("1,2,3").is_err());
        assert!(parse_point("NaN,2").is_err());
        assert!(parse_size("1000,540").is_err());
    }

    #[test]
    fn viewport_scale_fits_the_page() {
        let args = ScaleArgs { scale: None, viewport: Some([1000.0, 540.0]), zoom: 1.0 };
        let page = PageSize { width_pt: 600.0, height_pt: 800.0 };

        let scale = resolve_scale(&args, page, &ViewerConfig::default()).expect("scale");
        assert_eq!(scale.get(), 0.5);
    }

    #[test]
    fn explicit_scale_must_be_positive() {
        let args = ScaleArgs { scale: Some(0.0), viewport: None, zoom: 1.0 };
        let page = PageSize { width_pt: 600.0, height_pt: 800.0 };
        assert!(resolve_scale(&args, page, &ViewerConfig::default()).is_err());
    }

    #[test]
    fn config_tables_are_optional() {
        let config: CliConfig = toml::from_str("[export]\nopacity = 0.25\n").expect("parse");
        assert_eq!(config.export.opacity, 0.25);
        assert_eq!(config.export.color, Color::YELLOW);
        assert_eq!(config.viewer, ViewerConfig::default());
    }
}
