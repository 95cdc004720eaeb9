//! favicraft command line.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use favicraft::{
    AnimationKind, BlendMode, ColorOverlaySettings, Counter, CropSpec, DirectorySink, EditorSession,
    EffectProfile, ExportChoice, GeneratorConfig, NewSubmission, SeasonalTheme, SqliteStore,
    StaggeredDelivery, SubmissionStore, TransformSpec, export,
};

#[derive(Parser)]
#[command(name = "favicraft", version, about = "Generate favicon sets from any image")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, default_value = "favicraft.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the static icon set.
    Generate(RenderArgs),

    /// Export animated SVG favicons alongside the static set.
    Animate {
        #[command(flatten)]
        render: RenderArgs,

        #[arg(long, value_enum, default_value_t = AnimationKind::Pulse)]
        kind: AnimationKind,

        /// Seconds per cycle, 0.5-5.
        #[arg(long, default_value_t = 2.0)]
        speed: f32,
    },

    /// Community gallery.
    Gallery {
        /// Database file. Defaults to the configured path.
        #[arg(long)]
        db: Option<PathBuf>,

        #[command(subcommand)]
        action: GalleryAction,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Source image.
    input: PathBuf,

    /// Output directory. Defaults to the configured directory.
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Square crop in source pixels as `x,y,size`. Defaults to a centered
    /// square over 80% of the shorter side.
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropSpec>,

    /// Zoom factor, 0.1-5.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset_x: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    offset_y: f32,

    /// Effect profile JSON. Overrides the effect flags below.
    #[arg(long)]
    profile: Option<PathBuf>,

    #[arg(long)]
    remove_background: bool,

    /// Overlay color as `#rrggbb`. Enables the color overlay.
    #[arg(long)]
    overlay_color: Option<String>,

    #[arg(long, default_value_t = 0.5)]
    overlay_opacity: f32,

    #[arg(long, value_enum, default_value_t = BlendMode::Multiply)]
    blend: BlendMode,

    #[arg(long, value_enum)]
    season: Option<SeasonalTheme>,

    /// Write every file at once instead of staggering them.
    #[arg(long)]
    no_stagger: bool,
}

#[derive(Subcommand)]
enum GalleryAction {
    /// List submissions, newest first.
    List,

    /// Add a submission.
    Submit {
        #[arg(long)]
        url: String,

        #[arg(long)]
        email: String,

        /// Image to attach, rendered as a 64px favicon.
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Add a love to a submission.
    Love { id: i64 },

    /// Record a click on a submission.
    Click { id: i64 },
}

fn parse_crop(value: &str) -> Result<CropSpec, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop `{value}`: {e}"))?;

    match parts.as_slice() {
        [x, y, size] => Ok(CropSpec::square(*x, *y, *size)),
        _ => Err(format!("crop must be `x,y,size`, got `{value}`")),
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = GeneratorConfig::load(&cli.config)?;

    match cli.command {
        Command::Generate(render) => render_and_export(&config, &render, None),
        Command::Animate {
            render,
            kind,
            speed,
        } => render_and_export(&config, &render, Some((kind, speed))),
        Command::Gallery { db, action } => {
            let path = db.unwrap_or_else(|| config.database_path.clone());
            run_gallery(&config, &path, action)
        }
    }
}

fn effects_from_args(args: &RenderArgs) -> Result<EffectProfile, Box<dyn Error>> {
    if let Some(path) = &args.profile {
        return Ok(EffectProfile::from_json(&fs::read_to_string(path)?)?);
    }

    let mut profile = EffectProfile::new().with_background_removal(args.remove_background);
    if let Some(color) = &args.overlay_color {
        profile = profile.with_color_overlay(ColorOverlaySettings {
            enabled: true,
            color: color.clone(),
            opacity: args.overlay_opacity,
            blend_mode: args.blend,
        });
    }
    if let Some(theme) = args.season {
        profile = profile.with_seasonal(theme);
    }
    Ok(profile)
}

fn render_and_export(
    config: &GeneratorConfig,
    args: &RenderArgs,
    animation: Option<(AnimationKind, f32)>,
) -> Result<(), Box<dyn Error>> {
    let mut session = EditorSession::with_config(config);
    session.load(fs::read(&args.input)?)?;

    if let Some(crop) = args.crop {
        session.set_crop(crop)?;
    }
    session.set_transform(TransformSpec::new(args.scale, args.offset_x, args.offset_y))?;
    session.set_effects(effects_from_args(args)?)?;

    let choice = match animation {
        Some((kind, speed)) => {
            session.set_animation(kind, speed);
            ExportChoice::Animated
        }
        None => ExportChoice::Static,
    };
    session.choose(choice)?;
    let master = session.finish()?.clone();

    let mut batch = session.export()?;
    if choice == ExportChoice::Animated {
        batch.artifacts.push(export::static_artifact(&master)?);
    }
    for failure in &batch.failures {
        warn!(filename = %failure.filename, error = %failure.error, "not exported");
    }

    let out = args.out.clone().unwrap_or_else(|| config.output_dir.clone());
    let delivery = if args.no_stagger {
        StaggeredDelivery::new(std::time::Duration::ZERO)
    } else {
        StaggeredDelivery::new(config.download_delay())
    };
    let report = delivery.run(
        &batch.artifacts,
        &mut DirectorySink::new(&out),
        &AtomicBool::new(false),
    );

    info!(
        written = report.delivered.len(),
        dir = %out.display(),
        "favicons written"
    );
    println!("{}", export::html_snippet(&session.effects().file_prefix()));

    if report.failed.is_empty() && batch.is_complete() {
        Ok(())
    } else {
        Err(format!(
            "{} file(s) could not be produced",
            report.failed.len() + batch.failures.len()
        )
        .into())
    }
}

fn run_gallery(
    config: &GeneratorConfig,
    path: &Path,
    action: GalleryAction,
) -> Result<(), Box<dyn Error>> {
    let store = SqliteStore::open(path)?;

    match action {
        GalleryAction::List => {
            for s in store.list()? {
                println!(
                    "{:>5}  {:<40}  loves {:>4}  clicks {:>4}  {}",
                    s.id,
                    favicraft::gallery::display_url(&s.website_url),
                    s.loves_count,
                    s.clicks_count,
                    s.created_at
                );
            }
        }
        GalleryAction::Submit { url, email, image } => {
            let mut submission = NewSubmission::new(url, email);
            if let Some(image) = image {
                let mut session = EditorSession::with_config(config);
                session.load(fs::read(image)?)?;
                if let Some(preview) = session.preview()? {
                    submission = submission.with_image(preview.to_data_url()?);
                }
            }
            let saved = store.insert(&submission)?;
            info!(id = saved.id, "submission stored");
        }
        GalleryAction::Love { id } => {
            let loves = store.increment(id, Counter::Loves)?;
            println!("{loves}");
        }
        GalleryAction::Click { id } => {
            let clicks = store.increment(id, Counter::Clicks)?;
            println!("{clicks}");
        }
    }
    Ok(())
}
