use std::path::PathBuf;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use anyhow::{ anyhow, Context, Result };
use clap::Parser;
use log::{ info, LevelFilter };

use spectral_tracer::consts::DEFAULT_OUT_FILE;
use spectral_tracer::description::SceneDescription;
use spectral_tracer::renderer::{ RayTracer, Renderer };

/// Renders a scene to an uncompressed TGA file.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON scene description; the built-in demo scene is used when omitted
    #[clap(short, long)]
    scene: Option<PathBuf>,

    #[clap(short, long, default_value = DEFAULT_OUT_FILE)]
    output: PathBuf,

    /// Overrides the image width of the scene
    #[clap(long)]
    width: Option<usize>,

    /// Overrides the image height of the scene
    #[clap(long)]
    height: Option<usize>,

    /// Overrides the number of render threads
    #[clap(short, long)]
    threads: Option<usize>,

    /// One of off, error, warn, info, debug, trace
    #[clap(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level: LevelFilter = args.log_level.parse()
        .map_err(|_| anyhow!("unknown log level '{}'", args.log_level))?;
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let mut description = match &args.scene {
        Some(path) => SceneDescription::load(path)
            .with_context(|| format!("loading scene {}", path.display()))?,
        None => {
            info!("no scene given, rendering the demo scene");
            SceneDescription::demo()
        },
    };

    if let Some(width) = args.width {
        description.options.image_width = width;
    }
    if let Some(height) = args.height {
        description.options.image_height = height;
    }
    if let Some(threads) = args.threads {
        description.options.threads = threads;
    }

    let tracer = RayTracer::new(description.options.clone())?;
    info!("rendering {}x{} on {} threads",
        tracer.options().image_width, tracer.options().image_height,
        tracer.options().threads);

    let start = Instant::now();
    let job = tracer.render(Arc::new(description.scene), description.camera);

    let canvas = loop {
        match job.wait_timeout(Duration::from_secs(1)) {
            Some(result) => break result.context("render failed")?,
            None => info!("{:.0}% done", job.progress() * 100.0),
        }
    };
    info!("rendered in {:.2?}", start.elapsed());

    canvas.save_tga(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("wrote {}", args.output.display());

    Ok(())
}
