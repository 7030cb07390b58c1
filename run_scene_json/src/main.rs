use std::{fs::File, io, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use refract::{beam_length, illuminate, sun, Float, Illumination, PrismSlots};
use refract_json::{serde_json, JsonSer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Evaluates every prism of a scene under its own sun, and prints the result as JSON.
#[derive(Parser)]
#[command(name = "run_scene_json")]
struct Cli {
    /// Path to the scene file
    scene: PathBuf,

    /// Instant to evaluate the scene at (RFC 3339), instead of the scene's own
    #[arg(long)]
    at: Option<String>,

    /// Largest dimension of the canvas, in pixels
    #[arg(long, default_value_t = 1000.0)]
    canvas: Float,

    /// Also report sunrise and sunset, for the UTC date of the instant, of every anchored prism
    #[arg(long)]
    sun_times: bool,
}

fn evaluate_scene(
    instant: &DateTime<Utc>,
    users: &[PrismSlots],
    canvas: Float,
    with_sun_times: bool,
) -> serde_json::Value {
    let mut lit = 0;

    let frames = Vec::from_iter(users.iter().flatten().map(|prism| {
        let illumination = illuminate(prism, instant);

        let length = match &illumination {
            Illumination::Lit { sun, rays } => {
                lit += 1;
                debug!(owner = %prism.owner, slot = %prism.slot, rays = rays.len(), "lit");
                Some(beam_length(sun.elevation, canvas))
            }
            _ => None,
        };

        let mut frame = refract_json::serialize_frame(prism, &illumination, length);

        if let (true, Some(anchor), serde_json::Value::Object(map)) =
            (with_sun_times, &prism.anchor, &mut frame)
        {
            let times = sun::sunrise_sunset(anchor.latitude, anchor.longitude, instant.date_naive());
            map.insert("sunTimes".into(), times.to_json());
        }

        frame
    }));

    info!(prisms = frames.len(), lit, "evaluated scene");

    serde_json::json!({
        "instant": instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "frames": frames,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    anyhow::ensure!(
        cli.canvas.is_finite() && cli.canvas > 0.0,
        "the canvas size must be positive"
    );

    let file = File::open(&cli.scene)
        .with_context(|| format!("could not open {}", cli.scene.display()))?;

    let (scene_instant, users) = refract_json::read_scene(io::BufReader::new(file))
        .with_context(|| format!("invalid scene in {}", cli.scene.display()))?;

    let instant = match cli.at.as_deref() {
        Some(at) => refract_json::parse_instant(at).context("invalid --at instant")?,
        None => scene_instant.unwrap_or_else(Utc::now),
    };

    debug!(%instant, users = users.len(), "loaded scene");

    let output = evaluate_scene(&instant, &users, cli.canvas, cli.sun_times);

    serde_json::to_writer_pretty(io::stdout().lock(), &output)?;
    println!();

    Ok(())
}
