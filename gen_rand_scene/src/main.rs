use std::{fs::File, io, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use refract::Float;
use refract_json::serde_json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generates a random scene, readable by `run_scene_json`.
#[derive(Parser)]
#[command(name = "gen_rand_scene")]
struct Cli {
    /// Where to write the scene
    output: PathBuf,

    /// Number of users in the scene
    #[arg(long, default_value_t = 4)]
    users: usize,

    /// Largest dimension of the canvas, in pixels
    #[arg(long, default_value_t = 1000.0)]
    canvas: Float,

    /// Seed of the random generator, for reproducible scenes
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (instant, users) = refract_random::random_scene(&mut rng, cli.users, cli.canvas);

    let json = refract_json::serialize_scene(&instant, &users);

    let file = File::create(&cli.output)
        .with_context(|| format!("could not create {}", cli.output.display()))?;

    serde_json::to_writer_pretty(io::BufWriter::new(file), &json)?;

    info!(
        %instant,
        users = users.len(),
        prisms = users.iter().map(|slots| slots.len()).sum::<usize>(),
        "generated scene"
    );

    Ok(())
}
