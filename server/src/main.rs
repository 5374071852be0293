mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use giflive_core::{Color, DitheringMode, RenderOptions, ScaleMode};

use crate::routes::ServerConfig;

#[derive(Parser)]
#[command(name = "giflive-serve", about = "Stream animated GIFs to curl as terminal art")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:1323")]
    listen: String,

    /// Directory holding <name>.gif files, served at /<name>
    #[arg(long, default_value = "gifs")]
    gif_dir: PathBuf,

    /// Terminal rows to fill
    #[arg(long, default_value_t = 24)]
    rows: u32,

    /// Terminal columns to fill
    #[arg(long, default_value_t = 80)]
    cols: u32,

    /// Background color: a name or #RRGGBB / #RRGGBBAA
    #[arg(long, default_value = "black")]
    background: Color,

    /// Scale mode: resize, fill or fit
    #[arg(long, default_value = "fit")]
    scale: ScaleMode,

    /// Dithering mode: none, blocks or chars
    #[arg(long, default_value = "none")]
    dithering: DitheringMode,

    /// Rows encoded concurrently (default: available parallelism)
    #[arg(long)]
    parallelism: Option<usize>,

    /// Don't emit background colors in dithering modes
    #[arg(long)]
    no_bg: bool,

    /// End each stream after this many passes (0 = until the client leaves)
    #[arg(long, default_value_t = 0)]
    loops: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = Arc::new(ServerConfig {
        gif_dir: cli.gif_dir,
        options: RenderOptions {
            rows: cli.rows,
            cols: cli.cols,
            background: cli.background,
            scale_mode: cli.scale,
            dithering: cli.dithering,
            parallelism: cli
                .parallelism
                .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get())),
        },
        suppress_background: cli.no_bg,
        loops: cli.loops,
    });

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("binding {}", cli.listen))?;
    log::info!("serving {} on http://{}", config.gif_dir.display(), cli.listen);

    axum::serve(listener, routes::router(config))
        .await
        .context("server stopped")?;

    Ok(())
}
