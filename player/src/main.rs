use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;

use giflive_core::{Color, DitheringMode, RenderOptions, RenderedImage, ScaleMode, CLEAR_SCREEN, CURSOR_HOME};

/// Played for frames that declare no delay.
const DEFAULT_DELAY: u32 = 10;

#[derive(Parser)]
#[command(name = "giflive-play", about = "Play an animated GIF in the terminal")]
struct Cli {
    /// Path to a .gif file
    input: PathBuf,

    /// Terminal rows to fill (default: current terminal height - 1)
    #[arg(long)]
    rows: Option<u16>,

    /// Terminal columns to fill (default: current terminal width)
    #[arg(long)]
    cols: Option<u16>,

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

    /// Stop after this many passes (0 = loop forever)
    #[arg(long, default_value_t = 0)]
    loops: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let (term_cols, term_rows) = terminal::size().unwrap_or((80, 25));
    let options = RenderOptions {
        rows: cli.rows.unwrap_or(term_rows.saturating_sub(1)) as u32,
        cols: cli.cols.unwrap_or(term_cols) as u32,
        background: cli.background,
        scale_mode: cli.scale,
        dithering: cli.dithering,
        parallelism: cli.parallelism.unwrap_or_else(default_parallelism),
    };

    let image = RenderedImage::from_file(&cli.input, &options)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    log::info!(
        "{}: {} frame(s), {}x{} cells",
        cli.input.display(),
        image.frame_count(),
        image.height(),
        image.width()
    );

    // Set up panic hook for terminal cleanup
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup_terminal();
        original_hook(info);
    }));

    // Enter alternate screen, raw mode, hide cursor
    terminal::enable_raw_mode()?;
    let stdout = std::io::stdout();
    let mut stdout = BufWriter::with_capacity(256 * 1024, stdout.lock());
    stdout.write_all(b"\x1b[?1049h")?; // enter alternate screen
    stdout.write_all(b"\x1b[?25l")?; // hide cursor
    stdout.write_all(CLEAR_SCREEN.as_bytes())?;
    stdout.flush()?;

    let result = run_playback_loop(&image, &mut stdout, cli.no_bg, cli.loops);

    // Cleanup
    stdout.write_all(b"\x1b[0m")?; // reset colors
    stdout.write_all(b"\x1b[?25h")?; // show cursor
    stdout.write_all(b"\x1b[?1049l")?; // leave alternate screen
    stdout.flush()?;
    terminal::disable_raw_mode()?;

    result
}

fn run_playback_loop(
    image: &RenderedImage,
    stdout: &mut impl Write,
    suppress_background: bool,
    loops: u32,
) -> anyhow::Result<()> {
    let frame_count = image.frame_count();
    let mut pass = 0u32;

    for frame_idx in (0..frame_count).cycle() {
        if frame_idx == 0 {
            if loops > 0 && pass == loops {
                return Ok(());
            }
            pass += 1;
        }

        let text = image.render(frame_idx, suppress_background)?;
        stdout.write_all(CURSOR_HOME.as_bytes())?;
        // Raw mode: newlines don't return the carriage.
        stdout.write_all(text.replace('\n', "\r\n").as_bytes())?;
        stdout.flush()?;

        let delay = match image.frame_delay(frame_idx)? {
            0 => DEFAULT_DELAY,
            d => d,
        };

        if wait_for_quit(Duration::from_millis(u64::from(delay) * 10))? {
            return Ok(());
        }
    }

    Ok(())
}

/// Sleep out a frame delay while watching for quit keys. Other events are
/// drained without cutting the delay short. Returns true on quit.
fn wait_for_quit(delay: Duration) -> std::io::Result<bool> {
    let deadline = Instant::now() + delay;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || !event::poll(remaining)? {
            return Ok(false);
        }
        if is_quit_key(&event::read()?) {
            return Ok(true);
        }
    }
}

fn is_quit_key(event: &Event) -> bool {
    matches!(
        event,
        Event::Key(KeyEvent {
            code: KeyCode::Char('q') | KeyCode::Esc,
            kind: KeyEventKind::Press,
            ..
        })
    )
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn cleanup_terminal() {
    let _ = std::io::stdout().write_all(b"\x1b[0m\x1b[?25h\x1b[?1049l");
    let _ = std::io::stdout().flush();
    let _ = terminal::disable_raw_mode();
}
