use std::convert::Infallible;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{self, Stream};

use giflive_core::{RenderOptions, RenderedImage, CLEAR_SCREEN};

/// Played for frames that declare no delay.
const DEFAULT_DELAY: u32 = 10;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Shared by every request.
pub struct ServerConfig {
    /// Directory holding `<name>.gif` files.
    pub gif_dir: PathBuf,
    pub options: RenderOptions,
    pub suppress_background: bool,
    /// Passes per stream; 0 streams until the client leaves.
    pub loops: u32,
}

pub fn router(config: Arc<ServerConfig>) -> Router {
    Router::new()
        .route("/:name", get(serve_gif))
        .fallback(unknown_path)
        .with_state(config)
}

/// Only ASCII alphanumerics, `-` and `_` may name a GIF.
pub fn is_gif_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn serve_gif(State(config): State<Arc<ServerConfig>>, Path(name): Path<String>) -> Response {
    log::info!("GET /{name}");
    if !is_gif_name(&name) {
        return not_found(&name);
    }

    let path = config.gif_dir.join(format!("{name}.gif"));
    let exists = tokio::fs::metadata(&path).await.is_ok_and(|meta| meta.is_file());
    if !exists {
        return not_found(&name);
    }

    let build_config = Arc::clone(&config);
    let frames = match tokio::task::spawn_blocking(move || render_frames(&path, &build_config)).await {
        Ok(Ok(frames)) => frames,
        Ok(Err(e)) => return load_error(&name, e),
        Err(e) => return load_error(&name, e),
    };
    log::info!("{name}: streaming {} frame(s)", frames.len());

    let body = Body::from_stream(frame_stream(Playback::new(name, frames, config.loops)));
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

async fn unknown_path(uri: Uri) -> Response {
    not_found(uri.path().trim_start_matches('/'))
}

fn not_found(name: &str) -> Response {
    log::warn!("GIF image {name} not found");
    plain(StatusCode::NOT_FOUND, format!("GIF image {name} not found.\n"))
}

fn load_error(name: &str, e: impl std::fmt::Display) -> Response {
    log::warn!("{name}: failed to load: {e}");
    plain(StatusCode::INTERNAL_SERVER_ERROR, format!("GIF image load error: {e}.\n"))
}

fn plain(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

/// One body chunk and the pause that follows it.
#[derive(Clone, Debug)]
struct Frame {
    chunk: Bytes,
    delay: Duration,
}

/// Build the image and render every frame up front; runs off the async workers.
fn render_frames(path: &FsPath, config: &ServerConfig) -> giflive_core::Result<Vec<Frame>> {
    let image = RenderedImage::from_file(path, &config.options)?;
    (0..image.frame_count())
        .map(|index| {
            let text = image.render(index, config.suppress_background)?;
            let delay = match image.frame_delay(index)? {
                0 => DEFAULT_DELAY,
                d => d,
            };
            Ok(Frame {
                chunk: Bytes::from(format!("{CLEAR_SCREEN}{text}\n")),
                delay: Duration::from_millis(u64::from(delay) * 10),
            })
        })
        .collect()
}

/// Wraparound cursor over the rendered frames of one stream.
struct Playback {
    name: String,
    frames: Vec<Frame>,
    next: usize,
    pass: u32,
    loops: u32,
    wait: Option<Duration>,
}

impl Playback {
    fn new(name: String, frames: Vec<Frame>, loops: u32) -> Self {
        Self {
            name,
            frames,
            next: 0,
            pass: 0,
            loops,
            wait: None,
        }
    }

    /// Next frame to send, or None once the last pass is done.
    fn advance(&mut self) -> Option<Frame> {
        if self.next == 0 {
            if self.loops > 0 && self.pass == self.loops {
                return None;
            }
            self.pass += 1;
        }
        let frame = self.frames.get(self.next)?.clone();
        self.next = (self.next + 1) % self.frames.len();
        Some(frame)
    }
}

impl Drop for Playback {
    // Runs when the stream finishes or the client stops listening.
    fn drop(&mut self) {
        log::info!("{}: stream closed after {} pass(es)", self.name, self.pass);
    }
}

fn frame_stream(playback: Playback) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::unfold(playback, |mut playback| async move {
        if let Some(delay) = playback.wait.take() {
            tokio::time::sleep(delay).await;
        }
        let frame = playback.advance()?;
        playback.wait = Some(frame.delay);
        Some((Ok(frame.chunk), playback))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::to_bytes;
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame as GifFrame, Rgba, RgbaImage};

    use super::*;

    fn write_gif(dir: &FsPath, name: &str, colors: &[[u8; 4]]) {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for color in colors {
                let buffer = RgbaImage::from_pixel(8, 8, Rgba(*color));
                let delay = Delay::from_numer_denom_ms(10, 1);
                encoder.encode_frame(GifFrame::from_parts(buffer, 0, 0, delay)).unwrap();
            }
        }
        fs::write(dir.join(format!("{name}.gif")), bytes).unwrap();
    }

    fn config(dir: &FsPath, loops: u32) -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            gif_dir: dir.to_path_buf(),
            options: RenderOptions {
                rows: 4,
                cols: 8,
                ..RenderOptions::default()
            },
            suppress_background: false,
            loops,
        })
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame {
                chunk: Bytes::from(i.to_string()),
                delay: Duration::ZERO,
            })
            .collect()
    }

    #[test]
    fn gif_names() {
        assert!(is_gif_name("cat"));
        assert!(is_gif_name("chirno_2-b"));
        assert!(!is_gif_name(""));
        assert!(!is_gif_name("../etc/passwd"));
        assert!(!is_gif_name("a/b"));
        assert!(!is_gif_name("cat.gif"));
    }

    #[test]
    fn playback_wraps_and_stops_after_loops() {
        let mut endless = Playback::new("a".into(), frames(2), 0);
        let order: Vec<Bytes> = (0..5).map(|_| endless.advance().unwrap().chunk).collect();
        assert_eq!(order, ["0", "1", "0", "1", "0"].map(Bytes::from));

        let mut twice = Playback::new("b".into(), frames(3), 2);
        assert_eq!(std::iter::from_fn(|| twice.advance()).count(), 6);
        assert!(twice.advance().is_none());
    }

    #[tokio::test]
    async fn missing_gif_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = serve_gif(State(config(dir.path(), 1)), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "GIF image nope not found.\n");
    }

    #[tokio::test]
    async fn invalid_name_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_gif(dir.path(), "cat", &[[1, 2, 3, 255]]);
        let response = serve_gif(State(config(dir.path(), 1)), Path("../cat".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = unknown_path(Uri::from_static("/a/b")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "GIF image a/b not found.\n");
    }

    #[tokio::test]
    async fn broken_gif_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.gif"), b"GIF89a").unwrap();
        let response = serve_gif(State(config(dir.path(), 1)), Path("broken".to_string())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.starts_with("GIF image load error: "));
    }

    #[tokio::test]
    async fn streams_every_frame_for_each_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_gif(dir.path(), "blink", &[[255, 0, 0, 255], [0, 0, 255, 255]]);
        let response = serve_gif(State(config(dir.path(), 2)), Path("blink".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_PLAIN);

        let text = body_text(response).await;
        let chunks: Vec<&str> = text.split(CLEAR_SCREEN).skip(1).collect();
        assert_eq!(chunks.len(), 4);
        assert_ne!(chunks[0], chunks[1]);
        assert_eq!(chunks[0], chunks[2]);
        assert_eq!(chunks[1], chunks[3]);
        assert!(chunks.iter().all(|chunk| chunk.ends_with("\x1b[0m\n\n")));
    }
}
