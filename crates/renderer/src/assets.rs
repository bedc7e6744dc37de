//! Fetches and decodes the three scene images.
//!
//! Each image is loaded on its own worker thread and the results fan back in
//! over a channel. The first failure aborts the whole load; workers still in
//! flight finish on their own and their results are dropped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;

use crossbeam_channel::unbounded;
use image::RgbaImage;
use reqwest::blocking::Client;
use reqwest::Url;

use crate::layout::TextureSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Cloud texture feeding both displacement filters.
    Displacement,
    /// The fish sprite.
    Foreground,
    /// The sea backdrop.
    Background,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [
        AssetKind::Displacement,
        AssetKind::Foreground,
        AssetKind::Background,
    ];

    /// Fixed location of the image relative to the asset root.
    pub fn relative_path(self) -> &'static str {
        match self {
            AssetKind::Displacement => "dmaps/clouds.jpg",
            AssetKind::Foreground => "turska-sardiini.png",
            AssetKind::Background => "meri2.jpg",
        }
    }

    fn label(self) -> &'static str {
        match self {
            AssetKind::Displacement => "displacement",
            AssetKind::Foreground => "foreground",
            AssetKind::Background => "background",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid asset root '{0}'")]
    InvalidRoot(String),
    #[error("failed to read {kind} image at {}", .path.display())]
    Read {
        kind: AssetKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {kind} image from {url}")]
    Fetch {
        kind: AssetKind,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{kind} image request to {url} returned status {status}")]
    Status {
        kind: AssetKind,
        url: String,
        status: u16,
    },
    #[error("failed to decode {kind} image")]
    Decode {
        kind: AssetKind,
        #[source]
        source: image::ImageError,
    },
    #[error("{kind} image is {width}x{height}, larger than the GPU limit of {limit}px per side")]
    TooLarge {
        kind: AssetKind,
        width: u32,
        height: u32,
        limit: u32,
    },
    #[error("asset loader worker exited before reporting a result")]
    Interrupted,
}

/// Where the scene images are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRoot {
    Directory(PathBuf),
    Remote(Url),
}

impl AssetRoot {
    pub fn parse(raw: &str) -> Result<Self, AssetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AssetError::InvalidRoot(raw.to_string()));
        }

        if trimmed.contains("://") {
            let mut url =
                Url::parse(trimmed).map_err(|_| AssetError::InvalidRoot(raw.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AssetError::InvalidRoot(raw.to_string()));
            }
            // `Url::join` replaces the last segment unless the base ends in a slash.
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(AssetRoot::Remote(url));
        }

        Ok(AssetRoot::Directory(PathBuf::from(trimmed)))
    }

    /// Human-readable location of one asset, for logs and errors.
    pub fn locate(&self, kind: AssetKind) -> String {
        match self {
            AssetRoot::Directory(dir) => dir.join(kind.relative_path()).display().to_string(),
            AssetRoot::Remote(base) => base
                .join(kind.relative_path())
                .map(|url| url.to_string())
                .unwrap_or_else(|_| format!("{base}{}", kind.relative_path())),
        }
    }
}

impl FromStr for AssetRoot {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetRoot::parse(s)
    }
}

impl fmt::Display for AssetRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRoot::Directory(dir) => write!(f, "{}", dir.display()),
            AssetRoot::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// A decoded image in straight-alpha RGBA8.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub kind: AssetKind,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn size(&self) -> TextureSize {
        TextureSize::new(self.pixels.width(), self.pixels.height())
    }
}

#[derive(Debug, Clone)]
pub struct SceneImages {
    pub displacement: LoadedImage,
    pub foreground: LoadedImage,
    pub background: LoadedImage,
}

/// Loads all three scene images concurrently.
pub fn load_scene_images(root: &AssetRoot) -> Result<SceneImages, AssetError> {
    let client = match root {
        AssetRoot::Remote(_) => Some(Client::new()),
        AssetRoot::Directory(_) => None,
    };

    let (tx, rx) = unbounded();
    for kind in AssetKind::ALL {
        let tx = tx.clone();
        let root = root.clone();
        let client = client.clone();
        let spawned = thread::Builder::new()
            .name(format!("asset-{kind}"))
            .spawn(move || {
                let result = load_one(&root, kind, client.as_ref());
                let _ = tx.send((kind, result));
            });
        if let Err(err) = spawned {
            tracing::error!(%kind, error = %err, "failed to spawn asset loader thread");
            return Err(AssetError::Interrupted);
        }
    }
    drop(tx);

    let mut displacement = None;
    let mut foreground = None;
    let mut background = None;
    for _ in AssetKind::ALL {
        let (kind, result) = rx.recv().map_err(|_| AssetError::Interrupted)?;
        let image = result?;
        tracing::debug!(
            %kind,
            width = image.pixels.width(),
            height = image.pixels.height(),
            "loaded scene image"
        );
        match kind {
            AssetKind::Displacement => displacement = Some(image),
            AssetKind::Foreground => foreground = Some(image),
            AssetKind::Background => background = Some(image),
        }
    }

    match (displacement, foreground, background) {
        (Some(displacement), Some(foreground), Some(background)) => Ok(SceneImages {
            displacement,
            foreground,
            background,
        }),
        _ => Err(AssetError::Interrupted),
    }
}

fn load_one(
    root: &AssetRoot,
    kind: AssetKind,
    client: Option<&Client>,
) -> Result<LoadedImage, AssetError> {
    let bytes = match root {
        AssetRoot::Directory(dir) => read_file(&dir.join(kind.relative_path()), kind)?,
        AssetRoot::Remote(base) => {
            let url = base
                .join(kind.relative_path())
                .map_err(|_| AssetError::InvalidRoot(base.to_string()))?;
            let client = client.cloned().unwrap_or_default();
            fetch(&client, url, kind)?
        }
    };
    decode(kind, &bytes)
}

fn read_file(path: &Path, kind: AssetKind) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn fetch(client: &Client, url: Url, kind: AssetKind) -> Result<Vec<u8>, AssetError> {
    let display = url.to_string();
    let response = client
        .get(url)
        .send()
        .map_err(|source| AssetError::Fetch {
            kind,
            url: display.clone(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::Status {
            kind,
            url: display,
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().map_err(|source| AssetError::Fetch {
        kind,
        url: display,
        source,
    })?;
    Ok(bytes.to_vec())
}

fn decode(kind: AssetKind, bytes: &[u8]) -> Result<LoadedImage, AssetError> {
    let image =
        image::load_from_memory(bytes).map_err(|source| AssetError::Decode { kind, source })?;
    Ok(LoadedImage {
        kind,
        pixels: image.to_rgba8(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};
    use tempfile::TempDir;

    fn write_scene(dir: &Path, skip: Option<AssetKind>) {
        std::fs::create_dir_all(dir.join("dmaps")).unwrap();
        if skip != Some(AssetKind::Displacement) {
            RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]))
                .save(dir.join(AssetKind::Displacement.relative_path()))
                .unwrap();
        }
        if skip != Some(AssetKind::Foreground) {
            RgbaImage::from_pixel(40, 30, Rgba([255, 0, 0, 200]))
                .save(dir.join(AssetKind::Foreground.relative_path()))
                .unwrap();
        }
        if skip != Some(AssetKind::Background) {
            RgbImage::from_pixel(64, 36, Rgb([0, 0, 255]))
                .save(dir.join(AssetKind::Background.relative_path()))
                .unwrap();
        }
    }

    #[test]
    fn loads_all_three_images_from_directory() {
        let dir = TempDir::new().unwrap();
        write_scene(dir.path(), None);
        let root = AssetRoot::Directory(dir.path().to_path_buf());
        let images = load_scene_images(&root).expect("scene images");
        assert_eq!(images.displacement.size(), TextureSize::new(8, 8));
        assert_eq!(images.foreground.size(), TextureSize::new(40, 30));
        assert_eq!(images.background.size(), TextureSize::new(64, 36));
        assert_eq!(images.foreground.pixels.get_pixel(0, 0), &Rgba([255, 0, 0, 200]));
    }

    #[test]
    fn missing_image_fails_the_whole_load() {
        let dir = TempDir::new().unwrap();
        write_scene(dir.path(), Some(AssetKind::Background));
        let root = AssetRoot::Directory(dir.path().to_path_buf());
        let err = load_scene_images(&root).unwrap_err();
        match err {
            AssetError::Read { kind, path, .. } => {
                assert_eq!(kind, AssetKind::Background);
                assert!(path.ends_with("meri2.jpg"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn corrupt_image_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        write_scene(dir.path(), Some(AssetKind::Foreground));
        std::fs::write(dir.path().join("turska-sardiini.png"), b"not a png").unwrap();
        let root = AssetRoot::Directory(dir.path().to_path_buf());
        let err = load_scene_images(&root).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Decode {
                kind: AssetKind::Foreground,
                ..
            }
        ));
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    /// Serves `routes` over plain HTTP/1.1; anything else is a 404.
    fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;
        use std::sync::Arc;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let routes = Arc::clone(&routes);
                thread::spawn(move || {
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).unwrap();
                    loop {
                        let mut header = String::new();
                        if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                            break;
                        }
                    }
                    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                    let body = routes
                        .iter()
                        .find(|(route, _)| *route == path)
                        .map(|(_, body)| body.as_slice());
                    let (status, body) = match body {
                        Some(body) => ("200 OK", body),
                        None => ("404 Not Found", &b"missing"[..]),
                    };
                    let head = format!(
                        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).unwrap();
                    stream.write_all(body).unwrap();
                });
            }
        });
        format!("http://{addr}/static")
    }

    #[test]
    fn loads_all_three_images_over_http() {
        let base = serve(vec![
            ("/static/dmaps/clouds.jpg", png_bytes(8, 8)),
            ("/static/turska-sardiini.png", png_bytes(40, 30)),
            ("/static/meri2.jpg", png_bytes(64, 36)),
        ]);
        let root = AssetRoot::parse(&base).unwrap();
        let images = load_scene_images(&root).expect("remote scene images");
        assert_eq!(images.displacement.size(), TextureSize::new(8, 8));
        assert_eq!(images.foreground.size(), TextureSize::new(40, 30));
        assert_eq!(images.background.size(), TextureSize::new(64, 36));
    }

    #[test]
    fn remote_not_found_fails_the_whole_load() {
        let base = serve(vec![
            ("/static/dmaps/clouds.jpg", png_bytes(8, 8)),
            ("/static/turska-sardiini.png", png_bytes(40, 30)),
        ]);
        let root = AssetRoot::parse(&base).unwrap();
        let err = load_scene_images(&root).unwrap_err();
        match err {
            AssetError::Status { kind, status, url } => {
                assert_eq!(kind, AssetKind::Background);
                assert_eq!(status, 404);
                assert!(url.ends_with("/static/meri2.jpg"), "{url}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unreachable_host_reports_fetch_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let root = AssetRoot::parse(&format!("http://{addr}/static")).unwrap();
        let err = load_scene_images(&root).unwrap_err();
        assert!(matches!(err, AssetError::Fetch { .. }), "{err:?}");
    }

    #[test]
    fn remote_root_gains_trailing_slash() {
        let root = AssetRoot::parse("https://example.org/static").unwrap();
        assert_eq!(
            root.locate(AssetKind::Displacement),
            "https://example.org/static/dmaps/clouds.jpg"
        );
        assert_eq!(
            root.locate(AssetKind::Background),
            "https://example.org/static/meri2.jpg"
        );
    }

    #[test]
    fn plain_path_is_a_directory_root() {
        let root: AssetRoot = "./public".parse().unwrap();
        assert_eq!(root, AssetRoot::Directory(PathBuf::from("./public")));
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(matches!(
            AssetRoot::parse("ftp://example.org/assets"),
            Err(AssetError::InvalidRoot(_))
        ));
        assert!(matches!(
            AssetRoot::parse("   "),
            Err(AssetError::InvalidRoot(_))
        ));
    }
}
