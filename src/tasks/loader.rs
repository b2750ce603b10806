use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;

use anyhow::Result;
use fast_image_resize as fir;
use image::RgbaImage;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::Error;
use crate::events::{LoadTextures, PreparedTexture, TextureEvent};

/// Loader tuning taken from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoaderLimits {
    pub max_in_flight: usize,
    pub max_texture_dim: u32,
}

/// Fetches and decodes every requested URI, at most `max_in_flight` at a time.
///
/// Each URI yields exactly one [`TextureEvent`]. The task ends once the
/// request channel is closed and all work has drained, or on cancellation.
#[instrument(skip_all, fields(max_in_flight = limits.max_in_flight))]
pub async fn run(
    mut load_rx: Receiver<LoadTextures>,
    to_viewer: Sender<TextureEvent>,
    client: reqwest::Client,
    cancel: CancellationToken,
    limits: LoaderLimits,
) -> Result<()> {
    let max_in_flight = limits.max_in_flight.max(1);
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut tasks: JoinSet<LoadResult> = JoinSet::new();
    let mut in_flight: HashMap<task::Id, String> = HashMap::new();
    let mut requests_closed = false;
    let (mut loaded, mut failed) = (0_usize, 0_usize);

    loop {
        while tasks.len() < max_in_flight {
            let Some(uri) = queue.pop_front() else {
                break;
            };
            let client = client.clone();
            let max_dim = limits.max_texture_dim;
            let task_uri = uri.clone();
            let handle = tasks.spawn(async move {
                let res = load_texture(&client, &task_uri, max_dim).await;
                (task_uri, res)
            });
            in_flight.insert(handle.id(), uri);
        }

        if requests_closed && tasks.is_empty() && queue.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => {
                debug!(pending = queue.len() + tasks.len(), "cancel received; stopping loader");
                tasks.abort_all();
                break;
            }

            req = load_rx.recv(), if !requests_closed => match req {
                Some(LoadTextures(uris)) => {
                    let before = queue.len();
                    queue.extend(uris.into_iter().filter(|uri| seen.insert(uri.clone())));
                    debug!(queued = queue.len() - before, "texture batch accepted");
                }
                None => requests_closed = true,
            },

            Some(joined) = tasks.join_next_with_id() => {
                let Some(event) = settle(joined, &mut in_flight) else {
                    continue;
                };
                match &event {
                    TextureEvent::Loaded(_) => loaded += 1,
                    TextureEvent::Failed { .. } => failed += 1,
                }
                if to_viewer.send(event).await.is_err() {
                    debug!("viewer gone; stopping loader");
                    tasks.abort_all();
                    break;
                }
            }
        }
    }

    info!(loaded, failed, "loader finished");
    Ok(())
}

type LoadResult = (String, crate::error::Result<PreparedTexture>);

/// Turns a finished load task into the event the viewer expects. A task that
/// panicked or was aborted still reports its URI as failed.
fn settle(
    joined: std::result::Result<(task::Id, LoadResult), JoinError>,
    in_flight: &mut HashMap<task::Id, String>,
) -> Option<TextureEvent> {
    match joined {
        Ok((id, (uri, Ok(prepared)))) => {
            in_flight.remove(&id);
            debug!(%uri, width = prepared.width, height = prepared.height, "texture decoded");
            Some(TextureEvent::Loaded(prepared))
        }
        Ok((id, (uri, Err(err)))) => {
            in_flight.remove(&id);
            warn!(%uri, error = %err, "texture unavailable");
            Some(TextureEvent::Failed {
                uri,
                reason: err.to_string(),
            })
        }
        Err(err) => {
            let Some(uri) = in_flight.remove(&err.id()) else {
                warn!(error = %err, "untracked texture task ended abnormally");
                return None;
            };
            warn!(%uri, error = %err, "texture task ended abnormally");
            Some(TextureEvent::Failed {
                uri,
                reason: format!("load task failed: {err}"),
            })
        }
    }
}

async fn load_texture(
    client: &reqwest::Client,
    uri: &str,
    max_dim: u32,
) -> crate::error::Result<PreparedTexture> {
    let bytes = fetch_bytes(client, uri).await?;
    let owned_uri = uri.to_string();
    tokio::task::spawn_blocking(move || decode_texture(&owned_uri, &bytes, max_dim))
        .await
        .map_err(|err| Error::Fetch {
            uri: uri.to_string(),
            reason: format!("decode task failed: {err}"),
        })?
}

/// Reads the raw bytes behind a catalog URI: HTTP(S) through `client`,
/// anything else from the local filesystem.
pub async fn fetch_bytes(client: &reqwest::Client, uri: &str) -> crate::error::Result<Vec<u8>> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        let resp = client.get(uri).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                uri: uri.to_string(),
                reason: format!("server responded {status}"),
            });
        }
        return Ok(resp.bytes().await?.to_vec());
    }
    tokio::fs::read(uri).await.map_err(|err| Error::Fetch {
        uri: uri.to_string(),
        reason: err.to_string(),
    })
}

/// Decodes to RGBA8, applies EXIF orientation and caps the longest edge at
/// `max_dim`.
pub fn decode_texture(uri: &str, bytes: &[u8], max_dim: u32) -> crate::error::Result<PreparedTexture> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .map_err(|source| Error::Decode {
            uri: uri.to_string(),
            source,
        })?;
    let mut img = img.to_rgba8();

    if let Some(orientation) = read_orientation(bytes) {
        debug!(%uri, orientation, "applying exif orientation");
        img = apply_orientation(img, orientation);
    }

    let img = downscale(uri, img, max_dim)?;
    let (width, height) = img.dimensions();
    Ok(PreparedTexture {
        uri: uri.to_string(),
        width,
        height,
        pixels: img.into_raw(),
    })
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).and_then(|v| u16::try_from(v).ok())
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn downscale(uri: &str, img: RgbaImage, max_dim: u32) -> crate::error::Result<RgbaImage> {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if max_dim == 0 || longest <= max_dim {
        return Ok(img);
    }
    let scale = max_dim as f32 / longest as f32;
    let target_w = ((w as f32 * scale).round() as u32).clamp(1, max_dim);
    let target_h = ((h as f32 * scale).round() as u32).clamp(1, max_dim);

    let resize_err = |reason: String| Error::Resize {
        uri: uri.to_string(),
        reason,
    };
    let src_view = fir::images::ImageRef::new(w, h, img.as_raw(), fir::PixelType::U8x4)
        .map_err(|err| resize_err(err.to_string()))?;
    let mut dst = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    fir::Resizer::new()
        .resize(&src_view, &mut dst, Some(&options))
        .map_err(|err| resize_err(err.to_string()))?;
    debug!(%uri, from = ?(w, h), to = ?(target_w, target_h), "texture downscaled");
    RgbaImage::from_raw(target_w, target_h, dst.into_vec())
        .ok_or_else(|| resize_err("resized buffer has the wrong length".to_string()))
}
