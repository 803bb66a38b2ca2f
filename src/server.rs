// HTTP surface
//
// One endpoint: POST /api/embed, multipart form-data in, JSON out. The
// handler decodes the upload to an 8-bit BGR buffer, runs the embedding
// pipeline, and returns the marked image as base64-encoded PNG together
// with a fingerprint of the input (the template id a detector uses to look
// up the matching original).

use std::io::Cursor;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::json;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::config::Config;
use crate::embed::{embed_bgr, EmbedParams, DEFAULT_GRID_AMPLITUDE, DEFAULT_MARGIN};
use crate::tiled::{embed_tiled, TiledParams};

// Decoded images above this pixel count are rejected outright
const MAX_PIXELS: u64 = 40_000_000;

// Request bodies carry one image; 64 MiB of form data is plenty
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub struct ServerState {
  pub config: Config,
  pub tiled: TiledParams,
}

impl ServerState {
  pub fn new() -> Self {
    Self {
      config: Config::default(),
      tiled: TiledParams::default(),
    }
  }
}

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("missing required field `{0}`")]
  MissingField(&'static str),
  #[error("invalid value for field `{0}`")]
  InvalidField(&'static str),
  #[error("malformed multipart body: {0}")]
  Multipart(String),
  #[error("could not decode image")]
  Undecodable,
  #[error("image too large: {0} pixels")]
  TooLarge(u64),
  #[error("could not encode output image: {0}")]
  Encode(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
      _ => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    log::info!("request rejected: {}", self);
    (self.status(), Json(json!({ "ok": false, "reason": self.to_string() })))
        .into_response()
  }
}

#[derive(Serialize)]
pub struct EmbedResponse {
  pub ok: bool,
  pub template_id: String,
  pub wm_id: u32,
  pub image_base64: String,
  pub image_mime: &'static str,
}

pub fn router(state: Arc<ServerState>) -> Router {
  Router::new()
      .route("/api/embed", post(embed))
      .layer(Extension(state))
      .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

// First 12 hex digits of SHA-1 over the raw input pixels plus a dimension
// tag, so equal pixel content at different sizes fingerprints differently
pub fn template_id(bgr: &[u8], width: usize, height: usize) -> String {
  let mut hasher = Sha1::new();
  hasher.update(bgr);
  hasher.update(format!("|{}x{}|bgr", width, height).as_bytes());
  let digest = hasher.finalize();

  let mut id = String::with_capacity(12);
  for byte in &digest[..6] {
    id.push_str(&format!("{:02x}", byte));
  }
  return id;
}

async fn embed(
  Extension(state): Extension<Arc<ServerState>>,
  mut multipart: Multipart,
) -> Result<Json<EmbedResponse>, ApiError> {
  let mut image_bytes = None;
  let mut id = None;
  let mut key = None;
  let mut margin = None;
  let mut grid_amplitude = None;
  let mut tiled = false;

  while let Some(field) = multipart
      .next_field()
      .await
      .map_err(|e| ApiError::Multipart(e.to_string()))?
  {
    let name = field.name().unwrap_or("").to_string();
    match name.as_str() {
      "image" => {
        let data = field.bytes().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        image_bytes = Some(data);
      }
      "id" => {
        let text = field.text().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        id = Some(text.trim().parse::<u64>().map_err(|_| ApiError::InvalidField("id"))?);
      }
      "key" => {
        let text = field.text().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        key = Some(text.trim().parse::<u64>().map_err(|_| ApiError::InvalidField("key"))?);
      }
      "margin" => {
        let text = field.text().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        margin = Some(text.trim().parse::<f32>().map_err(|_| ApiError::InvalidField("margin"))?);
      }
      "grid_amp" => {
        let text = field.text().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        grid_amplitude =
            Some(text.trim().parse::<f32>().map_err(|_| ApiError::InvalidField("grid_amp"))?);
      }
      "tiled" => {
        let text = field.text().await.map_err(|e| ApiError::Multipart(e.to_string()))?;
        tiled = matches!(text.trim(), "1" | "true" | "yes");
      }
      _ => {}
    }
  }

  let image_bytes = image_bytes.ok_or(ApiError::MissingField("image"))?;
  let id = id.ok_or(ApiError::MissingField("id"))?;
  let key = key.ok_or(ApiError::MissingField("key"))?;

  // Decode to 8-bit BGR
  let decoded = image::load_from_memory(&image_bytes).map_err(|_| ApiError::Undecodable)?;
  let rgb = decoded.to_rgb8();
  let (width, height) = (rgb.width() as usize, rgb.height() as usize);
  let pixels = (width as u64) * (height as u64);
  if pixels > MAX_PIXELS {
    return Err(ApiError::TooLarge(pixels));
  }

  let mut bgr = rgb.into_raw();
  for px in bgr.chunks_exact_mut(3) {
    px.swap(0, 2);
  }

  // Fingerprint of the input, before any modification
  let template = template_id(&bgr, width, height);

  // Ids wider than the message field are masked to its low bits
  let wm_id = (id & ((1u64 << state.config.id_bits) - 1)) as u32;
  let params = EmbedParams {
    id: wm_id,
    key: key,
    margin: margin.unwrap_or(DEFAULT_MARGIN),
    grid_amplitude: grid_amplitude.unwrap_or(DEFAULT_GRID_AMPLITUDE),
  };

  log::info!("embed: id={} {}x{} tiled={} template={}",
             wm_id, width, height, tiled, template);

  let (marked, out_w, out_h) = if tiled {
    embed_tiled(&state.config, &params, &state.tiled, &bgr, width, height)
  } else {
    (embed_bgr(&state.config, &params, &bgr, width, height), width, height)
  };

  // Back to RGB for the PNG writer
  let mut rgb_out = marked;
  for px in rgb_out.chunks_exact_mut(3) {
    px.swap(0, 2);
  }
  let out_image = image::RgbImage::from_raw(out_w as u32, out_h as u32, rgb_out)
      .ok_or_else(|| ApiError::Encode("buffer size mismatch".to_string()))?;

  let mut png = Vec::new();
  out_image
      .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
      .map_err(|e| ApiError::Encode(e.to_string()))?;

  Ok(Json(EmbedResponse {
    ok: true,
    template_id: template,
    wm_id: wm_id,
    image_base64: BASE64.encode(&png),
    image_mime: "image/png",
  }))
}
