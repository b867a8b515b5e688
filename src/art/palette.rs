use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose, Engine as _};
use image::RgbaImage;
use once_cell::sync::Lazy;

use crate::error::AppError;

/// Brush colors offered by the drawing canvas, in display order.
pub const PALETTE: [(&str, &str); 10] = [
    ("#f44336", "red"),
    ("#ff5800", "orange"),
    ("#faab09", "yellow"),
    ("#008744", "green"),
    ("#0057e7", "blue"),
    ("#a200ff", "purple"),
    ("#ff00c1", "pink"),
    ("#ffffff", "white"),
    ("#646765", "grey"),
    ("#000000", "black"),
];

static PALETTE_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    PALETTE
        .iter()
        .enumerate()
        .map(|(index, (hex, _))| (*hex, index))
        .collect()
});

fn hex_code(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Decodes a `data:<mime>;base64,<payload>` URL into an RGBA raster.
pub fn decode_drawing(data_url: &str) -> Result<RgbaImage, AppError> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or(AppError::MalformedDataUrl)?;
    let bytes = general_purpose::STANDARD.decode(payload.trim())?;
    let image = image::load_from_memory(&bytes)?;
    Ok(image.to_rgba8())
}

/// Names of the palette colors present among the drawing's visible pixels.
///
/// Pixels with zero alpha are ignored and colors outside the palette are dropped, so a
/// blank canvas yields an empty list. Names come back once each, in palette order.
pub fn extract_colors(image: &RgbaImage) -> Vec<&'static str> {
    let distinct: HashSet<[u8; 3]> = image
        .pixels()
        .filter(|pixel| pixel.0[3] > 0)
        .map(|pixel| [pixel.0[0], pixel.0[1], pixel.0[2]])
        .collect();

    let mut indices: Vec<usize> = distinct
        .into_iter()
        .filter_map(|rgb| PALETTE_INDEX.get(hex_code(rgb).as_str()).copied())
        .collect();
    indices.sort_unstable();
    indices.into_iter().map(|index| PALETTE[index].1).collect()
}
