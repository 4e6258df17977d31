//! Tile reassembly for scrambled page images.
//!
//! A page is cut into an N×N grid. Tiles are numbered column-major, so tile
//! `k` sits at row `k % N`, column `k / N`. The scramble order says which
//! source tile belongs in each destination slot: slot `i` receives the tile
//! found at position `scramble[i]`.

use image::{imageops, DynamicImage, GenericImageView, RgbImage};

use crate::app::{ComiciError, Result};

/// Pixel bounds of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub fn tile_rect(row: u32, col: u32, tile_w: u32, tile_h: u32) -> TileRect {
    TileRect {
        x: col * tile_w,
        y: row * tile_h,
        width: tile_w,
        height: tile_h,
    }
}

/// Grid side for a scramble order. The order must be a permutation of
/// `0..len` with `len` a perfect square.
pub fn grid_side(scramble: &[u32]) -> Result<u32> {
    let len = scramble.len();
    let side = (len as f64).sqrt().floor() as usize;
    if side == 0 || side * side != len {
        return Err(ComiciError::Scramble(format!(
            "order of length {} is not a square grid",
            len
        )));
    }
    let mut seen = vec![false; len];
    for &idx in scramble {
        let slot = seen.get_mut(idx as usize).ok_or_else(|| {
            ComiciError::Scramble(format!("tile index {} out of range for {} tiles", idx, len))
        })?;
        if *slot {
            return Err(ComiciError::Scramble(format!("tile index {} repeated", idx)));
        }
        *slot = true;
    }
    Ok(side as u32)
}

/// Column-major position of tile `k` as (row, col).
fn position(k: u32, side: u32) -> (u32, u32) {
    (k % side, k / side)
}

/// Decode raw image bytes and reassemble them.
pub fn descramble(bytes: &[u8], scramble: &[u32]) -> Result<RgbImage> {
    let side = grid_side(scramble)?;
    let image = image::load_from_memory(bytes)?;
    reassemble(&image, scramble, side)
}

/// Reassemble an already-decoded image.
pub fn descramble_image(image: &DynamicImage, scramble: &[u32]) -> Result<RgbImage> {
    let side = grid_side(scramble)?;
    reassemble(image, scramble, side)
}

fn reassemble(image: &DynamicImage, scramble: &[u32], side: u32) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    let width = width - width % side;
    let height = height - height % side;
    let tile_w = width / side;
    let tile_h = height / side;
    if tile_w == 0 || tile_h == 0 {
        return Err(ComiciError::Scramble(format!(
            "{}x{} image too small for a {}x{} grid",
            image.width(),
            image.height(),
            side,
            side
        )));
    }

    let source = image.to_rgb8();
    let mut restored = RgbImage::new(width, height);
    for (dest, &src) in scramble.iter().enumerate() {
        let (src_row, src_col) = position(src, side);
        let (dest_row, dest_col) = position(dest as u32, side);
        let from = tile_rect(src_row, src_col, tile_w, tile_h);
        let to = tile_rect(dest_row, dest_col, tile_w, tile_h);

        let tile = source.view(from.x, from.y, from.width, from.height).to_image();
        imageops::replace(&mut restored, &tile, i64::from(to.x), i64::from(to.y));
    }
    Ok(restored)
}
