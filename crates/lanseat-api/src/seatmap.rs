//! Seating-map image rendered for the roster channel.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};

/// Seats per block; blocks are laid out left to right.
const SEATS_PER_BLOCK: u32 = 20;
const ROWS_PER_BLOCK: u32 = 10;
/// Distance between neighbouring seats, in pixels.
const SEAT_PITCH: u32 = 42;
const BLOCK_SPACING: u32 = 252;
const ORIGIN_X: u32 = 210;
const ORIGIN_Y: u32 = 192;
const MARK_WIDTH: u32 = 40;
const MARK_HEIGHT: u32 = 39;

const PAID: Rgba<u8> = Rgba([230, 20, 20, 128]);
const UNPAID: Rgba<u8> = Rgba([255, 160, 0, 128]);
const EMPTY_OUTLINE: Rgba<u8> = Rgba([180, 180, 180, 255]);
const CANVAS: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// One occupied seat as shown on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatMarker {
    pub seat: u32,
    pub nickname: String,
    pub paid: bool,
}

/// Turns seat occupancy into a PNG. Called from a blocking thread.
pub trait SeatMapRenderer: Send + Sync {
    fn render(&self, total_seats: u32, seats: &[SeatMarker]) -> Result<Vec<u8>>;
}

/// Top-left pixel of a seat cell. Odd seats sit in the left column of their
/// block, even seats in the right one, two seats per row.
pub fn seat_coordinates(seat: u32) -> (u32, u32) {
    let block = (seat.saturating_sub(1)) / SEATS_PER_BLOCK;
    let col = if seat % 2 == 0 { 1 } else { 0 };
    let row = (seat.div_ceil(2).saturating_sub(1)) % ROWS_PER_BLOCK;
    (
        ORIGIN_X + block * BLOCK_SPACING + col * SEAT_PITCH,
        ORIGIN_Y + row * SEAT_PITCH,
    )
}

/// Draws the seat grid: paid seats red, unpaid seats orange, on top of an
/// optional PNG background. Without a background, empty seats are outlined
/// on a white canvas.
#[derive(Debug, Clone, Default)]
pub struct GridRenderer {
    pub background: Option<PathBuf>,
}

impl GridRenderer {
    pub fn new(background: Option<PathBuf>) -> Self {
        Self { background }
    }

    fn canvas(&self, total_seats: u32) -> Result<RgbaImage> {
        if let Some(path) = &self.background {
            let img = image::open(path)
                .with_context(|| format!("failed to open seat-map background {}", path.display()))?;
            return Ok(img.to_rgba8());
        }

        let blocks = total_seats.div_ceil(SEATS_PER_BLOCK).max(1);
        let width = ORIGIN_X * 2 + (blocks - 1) * BLOCK_SPACING + 2 * SEAT_PITCH;
        let height = ORIGIN_Y * 2 + ROWS_PER_BLOCK * SEAT_PITCH;
        let mut img = RgbaImage::from_pixel(width, height, CANVAS);
        for seat in 1..=total_seats {
            let (x, y) = seat_coordinates(seat);
            outline(&mut img, x + 1, y + 3, MARK_WIDTH, MARK_HEIGHT, EMPTY_OUTLINE);
        }
        Ok(img)
    }
}

impl SeatMapRenderer for GridRenderer {
    fn render(&self, total_seats: u32, seats: &[SeatMarker]) -> Result<Vec<u8>> {
        let mut img = self.canvas(total_seats)?;
        for marker in seats {
            let (x, y) = seat_coordinates(marker.seat);
            let color = if marker.paid { PAID } else { UNPAID };
            fill(&mut img, x + 1, y + 3, MARK_WIDTH, MARK_HEIGHT, color);
        }

        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .context("failed to encode seat map")?;
        Ok(png)
    }
}

fn fill(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            let under = *img.get_pixel(x, y);
            img.put_pixel(x, y, blend(under, color));
        }
    }
}

fn outline(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgba<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            if x == x0 || y == y0 || x == x0 + w - 1 || y == y0 + h - 1 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Source-over blend of `top` onto an opaque-ish `under`.
fn blend(under: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let alpha = u16::from(top[3]);
    let mix = |a: u8, b: u8| ((u16::from(b) * alpha + u16::from(a) * (255 - alpha)) / 255) as u8;
    Rgba([mix(under[0], top[0]), mix(under[1], top[1]), mix(under[2], top[2]), under[3].max(top[3])])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_grid_positions() {
        assert_eq!(seat_coordinates(1), (210, 192));
        assert_eq!(seat_coordinates(2), (252, 192));
        assert_eq!(seat_coordinates(3), (210, 234));
        assert_eq!(seat_coordinates(20), (252, 192 + 9 * 42));
        assert_eq!(seat_coordinates(21), (462, 192));
        assert_eq!(seat_coordinates(22), (504, 192));
    }

    #[test]
    fn renders_png_with_coloured_seats() {
        let renderer = GridRenderer::default();
        let png = renderer
            .render(
                40,
                &[
                    SeatMarker { seat: 1, nickname: "Nova".into(), paid: true },
                    SeatMarker { seat: 22, nickname: "Orion".into(), paid: false },
                ],
            )
            .unwrap();

        let img = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap().to_rgba8();
        let (x, y) = seat_coordinates(1);
        let paid = img.get_pixel(x + 20, y + 20);
        assert!(paid[0] > paid[1], "paid seat should be red, got {:?}", paid);

        let (x, y) = seat_coordinates(22);
        let unpaid = img.get_pixel(x + 20, y + 20);
        assert!(unpaid[0] > 200 && unpaid[1] > 150 && unpaid[2] < 150, "unpaid seat should be orange, got {:?}", unpaid);

        let (x, y) = seat_coordinates(5);
        assert_eq!(*img.get_pixel(x + 20, y + 20), CANVAS);
    }

    #[test]
    fn missing_background_is_an_error() {
        let renderer = GridRenderer::new(Some(PathBuf::from("/nonexistent/seating.png")));
        assert!(renderer.render(10, &[]).is_err());
    }
}
