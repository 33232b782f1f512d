//! Frequency-position colour table.
//!
//! Maps a normalised frequency position in `[0, 1)` to one of eight base
//! colours running from violet through the warm end to magenta.

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One entry of the table: positions in `[range_start, range_end)` get `base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBand {
    pub range_start: f32,
    pub range_end: f32,
    pub base: Rgb,
}

impl ColorBand {
    const fn new(range_start: f32, range_end: f32, base: Rgb) -> Self {
        Self {
            range_start,
            range_end,
            base,
        }
    }

    pub fn contains(&self, position: f32) -> bool {
        position >= self.range_start && position < self.range_end
    }
}

/// The eight contiguous bands, lowest frequency first.
pub const FREQUENCY_COLORS: [ColorBand; 8] = [
    ColorBand::new(0.0, 0.125, Rgb::new(138, 43, 226)),  // violet
    ColorBand::new(0.125, 0.25, Rgb::new(65, 105, 225)), // blue
    ColorBand::new(0.25, 0.375, Rgb::new(0, 206, 209)),  // cyan
    ColorBand::new(0.375, 0.5, Rgb::new(50, 205, 50)),   // green
    ColorBand::new(0.5, 0.625, Rgb::new(255, 215, 0)),   // yellow
    ColorBand::new(0.625, 0.75, Rgb::new(255, 140, 0)),  // orange
    ColorBand::new(0.75, 0.875, Rgb::new(255, 69, 0)),   // red-orange
    ColorBand::new(0.875, 1.0, Rgb::new(255, 20, 147)),  // magenta
];

/// Band for a normalised position. First match wins; anything outside
/// `[0, 1)` (including NaN) falls back to the first band.
pub fn lookup(position: f32) -> &'static ColorBand {
    FREQUENCY_COLORS
        .iter()
        .find(|band| band.contains(position))
        .unwrap_or(&FREQUENCY_COLORS[0])
}

/// Base colour for a normalised position.
pub fn base_color(position: f32) -> Rgb {
    lookup(position).base
}
