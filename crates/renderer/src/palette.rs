//! Fixed palettes per endpoint family.

use authority::PaletteFamily;

/// RGBA color on the wire: `[r, g, b, a]`.
pub type Rgba = [u8; 4];

/// Neutral gray used when there is nothing to classify.
pub const DEFAULT_SYMBOL_COLOR: Rgba = [200, 200, 200, 255];

/// Sequential red → green ramp for opportunity/strategic scoring.
const SEQUENTIAL_RED_GREEN: [Rgba; 4] = [
    [215, 48, 39, 255],
    [253, 174, 97, 255],
    [166, 217, 106, 255],
    [26, 152, 80, 255],
];

/// Diverging ramp centered at zero for difference endpoints.
const DIVERGING: [Rgba; 4] = [
    [202, 0, 32, 255],
    [244, 165, 130, 255],
    [146, 197, 222, 255],
    [5, 113, 176, 255],
];

/// Colors for `classes` classes. Counts other than four interpolate by
/// index into the base ramp.
pub fn class_colors(palette: PaletteFamily, classes: usize) -> Vec<Rgba> {
    let ramp: &[Rgba; 4] = match palette {
        PaletteFamily::SequentialRedGreen => &SEQUENTIAL_RED_GREEN,
        PaletteFamily::Diverging => &DIVERGING,
    };
    if classes == 0 {
        return Vec::new();
    }
    if classes == ramp.len() {
        return ramp.to_vec();
    }
    (0..classes)
        .map(|i| {
            let index = if classes == 1 {
                ramp.len() / 2
            } else {
                i * (ramp.len() - 1) / (classes - 1)
            };
            ramp[index]
        })
        .collect()
}
