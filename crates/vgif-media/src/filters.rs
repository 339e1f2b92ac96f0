//! FFmpeg filter graphs for palette-based GIF encoding.
//!
//! Both passes must sample and scale identically, otherwise the palette is
//! computed from different frames than the ones it quantizes.

use vgif_models::Fps;

/// Scale expression shared by both passes (keep width, spline resampling).
pub const GIF_SCALE: &str = "scale=iw:-1:flags=spline";

/// Dithering applied when mapping frames onto the palette.
pub const GIF_DITHER: &str = "bayer";

/// Frame sampling and scaling chain used by both passes.
pub fn sampling_chain(fps: Fps) -> String {
    format!("fps={},{}", fps, GIF_SCALE)
}

/// First pass: compute a palette from the sampled frames.
pub fn palettegen_filter(fps: Fps) -> String {
    format!("{},palettegen", sampling_chain(fps))
}

/// Second pass: quantize the sampled frames with the palette on input 1.
pub fn paletteuse_filter(fps: Fps) -> String {
    format!(
        "{} [x]; [x][1:v] paletteuse=dither={}",
        sampling_chain(fps),
        GIF_DITHER
    )
}
