//! Minimal heapsave guest
//!
//! Renders an escape-time fractal into an 8-bit grayscale buffer and hands
//! it to the host with `save_file`, either raw or PNG-encoded. Built for
//! `wasm32-unknown-unknown` this is what the heapsave end-to-end tests run.

use heapsave_runtime::{eprintln, println, save_file};

/// Iteration cap for the escape-time loop
pub const MAX_ITERATIONS: u32 = 64;

/// Julia constant used by the explorer's default view
pub const DEFAULT_JULIA_C: (f32, f32) = (-1.35, 0.05);

/// Size of a PNG export at scale 1
pub const EXPORT_BASE_SIZE: (i32, i32) = (1920, 1080);

/// Largest image the guest renders, in pixels (a scale 4 export)
pub const MAX_EXPORT_PIXELS: usize = 1920 * 1080 * 16;

/// How exported pixels are written
#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Raw,
    Png,
}

/// Which set to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fractal {
    Mandelbrot,
    Julia { c: (f32, f32) },
}

/// View parameters: zoom is `2^scale`, `offset` is in fractal coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub scale: f32,
    pub offset: (f32, f32),
}

impl Default for View {
    fn default() -> Self {
        Self {
            scale: 0.0,
            offset: (0.0, 0.0),
        }
    }
}

/// Number of iterations before `z` escapes the radius-2 disc
fn escape_time(mut z: (f32, f32), c: (f32, f32)) -> u32 {
    for i in 0..MAX_ITERATIONS {
        if z.0 * z.0 + z.1 * z.1 > 4.0 {
            return i;
        }
        z = (z.0 * z.0 - z.1 * z.1 + c.0, 2.0 * z.0 * z.1 + c.1);
    }
    MAX_ITERATIONS
}

/// Render `fractal` as `width * height` grayscale bytes, row-major
///
/// Points that never escape are 0; escaping points are scaled to `1..=255`.
/// The vertical axis spans `[-1, 1] / 2^scale`, the horizontal one keeps
/// the pixel aspect ratio.
pub fn render(fractal: Fractal, view: View, width: usize, height: usize) -> Vec<u8> {
    let zoom = 2f32.powf(view.scale);
    let half_h = height as f32 * 0.5;
    let half_w = width as f32 * 0.5;

    let mut pixels = Vec::with_capacity(width * height);
    for py in 0..height {
        for px in 0..width {
            let point = (
                (px as f32 - half_w) / (zoom * half_h) + view.offset.0 / zoom,
                (py as f32 - half_h) / (zoom * half_h) + view.offset.1 / zoom,
            );
            let iterations = match fractal {
                Fractal::Mandelbrot => escape_time((0.0, 0.0), point),
                Fractal::Julia { c } => escape_time(point, c),
            };
            pixels.push(shade(iterations));
        }
    }
    pixels
}

fn shade(iterations: u32) -> u8 {
    if iterations >= MAX_ITERATIONS {
        0
    } else {
        (1 + iterations * 254 / (MAX_ITERATIONS - 1)) as u8
    }
}

/// Validate an export size; the pixel count must fit in [`MAX_EXPORT_PIXELS`]
fn dimensions(width: i32, height: i32) -> Option<(usize, usize)> {
    let (w, h) = match (usize::try_from(width), usize::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => return None,
    };
    match w.checked_mul(h) {
        Some(pixels) if pixels <= MAX_EXPORT_PIXELS => Some((w, h)),
        _ => None,
    }
}

/// Encode `width * height` grayscale bytes as an 8-bit PNG
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, png::EncodingError> {
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    writer.finish()?;
    Ok(out)
}

fn export(fractal: Fractal, filename: &str, width: i32, height: i32, format: Format) -> i32 {
    let Some((width, height)) = dimensions(width, height) else {
        eprintln!("Invalid export size {}x{}", width, height);
        return -1;
    };

    let pixels = render(fractal, View::default(), width, height);
    let bytes = match format {
        Format::Raw => pixels,
        // Both sides are below MAX_EXPORT_PIXELS, so they fit in u32.
        Format::Png => match encode_png(&pixels, width as u32, height as u32) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("PNG encoding failed: {}", e);
                return -1;
            }
        },
    };

    println!("Exporting {}x{} image as {}", width, height, filename);
    match save_file(filename, &bytes) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Export failed: {}", e);
            -1
        }
    }
}

/// Render the Mandelbrot set and save it as `fractal.raw`
#[no_mangle]
pub extern "C" fn export_fractal(width: i32, height: i32) -> i32 {
    export(Fractal::Mandelbrot, "fractal.raw", width, height, Format::Raw)
}

/// Render the default Julia set and save it as `julia.raw`
#[no_mangle]
pub extern "C" fn export_julia(width: i32, height: i32) -> i32 {
    export(Fractal::Julia { c: DEFAULT_JULIA_C }, "julia.raw", width, height, Format::Raw)
}

/// Render the Mandelbrot set at `1920 * scale` by `1080 * scale` and save it
/// as `fractal.png`
#[no_mangle]
pub extern "C" fn export_fractal_png(scale: i32) -> i32 {
    let (base_w, base_h) = EXPORT_BASE_SIZE;
    match (base_w.checked_mul(scale), base_h.checked_mul(scale)) {
        (Some(width), Some(height)) => export(Fractal::Mandelbrot, "fractal.png", width, height, Format::Png),
        _ => {
            eprintln!("Invalid export scale {}", scale);
            -1
        }
    }
}

/// Save a zero-length `empty.raw`
#[no_mangle]
pub extern "C" fn export_empty() -> i32 {
    match save_file("empty.raw", &[]) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapsave_runtime::take_saved_files;

    #[test]
    fn test_render_mandelbrot() {
        let pixels = render(Fractal::Mandelbrot, View::default(), 16, 8);
        assert_eq!(pixels.len(), 128);
        // The origin is in the set, the corner at (-2, -1) escapes.
        assert_eq!(pixels[4 * 16 + 8], 0);
        assert!(pixels[0] > 0);
    }

    #[test]
    fn test_shade_range() {
        assert_eq!(shade(0), 1);
        assert_eq!(shade(MAX_ITERATIONS - 1), 255);
        assert_eq!(shade(MAX_ITERATIONS), 0);
    }

    #[test]
    fn test_export_saves_fractal() {
        take_saved_files();
        assert_eq!(export_fractal(8, 4), 0);
        assert_eq!(export_julia(3, 3), 0);
        assert_eq!(export_empty(), 0);

        let saved = take_saved_files();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[0].filename, "fractal.raw");
        assert_eq!(saved[0].data, render(Fractal::Mandelbrot, View::default(), 8, 4));
        assert_eq!(saved[1].filename, "julia.raw");
        assert_eq!(saved[1].data.len(), 9);
        assert_eq!(saved[2].filename, "empty.raw");
        assert!(saved[2].data.is_empty());
    }

    #[test]
    fn test_invalid_dimensions() {
        take_saved_files();
        assert_eq!(export_fractal(0, 4), -1);
        assert_eq!(export_julia(4, -1), -1);
        assert!(take_saved_files().is_empty());
    }

    #[test]
    fn test_oversized_dimensions() {
        take_saved_files();
        // 2^32 pixels wraps to 0 in a 32-bit usize.
        assert_eq!(export_fractal(65536, 65536), -1);
        assert_eq!(export_fractal(i32::MAX, i32::MAX), -1);
        assert_eq!(export_julia(i32::MAX, 2), -1);
        assert!(take_saved_files().is_empty());

        assert_eq!(dimensions(1920 * 4, 1080 * 4), Some((7680, 4320)));
        assert_eq!(dimensions(1920 * 4, 1080 * 4 + 1), None);
    }

    #[test]
    fn test_png_export() {
        take_saved_files();
        assert_eq!(export(Fractal::Mandelbrot, "fractal.png", 8, 4, Format::Png), 0);

        let saved = take_saved_files();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].filename, "fractal.png");

        let mut reader = png::Decoder::new(saved[0].data.as_slice()).read_info().unwrap();
        assert_eq!(reader.info().width, 8);
        assert_eq!(reader.info().height, 4);
        assert_eq!(reader.info().color_type, png::ColorType::Grayscale);

        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).unwrap();
        assert_eq!(
            &buf[..frame.buffer_size()],
            render(Fractal::Mandelbrot, View::default(), 8, 4).as_slice()
        );
    }

    #[test]
    fn test_png_export_scale() {
        take_saved_files();
        assert_eq!(export_fractal_png(0), -1);
        assert_eq!(export_fractal_png(-2), -1);
        assert_eq!(export_fractal_png(5), -1);
        assert_eq!(export_fractal_png(i32::MAX), -1);
        assert!(take_saved_files().is_empty());
    }
}
