//! Rendering of payment text into QR code images.
//!
//! The module matrix comes from the `qrcode` crate; everything after that
//! (quiet zone, module scaling, PNG/SVG/console output) happens here.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use tracing::debug;

use crate::error::{Error, Result};

/// Largest raster `render_image` allocates, in pixels.
pub const MAX_PIXELS: u64 = 1 << 28;

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    #[default]
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl From<QrCodeEcc> for EcLevel {
    fn from(ecc: QrCodeEcc) -> Self {
        match ecc {
            QrCodeEcc::Low => EcLevel::L,
            QrCodeEcc::Medium => EcLevel::M,
            QrCodeEcc::Quartile => EcLevel::Q,
            QrCodeEcc::High => EcLevel::H,
        }
    }
}

/// Rendering preferences.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RenderOptions {
    /// Error correction level.
    pub ecc: QrCodeEcc,
    /// Edge length of one module, in pixels.
    pub box_size: u32,
    /// Width of the light quiet zone, in modules.
    pub border: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ecc: QrCodeEcc::Medium,
            box_size: 10,
            border: 4,
        }
    }
}

/// A QR module matrix, with out-of-range coordinates reading as light.
pub struct Modules {
    code: QrCode,
}

impl Modules {
    /// Encodes `text` at the given error correction level.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::QrRender`] if the text does not fit any QR version.
    pub fn encode(text: &str, ecc: QrCodeEcc) -> Result<Self> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), ecc.into())?;
        debug!(width = code.width(), ?ecc, chars = text.len(), "encoded QR matrix");
        Ok(Self { code })
    }

    /// Returns the edge length in modules, between 21 and 177.
    pub fn size(&self) -> i64 {
        self.code.width() as i64
    }

    /// Returns `true` for a dark module. Coordinates outside the symbol are light.
    pub fn get_module(&self, x: i64, y: i64) -> bool {
        let range = 0..self.size();
        range.contains(&x)
            && range.contains(&y)
            && self.code[(x as usize, y as usize)] == Color::Dark
    }
}

/// Renders `text` as a grayscale image, `box_size` pixels per module,
/// surrounded by a `border`-module quiet zone.
///
/// # Example
///
/// ```rust
/// use paybysquare::render::{render_image, RenderOptions};
///
/// let opts = RenderOptions { box_size: 1, ..RenderOptions::default() };
/// let img = render_image("HELLO WORLD", &opts).unwrap();
/// assert_eq!(img.dimensions(), (29, 29));
/// ```
pub fn render_image(text: &str, opts: &RenderOptions) -> Result<ImageBuffer<Luma<u8>, Vec<u8>>> {
    let modules = Modules::encode(text, opts.ecc)?;
    let box_size = opts.box_size.max(1);
    let border = i64::from(opts.border);
    let width = modules.size() as u32;
    let size = opts
        .border
        .checked_mul(2)
        .and_then(|b| b.checked_add(width))
        .and_then(|side| side.checked_mul(box_size))
        .filter(|&side| u64::from(side) * u64::from(side) <= MAX_PIXELS)
        .ok_or(Error::ImageTooLarge {
            modules: width,
            box_size,
            border: opts.border,
        })?;
    let mut img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::new(size, size);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let qr_x = i64::from(x / box_size) - border;
        let qr_y = i64::from(y / box_size) - border;
        *pixel = if modules.get_module(qr_x, qr_y) {
            Luma([0u8]) // Black
        } else {
            Luma([255u8]) // White
        };
    }

    Ok(img)
}

/// Renders `text` and encodes the image as PNG.
pub fn render_png(text: &str, opts: &RenderOptions) -> Result<Vec<u8>> {
    let img = render_image(text, opts)?;
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Renders `text` as a `data:image/png;base64,...` URI for embedding in HTML.
pub fn render_data_uri(text: &str, opts: &RenderOptions) -> Result<String> {
    let png = render_png(text, opts)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Renders `text` as PNG and writes it into `directory`.
///
/// The directory defaults to `generated` and is created when missing. The
/// file name defaults to the current Unix time. Returns the written path.
pub fn save_png(
    text: &str,
    opts: &RenderOptions,
    directory: Option<&Path>,
    filename: Option<&str>,
) -> Result<PathBuf> {
    let directory = directory.unwrap_or(Path::new("generated"));
    let filename = match filename {
        Some(name) => name.trim_end_matches(".png").to_string(),
        None => {
            let since_the_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            since_the_epoch.as_millis().to_string()
        }
    };
    if !directory.exists() {
        fs::create_dir_all(directory)?;
    }
    let path = directory.join(format!("{filename}.png"));
    fs::write(&path, render_png(text, opts)?)?;
    Ok(path)
}

/// Returns SVG markup for `text`, one unit per module.
/// The string always uses Unix newlines (\n), regardless of the platform.
pub fn render_svg(text: &str, opts: &RenderOptions) -> Result<String> {
    let modules = Modules::encode(text, opts.ecc)?;
    let border = i64::from(opts.border);
    let dimension = modules.size() + border * 2;

    let path = (0..modules.size())
        .flat_map(|y| (0..modules.size()).map(move |x| (x, y)))
        .filter(|&(x, y)| modules.get_module(x, y))
        .map(|(x, y)| format!("M{},{}h1v1h-1z", x + border, y + border))
        .collect::<Vec<_>>()
        .join(" ");

    Ok(format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {dim} {dim}\" stroke=\"none\">\n",
            "\t<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n",
            "\t<path d=\"{path}\" fill=\"#000000\"/>\n",
            "</svg>\n",
        ),
        dim = dimension,
        path = path,
    ))
}

/// Draws `text` as block characters for a terminal, two columns per module.
pub fn render_console(text: &str, opts: &RenderOptions) -> Result<String> {
    let modules = Modules::encode(text, opts.ecc)?;
    let border = i64::from(opts.border);
    let mut out = String::new();
    for y in -border..modules.size() + border {
        for x in -border..modules.size() + border {
            let c = if modules.get_module(x, y) { '█' } else { ' ' };
            out.push(c);
            out.push(c);
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_image_dimensions() {
        // Version 1 (21 modules) plus a 4-module border on each side.
        let opts = RenderOptions {
            ecc: QrCodeEcc::Low,
            box_size: 1,
            border: 4,
        };
        let img = render_image("Hello, world!", &opts).unwrap();
        assert_eq!(img.dimensions(), (29, 29));

        let opts = RenderOptions { box_size: 3, ..opts };
        assert_eq!(render_image("Hello, world!", &opts).unwrap().dimensions(), (87, 87));
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let img = render_image("HELLO", &RenderOptions::default()).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Luma([255u8]));
        // Top-left finder pattern starts right after the border.
        assert_eq!(img.get_pixel(40, 40), &Luma([0u8]));
    }

    #[test]
    fn test_data_uri_is_png() {
        let uri = render_data_uri("HELLO", &RenderOptions::default()).unwrap();
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        let png = STANDARD.decode(b64).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_render_svg() {
        let svg = render_svg("HELLO WORLD", &RenderOptions::default()).unwrap();
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("viewBox=\"0 0 29 29\""));
        assert!(svg.contains("M4,4h1v1h-1z"));
    }

    #[test]
    fn test_render_console() {
        let opts = RenderOptions {
            border: 1,
            ..RenderOptions::default()
        };
        let art = render_console("HELLO", &opts).unwrap();
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines.len(), 23);
        assert_eq!(lines[0].chars().count(), 46);
    }

    #[test]
    fn test_too_long_text_is_an_error() {
        let text = "A".repeat(5000);
        assert!(matches!(
            render_image(&text, &RenderOptions::default()),
            Err(crate::Error::QrRender(_))
        ));
    }

    #[test]
    fn test_oversized_image_is_an_error() {
        let huge_box = RenderOptions {
            box_size: u32::MAX,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_image("HELLO", &huge_box),
            Err(Error::ImageTooLarge { box_size: u32::MAX, .. })
        ));

        let huge_border = RenderOptions {
            border: u32::MAX / 2 + 1,
            ..RenderOptions::default()
        };
        assert!(matches!(
            render_png("HELLO", &huge_border),
            Err(Error::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn test_svg_path_covers_dark_modules() {
        let opts = RenderOptions {
            border: 0,
            ..RenderOptions::default()
        };
        let svg = render_svg("HELLO", &opts).unwrap();
        let modules = Modules::encode("HELLO", opts.ecc).unwrap();
        let dark = (0..modules.size())
            .flat_map(|y| (0..modules.size()).map(move |x| (x, y)))
            .filter(|&(x, y)| modules.get_module(x, y))
            .count();
        assert_eq!(svg.matches("h1v1h-1z").count(), dark);
        assert!(svg.contains("M0,0h1v1h-1z"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("qr");
        let path = save_png("HELLO", &RenderOptions::default(), Some(nested.as_path()), Some("code.png")).unwrap();
        assert_eq!(path, nested.join("code.png"));
        assert!(path.exists());
    }
}
