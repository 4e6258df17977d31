use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::RgbImage;

use crate::app::Result;

/// Encoding used for persisted pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `compression` runs 0 (fastest) to 9 (smallest)
    Png { compression: u8 },
    /// Always lossless
    WebP,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Png { compression: 1 }
    }
}

impl OutputFormat {
    pub fn from_flags(webp: bool, compression: u8) -> Self {
        if webp {
            OutputFormat::WebP
        } else {
            OutputFormat::Png {
                compression: compression.min(9),
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png { .. } => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Encode fully in memory.
    pub fn encode(&self, image: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        match self {
            OutputFormat::Png { compression } => {
                let level = match compression {
                    0..=2 => CompressionType::Fast,
                    3..=6 => CompressionType::Default,
                    _ => CompressionType::Best,
                };
                image.write_with_encoder(PngEncoder::new_with_quality(
                    &mut buffer,
                    level,
                    FilterType::Adaptive,
                ))?;
            }
            OutputFormat::WebP => {
                image.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
            }
        }
        Ok(buffer.into_inner())
    }
}

/// `{sort + 1}` zero-padded to `width` digits.
pub fn entry_name(sort: u32, width: usize, format: OutputFormat) -> String {
    format!("{:0width$}.{}", sort + 1, format.extension(), width = width)
}

/// Replace characters that are illegal in file names with their fullwidth
/// forms. Line breaks become spaces.
pub fn legal_path(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                char::from_u32(c as u32 - 0x20 + 0xFF00).unwrap_or('_')
            }
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_entry_name_padding() {
        let png = OutputFormat::default();
        assert_eq!(entry_name(0, 3, png), "001.png");
        assert_eq!(entry_name(23, 3, png), "024.png");
        assert_eq!(entry_name(8, 2, OutputFormat::WebP), "09.webp");
    }

    #[test]
    fn test_legal_path() {
        assert_eq!(legal_path("a/b:c?"), "a／b：c？");
        assert_eq!(legal_path(r#"<"x"|\*>"#), "＜＂x＂｜＼＊＞");
        assert_eq!(legal_path("line\nbreak"), "line break");
        assert_eq!(legal_path("第1話 はじまり"), "第1話 はじまり");
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(OutputFormat::from_flags(true, 9), OutputFormat::WebP);
        assert_eq!(
            OutputFormat::from_flags(false, 42),
            OutputFormat::Png { compression: 9 }
        );
    }

    #[test]
    fn test_encoded_png_decodes() {
        let image = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        for compression in [0, 5, 9] {
            let bytes = OutputFormat::Png { compression }.encode(&image).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
            assert_eq!(decoded, image);
        }
    }

    #[test]
    fn test_webp_is_lossless() {
        let image = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8 * 60, y as u8 * 60, 7]));
        let bytes = OutputFormat::WebP.encode(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded, image);
    }
}
