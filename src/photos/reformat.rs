// SPDX-License-Identifier: GPL-3.0-only
use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Target bounding box and JPEG quality of stored photos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoFormat {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl PhotoFormat {
    /// Parse a `WIDTHxHEIGHT` size, e.g. `1024x768`
    pub fn parse(size: &str, quality: u8) -> anyhow::Result<Self> {
        let (width, height) = size
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow::anyhow!("Invalid photo size '{}', expected WIDTHxHEIGHT", size))?;

        let width: u32 = width.trim().parse().with_context(|| format!("Invalid photo width in '{}'", size))?;
        let height: u32 = height.trim().parse().with_context(|| format!("Invalid photo height in '{}'", size))?;
        if width == 0 || height == 0 {
            anyhow::bail!("Photo size '{}' must be non-zero", size);
        }
        if !(5..=100).contains(&quality) {
            anyhow::bail!("Photo quality {} is outside 5..=100", quality);
        }

        Ok(Self { width, height, quality })
    }
}

/// MIME type from the leading bytes of an image
pub fn sniff_mime(content: &[u8]) -> &'static str {
    if content.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if content.starts_with(b"GIF87a") || content.starts_with(b"GIF89a") {
        "image/gif"
    } else if content.len() >= 12 && content.starts_with(b"RIFF") && &content[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Shrink the image to fit the bounding box and re-encode it as JPEG.
/// Decoding and encoding run on the blocking pool.
pub async fn reformat(content: Vec<u8>, format: PhotoFormat) -> anyhow::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || reformat_blocking(&content, format))
        .await
        .context("Photo reformat task panicked")?
}

fn reformat_blocking(content: &[u8], format: PhotoFormat) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(content).context("Failed to decode photo")?;

    let img = if img.width() > format.width || img.height() > format.height {
        img.resize(format.width, format.height, FilterType::Triangle)
    } else {
        img
    };

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, format.quality)
        .encode_image(&img.to_rgb8())
        .context("Failed to encode photo")?;
    Ok(output)
}
