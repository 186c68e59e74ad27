//! Header checks that run before any pixel data is decoded.
//!
//! Decoding keeps only the first frame of an animation, so animated WebP
//! and APNG sources must be recognized up front and left alone.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::webp::WebPDecoder;

use crate::asset::AssetFormat;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// PNG header chunks (everything before the first `IDAT`).
pub fn png_info(path: &Path) -> Result<png::Info<'static>> {
    let reader = png::Decoder::new(open(path)?)
        .read_info()
        .with_context(|| format!("failed to read png header of {}", path.display()))?;
    Ok(reader.info().clone())
}

/// Whether the asset holds more than a still image (APNG `acTL`, WebP `ANIM`).
pub fn is_animated(path: &Path, format: AssetFormat) -> Result<bool> {
    match format {
        AssetFormat::Png => Ok(png_info(path)?.animation_control.is_some()),
        AssetFormat::Webp => {
            let decoder = WebPDecoder::new(open(path)?)
                .with_context(|| format!("failed to read webp header of {}", path.display()))?;
            Ok(decoder.has_animation())
        }
        AssetFormat::Jpeg | AssetFormat::Pdf => Ok(false),
    }
}

/// Animated WebP built chunk by chunk: `frames` lossless 4x4 frames.
#[cfg(test)]
pub(crate) fn animated_webp(frames: usize) -> Vec<u8> {
    use image::codecs::webp::WebPEncoder;
    use image::{ExtendedColorType, Rgba, RgbaImage};

    fn chunk(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = fourcc.to_vec();
        out.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn u24(value: u32) -> [u8; 3] {
        let [a, b, c, _] = value.to_le_bytes();
        [a, b, c]
    }

    let mut body = b"WEBP".to_vec();

    let mut vp8x = vec![0x02 | 0x10, 0, 0, 0];
    vp8x.extend_from_slice(&u24(3));
    vp8x.extend_from_slice(&u24(3));
    body.extend(chunk(b"VP8X", &vp8x));
    body.extend(chunk(b"ANIM", &[0, 0, 0, 0, 0, 0]));

    for n in 0..frames {
        let shade = u8::try_from(n * 30 % 256).unwrap();
        let frame = RgbaImage::from_pixel(4, 4, Rgba([shade, 80, 160, 255]));
        let mut still = Vec::new();
        WebPEncoder::new_lossless(&mut still)
            .encode(frame.as_raw(), 4, 4, ExtendedColorType::Rgba8)
            .unwrap();
        assert_eq!(&still[12..16], b"VP8L");
        let len = u32::from_le_bytes(still[16..20].try_into().unwrap()) as usize;

        let mut anmf = Vec::new();
        anmf.extend_from_slice(&u24(0));
        anmf.extend_from_slice(&u24(0));
        anmf.extend_from_slice(&u24(3));
        anmf.extend_from_slice(&u24(3));
        anmf.extend_from_slice(&u24(100));
        anmf.push(0);
        anmf.extend(chunk(b"VP8L", &still[20..20 + len]));
        body.extend(chunk(b"ANMF", &anmf));
    }

    let mut riff = b"RIFF".to_vec();
    riff.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
    riff.extend(body);
    riff
}

/// Two-frame APNG, 4x4 RGBA.
#[cfg(test)]
pub(crate) fn animated_png() -> Vec<u8> {
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, 4, 4);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_animated(2, 0).unwrap();
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[200; 4 * 4 * 4]).unwrap();
    writer.write_image_data(&[40; 4 * 4 * 4]).unwrap();
    writer.finish().unwrap();
    out
}
