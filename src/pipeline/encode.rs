//! Transport encoding: raw image bytes → base64 for the remote provider.
//!
//! Cloud Vision accepts the image inline as standard base64 inside the JSON
//! request body. The bytes are sent exactly as uploaded; re-encoding would
//! only add artefacts the OCR engine then has to read through.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

/// An image ready to embed in a JSON request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: &'static str,
}

/// Base64-encode an image, sniffing its MIME type from the magic bytes.
pub fn encode_image(bytes: &[u8]) -> EncodedImage {
    let mime_type = sniff_mime_type(bytes);
    let data = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime_type, data.len());
    EncodedImage { data, mime_type }
}

/// MIME type of an image buffer, or `application/octet-stream` when the
/// format is not recognised.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        Ok(ImageFormat::Tiff) => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// File extension tesseract should see for a buffer, so leptonica picks
/// the right decoder.
pub fn file_extension(bytes: &[u8]) -> &'static str {
    match sniff_mime_type(bytes) {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tif",
        _ => "img",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[test]
    fn encode_png_round_trips_through_base64() {
        let bytes = png_bytes();
        let encoded = encode_image(&bytes);
        assert_eq!(encoded.mime_type, "image/png");
        let decoded = STANDARD.decode(&encoded.data).expect("valid base64");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn unknown_bytes_are_octet_stream() {
        assert_eq!(sniff_mime_type(b"hello world"), "application/octet-stream");
        assert_eq!(file_extension(b""), "img");
    }

    #[test]
    fn jpeg_magic_is_recognised() {
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(sniff_mime_type(&jpeg_header), "image/jpeg");
        assert_eq!(file_extension(&jpeg_header), "jpg");
    }
}
