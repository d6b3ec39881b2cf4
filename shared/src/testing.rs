//! Fixtures for exercising `/predict` handlers in tests.

use std::io::Cursor;

use actix_web::http::header;
use actix_web::test::TestRequest;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub const BOUNDARY: &str = "----veredicto-test-boundary";

/// A single-pixel PNG.
pub fn png_1x1() -> Vec<u8> {
    png_filled(1, 1, [200, 30, 30])
}

pub fn png_filled(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png fixture");
    buf
}

/// Raw `multipart/form-data` body holding one file field.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> actix_http::Request {
    TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(field, filename, content_type, bytes))
        .to_request()
}
