use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use super::artifacts::{ProcessorConfig, SizeConfig};

/// Turns a decoded RGB image into the `1x3xHxW` float tensor the classifier
/// expects.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: ProcessorConfig,
    filter: FilterType,
    /// `(height, width)` of every tensor this processor produces.
    output: (u32, u32),
}

impl ImageProcessor {
    pub fn new(config: ProcessorConfig) -> Result<Self, String> {
        config.validate()?;
        let output = match (config.do_center_crop, config.crop_size, config.do_resize) {
            (true, Some(crop), _) => square_or_exact(crop),
            (_, _, true) => square_or_exact(config.size),
            _ => return Err("a fixed input size needs do_resize or a center crop".into()),
        };
        Ok(Self {
            filter: filter_for(config.resample),
            config,
            output,
        })
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output
    }

    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let (height, width) = self.output;
        let mut pixels = self.resize(image);
        if self.config.do_center_crop {
            pixels = center_crop(&pixels, width, height);
        }
        if pixels.dimensions() != (width, height) {
            pixels = imageops::resize(&pixels, width, height, self.filter);
        }

        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        for (x, y, pixel) in pixels.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = self.normalize(c, pixel[c]);
            }
        }
        tensor
    }

    fn resize(&self, image: &RgbImage) -> RgbImage {
        if !self.config.do_resize {
            return image.clone();
        }
        match self.config.size {
            SizeConfig::Exact { height, width } => imageops::resize(image, width, height, self.filter),
            SizeConfig::Square(edge) => imageops::resize(image, edge, edge, self.filter),
            SizeConfig::ShortestEdge { shortest_edge } if self.config.do_center_crop => {
                let (w, h) = image.dimensions();
                let scale = shortest_edge as f32 / w.min(h).max(1) as f32;
                let new_w = ((w as f32 * scale).round() as u32).max(1);
                let new_h = ((h as f32 * scale).round() as u32).max(1);
                imageops::resize(image, new_w, new_h, self.filter)
            }
            // Without a crop the tensor must still be fixed-size, so warp to a square.
            SizeConfig::ShortestEdge { shortest_edge } => {
                imageops::resize(image, shortest_edge, shortest_edge, self.filter)
            }
        }
    }

    fn normalize(&self, channel: usize, value: u8) -> f32 {
        let mut v = value as f32;
        if self.config.do_rescale {
            v *= self.config.rescale_factor;
        }
        if self.config.do_normalize {
            v = (v - self.config.image_mean[channel]) / self.config.image_std[channel];
        }
        v
    }
}

fn square_or_exact(size: SizeConfig) -> (u32, u32) {
    match size {
        SizeConfig::Exact { height, width } => (height, width),
        SizeConfig::ShortestEdge { shortest_edge: edge } | SizeConfig::Square(edge) => (edge, edge),
    }
}

fn center_crop(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let x = w.saturating_sub(width) / 2;
    let y = h.saturating_sub(height) / 2;
    imageops::crop_imm(image, x, y, width.min(w), height.min(h)).to_image()
}

fn filter_for(resample: u8) -> FilterType {
    match resample {
        0 => FilterType::Nearest,
        1 => FilterType::Lanczos3,
        3 => FilterType::CatmullRom,
        _ => FilterType::Triangle,
    }
}
