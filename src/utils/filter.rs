//! Small linear filters used by the variant generator.

use image::GrayImage;

/// 3x3 sharpening kernel: centre 9, neighbours -1
pub const SHARPEN_KERNEL: [i32; 9] = [-1, -1, -1, -1, 9, -1, -1, -1, -1];

/// Normalised 1D Gaussian kernel with `size` taps
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let size = size.max(1) as i32;
    let half = (size - 1) as f32 / 2.0;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

#[inline]
fn replicate(i: i64, len: u32) -> usize {
    i.clamp(0, len as i64 - 1) as usize
}

/// `gfedcb|abcdefgh|gfedcba`
#[inline]
fn reflect101(i: i64, len: u32) -> usize {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * (len - 1) - i;
        }
    }
    i as usize
}

/// Separable Gaussian blur with replicated borders, rounded back to 8 bits
pub fn gaussian_blur(gray: &GrayImage, size: u32, sigma: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let kernel = gaussian_kernel(size, sigma);
    let half = (kernel.len() / 2) as i64;
    let src = gray.as_raw();
    let w = width as usize;

    // Horizontal pass
    let mut tmp = vec![0f32; src.len()];
    for y in 0..height as usize {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = replicate(x as i64 + k as i64 - half, width);
                acc += weight * row[sx] as f32;
            }
            tmp[y * w + x] = acc;
        }
    }

    // Vertical pass
    let mut out = vec![0u8; src.len()];
    for y in 0..height as usize {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = replicate(y as i64 + k as i64 - half, height);
                acc += weight * tmp[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| gray.clone())
}

/// Apply a 3x3 integer kernel with reflect-101 borders and saturating output
pub fn convolve_3x3(gray: &GrayImage, kernel: &[i32; 9]) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0i32;
            for ky in 0..3i64 {
                let sy = reflect101(y as i64 + ky - 1, height) as u32;
                for kx in 0..3i64 {
                    let sx = reflect101(x as i64 + kx - 1, width) as u32;
                    acc += kernel[(ky * 3 + kx) as usize] * gray.get_pixel(sx, sy)[0] as i32;
                }
            }
            out.put_pixel(x, y, image::Luma([acc.clamp(0, 255) as u8]));
        }
    }
    out
}

/// Unsharp-style 3x3 sharpening
pub fn sharpen(gray: &GrayImage) -> GrayImage {
    convolve_3x3(gray, &SHARPEN_KERNEL)
}
