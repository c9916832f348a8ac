//! Binary skin masks and 3x3 morphology.

use crate::frame::FrameView;
use alloc::vec;
use alloc::vec::Vec;
use piano_shared::HsvRange;

/// Binary image, row-major, `true` marks foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Threshold a frame against an HSV range
    pub fn from_frame(frame: &FrameView<'_>, range: &HsvRange) -> Self {
        let (width, height) = (frame.width(), frame.height());
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(range.contains(frame.hsv(x, y)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Out-of-bounds coordinates read as background
    pub fn get(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = value;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&p| p).count()
    }

    pub fn dilate(&self, iterations: usize) -> Self {
        let mut mask = self.clone();
        for _ in 0..iterations {
            mask = mask.apply_kernel(true);
        }
        mask
    }

    pub fn erode(&self, iterations: usize) -> Self {
        let mut mask = self.clone();
        for _ in 0..iterations {
            mask = mask.apply_kernel(false);
        }
        mask
    }

    /// Dilate then erode, closing small gaps in the hand silhouette
    pub fn close(&self, iterations: usize) -> Self {
        self.dilate(iterations).erode(iterations)
    }

    /// One 3x3 pass. Dilation sets a pixel when any in-frame neighbour is set,
    /// erosion clears it when any in-frame neighbour is clear.
    fn apply_kernel(&self, dilate: bool) -> Self {
        let mut out = Self::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut value = !dilate;
                'kernel: for ky in y.saturating_sub(1)..=(y + 1).min(self.height - 1) {
                    for kx in x.saturating_sub(1)..=(x + 1).min(self.width - 1) {
                        let p = self.data[ky * self.width + kx];
                        if p == dilate {
                            value = dilate;
                            break 'kernel;
                        }
                    }
                }
                out.data[y * self.width + x] = value;
            }
        }
        out
    }
}
