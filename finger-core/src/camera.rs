use anyhow::Result;

/// One synchronized set of images, one entry per camera.
#[derive(Clone, Debug)]
pub struct CameraObservation<I> {
    // acquisition time of the set, in seconds of the source clock
    pub timestamp: f64,
    pub images: Vec<I>,
}

/// Source of camera images, e.g. a multi-camera driver.
pub trait CameraSource {
    type Image;

    fn number_of_cameras(&self) -> usize;

    /// Most recent image set. Never waits for a new capture, so consecutive
    /// calls may return the same set.
    fn latest_observation(&mut self) -> Result<CameraObservation<Self::Image>>;
}

/// 8-bit single channel image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.height
    }

    pub fn cols(&self) -> usize {
        self.width
    }
}
