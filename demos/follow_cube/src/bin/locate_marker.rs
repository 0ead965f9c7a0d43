use std::sync::Arc;

use anyhow::Context;
use opencv::{imgcodecs, prelude::*};

use finger_core::GrayImage;
use finger_sensor::{aruco::ArucoMarkerDetector, CalibrationFrame, MarkerCfg, MarkerPoseEstimator};

/// Usage: locate_marker <calibration.yml> <image> [marker id]
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let calibration_path = args.next().context("missing calibration file")?;
    let image_path = args.next().context("missing image")?;
    let marker = MarkerCfg {
        marker_id: match args.next() {
            Some(id) => id.parse().context("marker id")?,
            None => MarkerCfg::default().marker_id,
        },
        ..MarkerCfg::default()
    };

    let calibration = Arc::new(CalibrationFrame::load(&calibration_path)?);
    let mat = imgcodecs::imread(&image_path, imgcodecs::IMREAD_GRAYSCALE)?;
    anyhow::ensure!(!mat.empty(), "cannot read image {image_path}");
    let image = GrayImage::new(mat.cols() as usize, mat.rows() as usize, mat.data_bytes()?.to_vec());

    let marker_id = marker.marker_id;
    let detector = ArucoMarkerDetector::new(&marker)?;
    let estimator = MarkerPoseEstimator::new(0, calibration, detector, marker);
    match estimator.estimate(&image)?.position {
        Some(position) => println!(
            "marker at [{:.4}, {:.4}, {:.4}] in {}",
            position.x,
            position.y,
            position.z,
            estimator.calibration().name
        ),
        None => println!("marker {} not found in {image_path}", marker_id),
    }
    Ok(())
}
