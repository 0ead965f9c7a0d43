//! OpenCV backed fiducial detection.

use opencv::{
    calib3d,
    core::{Mat, Point2f, Point3f, Vector},
    objdetect::{self, ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters},
    prelude::*,
};
use sophus::nalgebra::Vector2;

use finger_core::{GrayImage, PointCoordinates};

use crate::{
    calibration::CalibrationFrame,
    error::{Result, SensorError},
    marker::{DetectedMarker, MarkerCfg, MarkerDetector},
};

pub struct ArucoMarkerDetector {
    detector: ArucoDetector,
}

impl ArucoMarkerDetector {
    pub fn new(cfg: &MarkerCfg) -> Result<Self> {
        let dictionary = objdetect::get_predefined_dictionary(dictionary_type(&cfg.dictionary)?)?;
        let detector = ArucoDetector::new(
            &dictionary,
            &DetectorParameters::default()?,
            RefineParameters::new(10.0, 3.0, true)?,
        )?;
        Ok(Self { detector })
    }
}

fn dictionary_type(name: &str) -> Result<PredefinedDictionaryType> {
    match name {
        "DICT_APRILTAG_16h5" => Ok(PredefinedDictionaryType::DICT_APRILTAG_16h5),
        "DICT_APRILTAG_36h11" => Ok(PredefinedDictionaryType::DICT_APRILTAG_36h11),
        "DICT_4X4_50" => Ok(PredefinedDictionaryType::DICT_4X4_50),
        "DICT_6X6_250" => Ok(PredefinedDictionaryType::DICT_6X6_250),
        _ => Err(SensorError::Detection(format!("unknown marker dictionary {name}"))),
    }
}

impl MarkerDetector for ArucoMarkerDetector {
    type Image = GrayImage;

    fn detect(&self, image: &GrayImage) -> Result<Vec<DetectedMarker>> {
        let flat = Mat::from_slice(&image.data)?;
        let intensity_image = flat.reshape(1, image.rows() as i32)?.try_clone()?;

        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        self.detector
            .detect_markers(&intensity_image, &mut corners, &mut ids, &mut rejected)?;

        let markers = ids
            .iter()
            .zip(corners.iter())
            .filter(|(_, corner_set)| corner_set.len() == 4)
            .map(|(id, corner_set)| {
                let mut corners = [Vector2::zeros(); 4];
                for (target, point) in corners.iter_mut().zip(corner_set.iter()) {
                    *target = Vector2::new(point.x as f64, point.y as f64);
                }
                DetectedMarker { id, corners }
            })
            .collect();
        Ok(markers)
    }

    fn estimate_translation(
        &self,
        marker: &DetectedMarker,
        marker_length: f64,
        calibration: &CalibrationFrame,
    ) -> Result<PointCoordinates> {
        let h = (marker_length / 2.0) as f32;
        let object_points: Vector<Point3f> = Vector::from_iter([
            Point3f::new(-h, h, 0.0),
            Point3f::new(h, h, 0.0),
            Point3f::new(h, -h, 0.0),
            Point3f::new(-h, -h, 0.0),
        ]);
        let image_points: Vector<Point2f> = marker
            .corners
            .iter()
            .map(|c| Point2f::new(c.x as f32, c.y as f32))
            .collect();

        let k = calibration.camera_matrix();
        let camera_matrix = Mat::from_slice_2d(&[
            [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
            [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
            [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
        ])?;
        let dist_coeffs = Mat::from_slice_2d(&[calibration.distortion_coeffs().as_slice()])?;

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let solved = calib3d::solve_pnp(
            &object_points,
            &image_points,
            &camera_matrix,
            &dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_IPPE_SQUARE,
        )?;
        if !solved {
            return Err(SensorError::Detection(format!(
                "no pose for marker {}",
                marker.id
            )));
        }

        Ok(PointCoordinates::new(
            *tvec.at::<f64>(0)?,
            *tvec.at::<f64>(1)?,
            *tvec.at::<f64>(2)?,
        ))
    }
}
