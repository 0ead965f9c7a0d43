mod joints;
pub use joints::*;
mod platform;
pub use platform::*;
mod camera;
pub use camera::*;
mod kinematics;
pub use kinematics::*;

use sophus::nalgebra::Vector3;

pub type Real = f64;
pub type PointCoordinates = Vector3<Real>;

/// Every finger is a chain of upper, middle and lower joint.
pub const JOINTS_PER_FINGER: usize = 3;
