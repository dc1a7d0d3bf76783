//! Perspective camera, orbit controls, and saved camera state.

use std::path::Path;

use glam::DVec3;
use lumina_common::{LuminaError, LuminaResult};
use serde::{Deserialize, Serialize};

/// Camera position plus the point it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: DVec3,
    pub target: DVec3,
}

/// A perspective camera with a vertical field of view.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view (degrees).
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    pub position: DVec3,
    /// Point the camera is oriented toward.
    target: DVec3,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f64, aspect: f64) -> Self {
        Self {
            fov_deg,
            aspect,
            ..Self::default()
        }
    }

    /// Vertical field of view in radians.
    pub fn fov_radians(&self) -> f64 {
        self.fov_deg.to_radians()
    }

    /// Orient the camera toward `target`.
    pub fn look_at(&mut self, target: DVec3) {
        self.target = target;
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }

    /// Unit viewing direction.
    pub fn forward(&self) -> DVec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            target: self.target,
        }
    }

    pub fn apply_pose(&mut self, pose: &CameraPose) {
        self.position = pose.position;
        self.look_at(pose.target);
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_deg: 50.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 2000.0,
            position: DVec3::new(0.0, 0.0, 5.0),
            target: DVec3::ZERO,
        }
    }
}

/// Orbit controls pivoting the camera around a target point.
///
/// The spherical state (`radius`, `azimuth`, `polar`) is derived from the
/// camera position relative to the target and must be recomputed with
/// [`OrbitControls::update`] after the camera is moved externally.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: DVec3,
    pub enabled: bool,
    radius: f64,
    /// Angle around +Y measured from +Z toward +X (radians).
    azimuth: f64,
    /// Angle from +Y (radians).
    polar: f64,
}

impl OrbitControls {
    /// Controls attached to `camera`, pivoting around the camera's target.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let mut controls = Self {
            target: camera.target(),
            enabled: true,
            radius: 0.0,
            azimuth: 0.0,
            polar: 0.0,
        };
        controls.update(camera);
        controls
    }

    pub fn set_target(&mut self, target: DVec3) {
        self.target = target;
    }

    /// Recompute the spherical state from the camera's current position.
    pub fn update(&mut self, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        self.radius = offset.length();
        if self.radius > 0.0 {
            self.azimuth = offset.x.atan2(offset.z);
            self.polar = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
        } else {
            self.azimuth = 0.0;
            self.polar = 0.0;
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn polar(&self) -> f64 {
        self.polar
    }

    /// Rotate the camera around the target by the given angle deltas
    /// (user drag), keeping the radius.
    pub fn rotate(&mut self, camera: &mut PerspectiveCamera, d_azimuth: f64, d_polar: f64) {
        if !self.enabled {
            return;
        }
        self.azimuth += d_azimuth;
        self.polar = (self.polar + d_polar).clamp(1e-6, std::f64::consts::PI - 1e-6);
        let (sp, cp) = self.polar.sin_cos();
        let (sa, ca) = self.azimuth.sin_cos();
        camera.position = self.target + DVec3::new(sp * sa, cp, sp * ca) * self.radius;
        camera.look_at(self.target);
    }
}

/// Answers whether a saved or user-chosen camera pose must win over
/// automatic framing.
pub trait CameraOverride {
    fn has_override(&self) -> bool;
}

impl CameraOverride for bool {
    fn has_override(&self) -> bool {
        *self
    }
}

impl<T> CameraOverride for Option<T> {
    fn has_override(&self) -> bool {
        self.is_some()
    }
}

/// Persisted camera state (`camera.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCameraState {
    pub pose: CameraPose,
    pub fov_deg: f64,
    /// Save timestamp (RFC 3339).
    pub saved_at: String,
}

impl SavedCameraState {
    pub fn capture(camera: &PerspectiveCamera) -> Self {
        Self {
            pose: camera.pose(),
            fov_deg: camera.fov_deg,
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Restore this state onto a camera and its controls.
    pub fn restore(&self, camera: &mut PerspectiveCamera, controls: Option<&mut OrbitControls>) {
        camera.fov_deg = self.fov_deg;
        camera.apply_pose(&self.pose);
        if let Some(controls) = controls {
            controls.set_target(self.pose.target);
            controls.update(camera);
        }
    }

    pub fn load(path: &Path) -> LuminaResult<Self> {
        let content = LuminaError::read_file(path)?;
        let state: Self =
            serde_json::from_str(&content).map_err(|source| LuminaError::ParseAt {
                path: path.to_path_buf(),
                source,
            })?;
        if !(state.pose.position.is_finite() && state.pose.target.is_finite()) {
            return Err(LuminaError::camera_state(format!(
                "non-finite pose in {}",
                path.display()
            )));
        }
        Ok(state)
    }

    /// Load the saved state if the file exists; a missing file means
    /// "no override".
    pub fn load_optional(path: &Path) -> LuminaResult<Option<Self>> {
        match Self::load(path) {
            Ok(state) => Ok(Some(state)),
            Err(LuminaError::FileNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> LuminaResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LuminaError::IoAt {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| LuminaError::IoAt {
            path: path.to_path_buf(),
            source,
        })
    }
}
