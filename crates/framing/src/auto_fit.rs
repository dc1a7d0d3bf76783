//! One-shot camera auto-fit.
//!
//! # Algorithm
//!
//! 1. **Gate:** skip when the session latch is set or a saved/user camera
//!    pose overrides framing.
//! 2. **Propagate:** force a full world-matrix pass so bounds reflect the
//!    current transforms.
//! 3. **Bounds:** union the world boxes of mesh nodes tagged selectable.
//! 4. **Require** at least `min_meshes` such meshes and a non-empty box.
//! 5. **Sphere:** center = box center, radius = half diagonal; reject
//!    radii below `min_radius`.
//! 6. **Distance:** `radius / tan(fov / 2) * padding`.
//! 7. **Direction:** `elevation_deg` above the horizontal plane and
//!    `azimuth_deg` around +Y from the +Z viewing axis.
//! 8. **Apply:** move the camera, look at the center, retarget the orbit
//!    controls and let them recompute.
//! 9. **Latch** so the fit never runs again this session.
//!
//! Steps 4 and 5 defer to the next frame instead of failing.

use lumina_common::AutoFitSettings;
use lumina_scene_model::{
    Aabb, BoundingSphere, CameraOverride, CameraPose, DVec3, OrbitControls, PerspectiveCamera,
    SceneGraph,
};

/// Auto-fit constants. Defaults are the product values.
pub type AutoFitConfig = AutoFitSettings;

/// One-shot latch: false until the first successful fit, then true for the
/// rest of the session. There is no way to reset it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitLatch {
    fitted: bool,
}

impl FitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn mark(&mut self) {
        self.fitted = true;
    }
}

/// Why a frame did not fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferReason {
    /// Fewer selectable meshes than required; the model may still be
    /// streaming in.
    InsufficientGeometry { meshes: usize },
    /// Enough meshes, but none contributed any bounds.
    EmptyBounds,
    /// Point-like geometry.
    DegenerateBounds { radius: f64 },
    /// The camera's field of view cannot frame anything.
    InvalidFieldOfView { fov_deg: f64 },
}

/// Pose computed by a successful fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub pose: CameraPose,
    pub sphere: BoundingSphere,
    pub distance: f64,
    pub meshes: usize,
}

/// Result of one per-frame evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    AlreadyFitted,
    Overridden,
    Deferred(DeferReason),
    Fitted(FitResult),
}

impl FitOutcome {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitOutcome::Fitted(_))
    }
}

/// The auto-fit evaluator.
#[derive(Debug, Clone)]
pub struct AutoFit {
    config: AutoFitConfig,
}

impl AutoFit {
    pub fn new(config: AutoFitConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AutoFitConfig::default())
    }

    pub fn config(&self) -> &AutoFitConfig {
        &self.config
    }

    /// Evaluate one frame. Mutates the camera and controls only when the
    /// outcome is [`FitOutcome::Fitted`].
    pub fn evaluate(
        &self,
        scene: &mut SceneGraph,
        camera: &mut PerspectiveCamera,
        controls: Option<&mut OrbitControls>,
        latch: &mut FitLatch,
        camera_override: &dyn CameraOverride,
    ) -> FitOutcome {
        if latch.is_fitted() {
            return FitOutcome::AlreadyFitted;
        }
        if camera_override.has_override() {
            return FitOutcome::Overridden;
        }

        scene.update_world_matrices();
        let result = match self.plan(scene, camera.fov_deg) {
            Ok(result) => result,
            Err(reason) => {
                tracing::debug!(?reason, "auto-fit deferred");
                return FitOutcome::Deferred(reason);
            }
        };

        camera.apply_pose(&result.pose);
        if let Some(controls) = controls {
            controls.set_target(result.pose.target);
            controls.update(camera);
        }
        latch.mark();

        tracing::info!(
            meshes = result.meshes,
            radius = result.sphere.radius,
            distance = result.distance,
            "camera auto-fit applied"
        );
        FitOutcome::Fitted(result)
    }

    /// Compute the fit for the scene's current cached world matrices without
    /// touching the camera.
    pub fn plan(&self, scene: &SceneGraph, fov_deg: f64) -> Result<FitResult, DeferReason> {
        let (meshes, bounds) = selectable_bounds(scene);
        if meshes < self.config.min_meshes {
            return Err(DeferReason::InsufficientGeometry { meshes });
        }
        let sphere = BoundingSphere::from_aabb(&bounds).ok_or(DeferReason::EmptyBounds)?;
        if sphere.radius.is_nan() || sphere.radius < self.config.min_radius {
            return Err(DeferReason::DegenerateBounds {
                radius: sphere.radius,
            });
        }
        if fov_deg.is_nan() || fov_deg <= 0.0 || fov_deg >= 180.0 {
            return Err(DeferReason::InvalidFieldOfView { fov_deg });
        }

        let distance = self.fit_distance(sphere.radius, fov_deg.to_radians());
        let position = sphere.center + self.view_direction() * distance;
        Ok(FitResult {
            pose: CameraPose {
                position,
                target: sphere.center,
            },
            sphere,
            distance,
            meshes,
        })
    }

    /// Camera distance from the sphere center for a vertical field of view.
    pub fn fit_distance(&self, radius: f64, fov_rad: f64) -> f64 {
        (radius / (fov_rad / 2.0).tan()) * self.config.padding
    }

    /// Unit offset from the target toward the camera.
    pub fn view_direction(&self) -> DVec3 {
        let elevation = self.config.elevation_deg.to_radians();
        let azimuth = self.config.azimuth_deg.to_radians();
        DVec3::new(
            elevation.cos() * azimuth.sin(),
            elevation.sin(),
            elevation.cos() * azimuth.cos(),
        )
    }
}

impl Default for AutoFit {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Count selectable meshes and union their world-space bounds, using each
/// node's cached world matrix.
pub fn selectable_bounds(scene: &SceneGraph) -> (usize, Aabb) {
    let mut count = 0;
    let mut bounds = Aabb::EMPTY;
    scene.traverse(|_, node| {
        if !node.selectable {
            return;
        }
        if let Some(world) = node.world_bounds() {
            count += 1;
            bounds.union(&world);
        }
    });
    (count, bounds)
}

#[cfg(test)]
mod tests {
    use lumina_scene_model::{NodeKind, SceneNode, Transform};

    use super::*;

    fn cube(center: DVec3, half: f64) -> Aabb {
        Aabb::from_center_half_extent(center, DVec3::splat(half))
    }

    fn model_scene(parts: &[(DVec3, f64)]) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.insert(None, SceneNode::new("rig", NodeKind::Camera)).unwrap();
        scene
            .insert(None, SceneNode::mesh("grid", cube(DVec3::ZERO, 50.0)))
            .unwrap();
        let model = scene.insert(None, SceneNode::group("model")).unwrap();
        for (i, (center, half)) in parts.iter().enumerate() {
            scene
                .insert(
                    Some(model),
                    SceneNode::mesh(format!("part-{i}"), cube(*center, *half)).selectable(),
                )
                .unwrap();
        }
        scene
    }

    #[test]
    fn test_view_direction_is_unit_with_expected_angles() {
        let dir = AutoFit::with_defaults().view_direction();
        assert!((dir.length() - 1.0).abs() < 1e-12);
        assert!((dir.y.asin().to_degrees() - 20.0).abs() < 1e-9);
        assert!((dir.x.atan2(dir.z).to_degrees() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_distance_formula() {
        let fit = AutoFit::with_defaults();
        let fov = 50f64.to_radians();
        let expected = (2.0 / (fov / 2.0).tan()) * 1.8;
        assert!((fit.fit_distance(2.0, fov) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unselectable_nodes_are_ignored() {
        let scene = model_scene(&[(DVec3::ZERO, 1.0), (DVec3::new(2.0, 0.0, 0.0), 1.0)]);
        let (count, bounds) = selectable_bounds(&scene);
        assert_eq!(count, 2);
        assert_eq!(bounds, Aabb::new(DVec3::splat(-1.0), DVec3::new(3.0, 1.0, 1.0)));
    }

    #[test]
    fn test_single_mesh_defers() {
        let mut scene = model_scene(&[(DVec3::ZERO, 1.0)]);
        let mut camera = PerspectiveCamera::default();
        let mut latch = FitLatch::new();

        let outcome =
            AutoFit::with_defaults().evaluate(&mut scene, &mut camera, None, &mut latch, &false);
        assert_eq!(
            outcome,
            FitOutcome::Deferred(DeferReason::InsufficientGeometry { meshes: 1 })
        );
        assert!(!latch.is_fitted());
        assert_eq!(camera, PerspectiveCamera::default());
    }

    #[test]
    fn test_point_like_geometry_defers_without_latching() {
        let mut scene = model_scene(&[(DVec3::ONE, 0.0), (DVec3::ONE, 0.0)]);
        let mut camera = PerspectiveCamera::default();
        let mut latch = FitLatch::new();

        let outcome =
            AutoFit::with_defaults().evaluate(&mut scene, &mut camera, None, &mut latch, &false);
        assert!(matches!(
            outcome,
            FitOutcome::Deferred(DeferReason::DegenerateBounds { .. })
        ));
        assert!(!latch.is_fitted());
    }

    #[test]
    fn test_empty_mesh_bounds_defer() {
        let mut scene = SceneGraph::new();
        for name in ["a", "b"] {
            scene
                .insert(None, SceneNode::mesh(name, Aabb::EMPTY).selectable())
                .unwrap();
        }
        let plan = AutoFit::with_defaults().plan(&scene, 50.0);
        assert_eq!(plan, Err(DeferReason::EmptyBounds));
    }

    #[test]
    fn test_unusable_field_of_view_defers() {
        let scene = model_scene(&[(DVec3::ZERO, 1.0), (DVec3::ONE, 1.0)]);
        let fit = AutoFit::with_defaults();
        for fov_deg in [0.0, -30.0, 180.0, f64::NAN] {
            assert!(matches!(
                fit.plan(&scene, fov_deg),
                Err(DeferReason::InvalidFieldOfView { .. })
            ));
        }
        assert!(fit.plan(&scene, 179.0).is_ok());
    }

    #[test]
    fn test_override_blocks_fit() {
        let mut scene = model_scene(&[(DVec3::ZERO, 1.0), (DVec3::ONE, 1.0)]);
        let mut camera = PerspectiveCamera::default();
        let mut latch = FitLatch::new();

        let outcome =
            AutoFit::with_defaults().evaluate(&mut scene, &mut camera, None, &mut latch, &true);
        assert_eq!(outcome, FitOutcome::Overridden);
        assert_eq!(camera, PerspectiveCamera::default());
    }

    #[test]
    fn test_fit_updates_controls_target() {
        let mut scene = model_scene(&[
            (DVec3::new(4.0, 0.0, 0.0), 1.0),
            (DVec3::new(6.0, 0.0, 0.0), 1.0),
        ]);
        let mut camera = PerspectiveCamera::default();
        let mut controls = OrbitControls::new(&camera);
        let mut latch = FitLatch::new();

        let outcome = AutoFit::with_defaults().evaluate(
            &mut scene,
            &mut camera,
            Some(&mut controls),
            &mut latch,
            &false,
        );
        let FitOutcome::Fitted(result) = outcome else {
            panic!("expected a fit, got {outcome:?}");
        };
        assert_eq!(controls.target, DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(camera.target(), DVec3::new(5.0, 0.0, 0.0));
        assert!((controls.radius() - result.distance).abs() < 1e-9);
        assert!(latch.is_fitted());
    }

    #[test]
    fn test_stale_world_matrices_are_refreshed_before_bounds() {
        let mut scene = model_scene(&[(DVec3::ZERO, 1.0), (DVec3::ZERO, 1.0)]);
        let model = scene.find("model").unwrap();
        scene.set_transform(model, Transform::from_position(DVec3::new(0.0, 0.0, -20.0)));

        let mut camera = PerspectiveCamera::default();
        let mut latch = FitLatch::new();
        let outcome =
            AutoFit::with_defaults().evaluate(&mut scene, &mut camera, None, &mut latch, &false);

        assert!(outcome.is_fitted());
        assert_eq!(camera.target(), DVec3::new(0.0, 0.0, -20.0));
    }

    #[test]
    fn test_invalid_fov_defers() {
        let scene = model_scene(&[(DVec3::ZERO, 1.0), (DVec3::ONE, 1.0)]);
        let plan = AutoFit::with_defaults().plan(&scene, 0.0);
        assert_eq!(
            plan,
            Err(DeferReason::InvalidFieldOfView { fov_deg: 0.0 })
        );
    }
}
