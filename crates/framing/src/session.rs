//! Viewer session: the per-frame driver around the auto-fit.
//!
//! A session owns the scene, the camera rig, and the fit latch for one
//! opened model. The host render loop calls [`ViewerSession::tick`] once
//! per rendered frame.

use lumina_scene_model::{OrbitControls, PerspectiveCamera, SavedCameraState, SceneGraph};

use crate::auto_fit::{AutoFit, FitLatch, FitOutcome};

#[derive(Debug)]
pub struct ViewerSession {
    pub scene: SceneGraph,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    saved_camera: Option<SavedCameraState>,
    latch: FitLatch,
    auto_fit: AutoFit,
    frames: u64,
}

impl ViewerSession {
    /// Open a session. When a saved camera state is supplied it is restored
    /// immediately and auto-fit stays disabled for the session.
    pub fn open(
        scene: SceneGraph,
        camera: PerspectiveCamera,
        saved_camera: Option<SavedCameraState>,
        auto_fit: AutoFit,
    ) -> Self {
        let mut camera = camera;
        let mut controls = OrbitControls::new(&camera);
        if let Some(saved) = &saved_camera {
            saved.restore(&mut camera, Some(&mut controls));
            tracing::debug!("restored saved camera state; auto-fit disabled");
        }
        Self {
            scene,
            camera,
            controls,
            saved_camera,
            latch: FitLatch::new(),
            auto_fit,
            frames: 0,
        }
    }

    /// Run one frame's worth of auto-fit work.
    pub fn tick(&mut self) -> FitOutcome {
        self.frames += 1;
        self.auto_fit.evaluate(
            &mut self.scene,
            &mut self.camera,
            Some(&mut self.controls),
            &mut self.latch,
            &self.saved_camera,
        )
    }

    pub fn is_fitted(&self) -> bool {
        self.latch.is_fitted()
    }

    pub fn has_saved_camera(&self) -> bool {
        self.saved_camera.is_some()
    }

    /// Frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Capture the current camera for persistence.
    pub fn save_camera(&self) -> SavedCameraState {
        SavedCameraState::capture(&self.camera)
    }
}
