//! Simulate camera auto-fit over a scene file.

use std::path::PathBuf;

use lumina_common::clock::FrameTicker;
use lumina_common::config::AppConfig;
use lumina_framing::{AutoFit, FitOutcome, ViewerSession};
use lumina_scene_model::{PerspectiveCamera, SavedCameraState, SceneGraph};

pub fn run(
    config: &AppConfig,
    scene_path: PathBuf,
    frames: u64,
    fps: u32,
    fov: f64,
    saved_camera: Option<PathBuf>,
    save_camera: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Loading scene: {}", scene_path.display());
    let scene = SceneGraph::load(&scene_path)
        .map_err(|e| anyhow::anyhow!("Failed to load scene: {e}"))?;
    println!("  {} nodes", scene.len());

    let saved = match &saved_camera {
        Some(path) => SavedCameraState::load_optional(path)
            .map_err(|e| anyhow::anyhow!("Failed to load camera state: {e}"))?,
        None => None,
    };
    if saved.is_some() {
        println!("  Saved camera state found; auto-fit disabled");
    }

    let camera = PerspectiveCamera::new(fov, 16.0 / 9.0);
    let mut session = ViewerSession::open(
        scene,
        camera,
        saved,
        AutoFit::new(config.auto_fit.clone()),
    );

    let mut ticker = FrameTicker::new(fps);
    let mut last_line = String::new();
    for _ in 0..frames {
        let (frame, t_ms) = ticker.tick();
        let outcome = session.tick();
        let line = describe(&outcome);
        if line != last_line {
            println!("  frame {frame:>4} ({t_ms:>8.1} ms): {line}");
            last_line = line;
        }
    }

    let pose = session.camera.pose();
    println!();
    println!("Final camera after {} frames:", session.frames());
    println!(
        "  position: ({:.4}, {:.4}, {:.4})",
        pose.position.x, pose.position.y, pose.position.z
    );
    println!(
        "  target:   ({:.4}, {:.4}, {:.4})",
        pose.target.x, pose.target.y, pose.target.z
    );
    println!("  fitted:   {}", session.is_fitted());

    if let Some(path) = save_camera {
        session
            .save_camera()
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save camera state: {e}"))?;
        println!("  Camera state saved to: {}", path.display());
    }

    Ok(())
}

fn describe(outcome: &FitOutcome) -> String {
    match outcome {
        FitOutcome::AlreadyFitted => "already fitted".to_string(),
        FitOutcome::Overridden => "skipped (camera override)".to_string(),
        FitOutcome::Deferred(reason) => format!("deferred ({reason:?})"),
        FitOutcome::Fitted(result) => format!(
            "fitted {} meshes, radius {:.4}, distance {:.4}",
            result.meshes, result.sphere.radius, result.distance
        ),
    }
}
