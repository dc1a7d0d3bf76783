//! Replay a toast script and print every snapshot the queue emits.

use std::path::PathBuf;
use std::rc::Rc;

use lumina_common::clock::SessionClock;
use lumina_common::config::AppConfig;
use lumina_toast::script::{ReplayReport, ToastScript};
use lumina_toast::{DeadlineScheduler, ManualScheduler, Toast, ToastQueue};

pub async fn run(
    config: &AppConfig,
    script_path: PathBuf,
    realtime: bool,
    json: bool,
) -> anyhow::Result<()> {
    println!("Loading script: {}", script_path.display());
    let script = ToastScript::load(&script_path)
        .map_err(|e| anyhow::anyhow!("Failed to load script: {e}"))?;
    println!(
        "  {} steps, capacity {}, default duration {} ms",
        script.steps.len(),
        config.toasts.capacity,
        config.toasts.default_duration_ms
    );
    println!();

    let report = if realtime {
        replay_realtime(config, &script, json).await
    } else {
        replay_virtual(config, &script, json)
    };

    println!();
    println!("Replay finished:");
    println!("  published:  {}", report.published);
    println!("  dismissals: {}", report.dismissals);
    println!("  waited:     {} ms", report.waited_ms);
    println!("  remaining:  {}", report.remaining.len());
    for toast in &report.remaining {
        println!("    {}", describe(toast));
    }

    Ok(())
}

fn replay_virtual(config: &AppConfig, script: &ToastScript, json: bool) -> ReplayReport {
    let scheduler = ManualScheduler::new();
    let queue = ToastQueue::with_settings(Rc::new(scheduler.clone()), config.toasts.clone());

    let clock = scheduler.clone();
    let _subscription = queue.subscribe(move |toasts| print_snapshot(clock.now_ms(), toasts, json));

    script.replay_virtual(&queue, &scheduler)
}

async fn replay_realtime(config: &AppConfig, script: &ToastScript, json: bool) -> ReplayReport {
    let timers = DeadlineScheduler::thread_default();
    ToastQueue::install_global(ToastQueue::with_settings(
        Rc::new(timers.clone()),
        config.toasts.clone(),
    ));

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let driver = tokio::task::spawn_local(timers.run());
            let queue = ToastQueue::global();
            let clock = SessionClock::start();
            tracing::debug!(started = clock.epoch_wall(), "realtime replay");
            let _subscription =
                queue.subscribe(move |toasts| print_snapshot(clock.elapsed_ms(), toasts, json));
            let report = script.replay_realtime(&queue).await;
            driver.abort();
            report
        })
        .await
}

fn print_snapshot(at_ms: u64, toasts: &[Toast], json: bool) {
    if json {
        let line = serde_json::json!({ "at_ms": at_ms, "toasts": toasts });
        println!("{line}");
        return;
    }
    println!("[{at_ms:>7} ms] {} visible", toasts.len());
    for toast in toasts {
        println!("    {}", describe(toast));
    }
}

fn describe(toast: &Toast) -> String {
    let lifetime = if toast.is_sticky() {
        "sticky".to_string()
    } else {
        format!("{} ms", toast.duration_ms)
    };
    match &toast.description {
        Some(description) => format!(
            "{} {:<7} {} ({}) [{}]",
            toast.id, toast.severity, toast.title, description, lifetime
        ),
        None => format!(
            "{} {:<7} {} [{}]",
            toast.id, toast.severity, toast.title, lifetime
        ),
    }
}
