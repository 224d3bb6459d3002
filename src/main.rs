use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use rusty_hands::args::Args;
use rusty_hands::camera::ThreadedCamera;
use rusty_hands::config::{parse_hex, AppConfig, ModelConfig};
use rusty_hands::controls::{ControlLayout, DemoControls};
use rusty_hands::driver::{Driver, DriverState};
use rusty_hands::error::GestureError;
use rusty_hands::inference::HandGesturePipeline;
use rusty_hands::loader::ModelLoader;
use rusty_hands::logging::init_logging;
use rusty_hands::model_download::ensure_model_available;
use rusty_hands::output::{rgb, Scene, TextRenderer, WindowOutput};
use rusty_hands::overlay::OverlayStyle;
use rusty_hands::pipeline::{DummyPipeline, Pipeline};
use rusty_hands::scheduler::{IntervalScheduler, Scheduler};

type BoxedPipeline = Box<dyn Pipeline + Send>;

fn list_cameras() -> anyhow::Result<()> {
    let cameras = nokhwa::query(nokhwa::utils::ApiBackend::Auto).context("failed to query cameras")?;
    println!("{}", "Available Cameras:".bold());
    println!("{:<5} | {:<30} | {:<10}", "Index", "Name", "Misc");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!("{:<5} | {:<30} | {:?}", cam.index().to_string().cyan(), cam.human_name(), cam.misc());
    }
    Ok(())
}

/// Fetch any missing model files, then build the ONNX pipeline.
fn load_models(models: &ModelConfig) -> anyhow::Result<BoxedPipeline> {
    for (path, url) in [
        (&models.palm_detection_path, &models.palm_detection_url),
        (&models.hand_landmark_path, &models.hand_landmark_url),
        (&models.gesture_classifier_path, &models.gesture_classifier_url),
    ] {
        ensure_model_available(Path::new(path), url)?;
    }
    Ok(Box::new(HandGesturePipeline::new(models)?))
}

fn model_loader(models: ModelConfig, simulate: bool) -> ModelLoader<BoxedPipeline> {
    if simulate {
        let pipeline: BoxedPipeline = Box::new(DummyPipeline::new());
        return ModelLoader::ready(pipeline);
    }
    ModelLoader::new(move || load_models(&models).map_err(|e| GestureError::model(format!("{e:#}"))))
}

fn status_text(state: &DriverState) -> Option<(String, u32)> {
    match state {
        DriverState::Idle | DriverState::WaitingForLoad => Some(("LOADING MODEL...".to_string(), rgb(255, 255, 0))),
        DriverState::WaitingForCamera => Some(("WAITING FOR CAMERA...".to_string(), rgb(255, 255, 0))),
        DriverState::Failed(err) => Some((format!("ERROR: {err}"), rgb(255, 64, 64))),
        DriverState::Running | DriverState::Stopped => None,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    if args.list {
        return list_cameras();
    }

    let mut config = AppConfig::load(&args.config)?;
    if let Some(index) = args.cam_index {
        config.camera.index = index;
    }
    if args.show_labels {
        config.ui.show_labels = true;
    }

    println!("{} camera {} at {}x{}{}",
        "rusty_hands".bold().green(),
        config.camera.index,
        config.camera.width,
        config.camera.height,
        if args.simulate { " (simulated hand)".yellow().to_string() } else { String::new() },
    );
    println!("Point a finger up and push it toward a button. [Esc] quits.");

    let camera = ThreadedCamera::new(config.camera.index, config.camera.width, config.camera.height);
    let loader = model_loader(config.models.clone(), args.simulate);
    let mut driver = Driver::new(
        camera,
        loader,
        config.models.max_hands,
        config.interaction.clone(),
        OverlayStyle::from_config(&config.ui),
    );

    let (width, height) = (config.camera.width as usize, config.camera.height as usize);
    let mut window = WindowOutput::new("Rusty Hands", width, height)?;
    let text = TextRenderer::new(&config.ui.font_family, config.ui.font_size_pt as f32, config.ui.menu_scale);
    let (lr, lg, lb) = parse_hex(&config.ui.label_color_hex);
    let label_color = rgb(lr, lg, lb);

    let mut layout = ControlLayout::new(width, height);
    let mut controls = DemoControls::new(config.ui.show_labels);
    let mut scheduler = IntervalScheduler::new(Duration::from_millis(config.ui.tick_interval_ms.max(1)));

    driver.start();
    while let Some(now_ms) = scheduler.next_tick() {
        if !window.is_open() {
            scheduler.cancel();
            break;
        }

        let (w, h) = window.size();
        layout.resize(w, h);
        if let Some((x, y)) = window.mouse_click() {
            if let Some(id) = layout.hit(x, y) {
                controls.press(&id);
            }
        }

        driver.tick(now_ms, &layout, &mut controls);

        let status = status_text(driver.state());
        let labels = driver.labels();
        let (frame, overlay) = driver.display();
        let scene = Scene {
            frame,
            overlay,
            mirrored: config.interaction.mirrored,
            labels: &labels,
            label_color,
            layout: &layout,
            controls: &controls,
            status,
        };
        window.present(&scene, &text)?;
    }

    driver.stop();
    info!("presses counted: {}", controls.count());
    Ok(())
}
