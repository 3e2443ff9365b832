use std::sync::Arc;

use anyhow::{Context, Result};
use easel_engine::logging::{init_logging, LoggingConfig};
use easel_engine::scene::Shape;
use easel_engine::{Action, Canvas, CanvasConfig, CanvasHandle, Color, Key, ViewMode};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let three_d = std::env::args().any(|a| a == "--3d");
    let config = CanvasConfig::new()
        .with_title(if three_d { "easel · cube" } else { "easel · shapes" })
        .with_size(800, 600)
        .with_view_mode(if three_d { ViewMode::Perspective3D } else { ViewMode::Flat2D })
        .with_background(Color::rgb(0.1, 0.1, 0.12))
        .with_show_fps(true);

    let canvas = Canvas::new(config).context("failed to create canvas")?;

    // S saves the next frame into the working directory.
    let handle = canvas.handle();
    canvas.bind_to_button(Key::S, Action::Press, move || handle.take_screenshot());

    if three_d {
        canvas.set_camera_movement_enabled(true);
        canvas.run(spin_cube)?;
    } else {
        canvas.run(|c| orbit_shapes(c.handle()))?;
    }

    log::info!("demo: closed after {} frames", canvas.frame_number());
    Ok(())
}

/// Rotates a lit cube until the window closes. Drag to pan, shift-drag to
/// dolly, ctrl-drag to orbit.
fn spin_cube(canvas: &Canvas) {
    let cube = Arc::new(Shape::cube(glam::Vec3::ZERO, 1.5, Color::rgb(0.9, 0.4, 0.2)));
    if let Err(e) = canvas.add(cube.clone()) {
        log::error!("demo: {e}");
        return;
    }

    while canvas.is_open() {
        cube.rotate(1.0, 0.3, 1.0, 0.0);
        canvas.sleep();
    }
}

/// A worker thread moves a ring of squares while the caller recolors them.
fn orbit_shapes(canvas: CanvasHandle) {
    const COUNT: usize = 12;
    let (cx, cy) = (canvas.window_width() as f32 / 2.0, canvas.window_height() as f32 / 2.0);

    let squares: Vec<Arc<Shape>> = (0..COUNT)
        .map(|_| Arc::new(Shape::rectangle(0.0, 0.0, 30.0, 30.0, Color::WHITE)))
        .collect();
    for sq in &squares {
        if let Err(e) = canvas.add(sq.clone()) {
            log::error!("demo: {e}");
        }
    }
    canvas.add_owned(Arc::new(Shape::line((cx - 200.0, cy), (cx + 200.0, cy), Color::GRAY))).ok();

    let mover = {
        let canvas = canvas.clone();
        let squares = squares.clone();
        std::thread::spawn(move || {
            while canvas.is_open() {
                let t = canvas.time() as f32;
                for (i, sq) in squares.iter().enumerate() {
                    let a = t + i as f32 * std::f32::consts::TAU / COUNT as f32;
                    sq.reset_translation();
                    sq.translate(cx + 200.0 * a.cos(), cy + 200.0 * a.sin(), 0.0);
                }
                canvas.sleep();
            }
        })
    };

    while canvas.is_open() {
        let t = canvas.time() as f32;
        for (i, sq) in squares.iter().enumerate() {
            let phase = t * 2.0 + i as f32 * 0.5;
            sq.set_color(Color::rgb(0.5 + 0.5 * phase.sin(), 0.5 + 0.5 * phase.cos(), 0.8));
        }
        canvas.sleep();
    }

    if mover.join().is_err() {
        log::error!("demo: mover thread panicked");
    }
}
