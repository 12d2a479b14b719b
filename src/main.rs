use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use glam::*;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;

use srender::abs::App;
use srender::{Colour, Config, LightKind, RenderMode, Renderer, SpotlightParam, logging};

const MOVE_SPEED: f32 = 4.0;
const ANGLE_STEP: f32 = 1.0;
const BLUR_STEP: f32 = 0.05;

fn usage() -> ! {
    eprintln!("usage: srender-viewer <model> [shader-base-path]");
    std::process::exit(1);
}

/// Sun, a warm point light beside the model and a spot light shining down on it.
fn add_scene_lights(renderer: &mut Renderer) {
    if let Some(sun) = renderer.add_light(LightKind::Directional, Some(Colour::rgb(0.6, 0.6, 0.6))) {
        renderer.update_light(sun, |light| {
            light.set_rays(vec3(-0.3, -1.0, -0.4));
        });
    }
    if let Some(point) = renderer.add_light(LightKind::Point, Colour::from_hex("#ffcc88")) {
        renderer.update_light(point, |light| {
            light.set_position(vec3(2.0, 1.5, 2.0));
        });
    }
    if let Some(spot) = renderer.add_light(LightKind::Spot, None) {
        renderer.update_light(spot, |light| {
            light
                .set_position(vec3(0.0, 4.0, 0.0))
                .aim_at(Vec3::ZERO)
                .set_blur(0.2);
        });
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(model_path) = args.next().map(PathBuf::from) else {
        usage();
    };
    let shader_path = args.next().map(PathBuf::from);

    let config = match Config::load_or_default(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };
    logging::init_logging(config.log_level_filter());

    let mut app = match App::new(&config.window) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Could not create window: {}", e);
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new(app.gpu(), app.aspect_ratio(), &config.renderer);
    let (width, height) = app.window.drawable_size();
    renderer.set_resolution(width, height);

    if let Err(e) = renderer.add_model(&model_path, shader_path.as_deref(), true) {
        log::error!("Could not load {}: {}", model_path.display(), e);
        std::process::exit(if e.is_fatal() { 2 } else { 1 });
    }
    add_scene_lights(&mut renderer);

    let mut keys_down: HashSet<Keycode> = HashSet::new();
    let mut last_time = Instant::now();

    'running: loop {
        let now = Instant::now();
        let delta_time = now.duration_since(last_time).as_secs_f32();
        last_time = now;

        for event in app.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::Window {
                    win_event: WindowEvent::Resized(w, h),
                    ..
                } => {
                    renderer.set_resolution(w.max(1) as u32, h.max(1) as u32);
                }
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => {
                    keys_down.insert(key);
                    match key {
                        Keycode::Up => {
                            renderer.modify_spotlights(SpotlightParam::Angle, ANGLE_STEP);
                        }
                        Keycode::Down => {
                            renderer.modify_spotlights(SpotlightParam::Angle, -ANGLE_STEP);
                        }
                        Keycode::Right => {
                            renderer.modify_spotlights(SpotlightParam::Blur, BLUR_STEP);
                        }
                        Keycode::Left => {
                            renderer.modify_spotlights(SpotlightParam::Blur, -BLUR_STEP);
                        }
                        Keycode::Num1 => renderer.set_render_mode(RenderMode::Point),
                        Keycode::Num2 => renderer.set_render_mode(RenderMode::Line),
                        Keycode::Num3 => renderer.set_render_mode(RenderMode::Fill),
                        _ => {}
                    }
                }
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    keys_down.remove(&key);
                }
                _ => {}
            }
        }

        let mut movement = Vec3::ZERO;
        for (key, direction) in [
            (Keycode::W, Vec3::NEG_Z),
            (Keycode::S, Vec3::Z),
            (Keycode::A, Vec3::NEG_X),
            (Keycode::D, Vec3::X),
            (Keycode::Space, Vec3::Y),
            (Keycode::LShift, Vec3::NEG_Y),
        ] {
            if keys_down.contains(&key) {
                movement += direction;
            }
        }
        if movement != Vec3::ZERO {
            renderer
                .camera_mut()
                .translate(movement.normalize() * MOVE_SPEED * delta_time);
        }

        renderer.draw();
        app.window.gl_swap_window();
    }
}
