//! Bonnie Retro viewer
//!
//! Renders a small test scene through the retro pipeline and blits the
//! low-resolution frame, nearest-filtered, to the window.
//!
//! Controls:
//! - Arrows: look, WASD / Q / E: move
//! - 1 / 2 / 3: PS1, baked, modern material preset
//! - V snap, T tessellation, L lighting mode, G dither, F fog
//! - C composite video, X affine textures, Z depth buffer, J sky jiggle
//! - F5 save config, P save screenshot

use std::path::Path;

use bonnie_retro::config::{load_config, save_config, RenderConfig};
use bonnie_retro::pipeline::lighting::LightingMode;
use bonnie_retro::pipeline::material::MaterialConfig;
use bonnie_retro::pipeline::projection::Skin;
use bonnie_retro::pipeline::tessellation::TessellationParams;
use bonnie_retro::rasterizer::{
    create_ground_plane, create_test_cube, render_frame, Camera, Draw, Face, Framebuffer, Mesh, Texture,
    TextureSampler, Vertex,
};
use bonnie_retro::VERSION;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use macroquad::prelude::{
    clear_background, draw_text, draw_texture_ex, get_frame_time, is_key_down, is_key_pressed, next_frame,
    screen_height, screen_width, Color, Conf, DrawTextureParams, FilterMode, KeyCode, Texture2D, WHITE,
};

const CONFIG_PATH: &str = "assets/render.ron";
const SCREENSHOT_PATH: &str = "screenshot.png";
/// Optional equirectangular sky image
const SKY_PATH: &str = "assets/sky.png";

const LOOK_SPEED: f32 = 1.5;
const MOVE_SPEED: f32 = 4.0;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Bonnie Retro v{}", VERSION),
        window_width: bonnie_retro::rasterizer::WIDTH as i32 * 3,
        window_height: bonnie_retro::rasterizer::HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Column of stacked quads, lower half bound to joint 0 and upper half to joint 1
fn create_swaying_column() -> Mesh {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let rings = 5;
    for i in 0..rings {
        let y = i as f32 * 0.5;
        let upper = (i as f32 / (rings - 1) as f32).clamp(0.0, 1.0);
        for x in [-0.25, 0.25] {
            vertices.push(
                Vertex::new(Vec3::new(x, y, 0.0), Vec2::new(x + 0.5, y), Vec3::Z)
                    .with_skin([0, 1, 0, 0], [1.0 - upper, upper, 0.0, 0.0]),
            );
        }
    }
    for i in 0..rings - 1 {
        let base = i * 2;
        faces.push(Face::new(base, base + 1, base + 3));
        faces.push(Face::new(base, base + 3, base + 2));
    }
    Mesh::new(vertices, faces)
}

/// Camera-facing quad centred on the origin
fn create_sprite_quad() -> Mesh {
    let vertices = vec![
        Vertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec2::new(0.0, 1.0), Vec3::Z),
        Vertex::new(Vec3::new(0.5, -0.5, 0.0), Vec2::new(1.0, 1.0), Vec3::Z),
        Vertex::new(Vec3::new(0.5, 0.5, 0.0), Vec2::new(1.0, 0.0), Vec3::Z),
        Vertex::new(Vec3::new(-0.5, 0.5, 0.0), Vec2::new(0.0, 0.0), Vec3::Z),
    ];
    Mesh::new(vertices, vec![Face::new(0, 1, 2), Face::new(0, 2, 3)])
}

fn cycle_lighting(mode: LightingMode) -> LightingMode {
    match mode {
        LightingMode::Vertex => LightingMode::Fragment,
        LightingMode::Fragment => LightingMode::Baked,
        LightingMode::Baked => LightingMode::Vertex,
    }
}

fn handle_toggles(config: &mut RenderConfig, material: &mut MaterialConfig) {
    if is_key_pressed(KeyCode::Key1) {
        *material = config.material("ps1");
    }
    if is_key_pressed(KeyCode::Key2) {
        *material = config.material("baked");
    }
    if is_key_pressed(KeyCode::Key3) {
        *material = config.material("modern");
    }
    if is_key_pressed(KeyCode::V) {
        material.snap = !material.snap;
    }
    if is_key_pressed(KeyCode::T) {
        material.tessellation = match material.tessellation {
            Some(_) => None,
            None => Some(TessellationParams::default()),
        };
    }
    if is_key_pressed(KeyCode::L) {
        material.lighting = cycle_lighting(material.lighting);
    }
    if is_key_pressed(KeyCode::G) {
        material.dither = !material.dither;
    }
    if is_key_pressed(KeyCode::F) {
        material.fog = !material.fog;
    }
    if is_key_pressed(KeyCode::C) {
        config.composite.enabled = !config.composite.enabled;
    }
    if is_key_pressed(KeyCode::X) {
        config.raster.affine_textures = !config.raster.affine_textures;
    }
    if is_key_pressed(KeyCode::Z) {
        config.raster.use_zbuffer = !config.raster.use_zbuffer;
    }
    if is_key_pressed(KeyCode::J) {
        config.raster.sky_jiggle = !config.raster.sky_jiggle;
    }
}

fn handle_camera(camera: &mut Camera, dt: f32) {
    let look = LOOK_SPEED * dt;
    if is_key_down(KeyCode::Left) {
        camera.rotate(0.0, -look);
    }
    if is_key_down(KeyCode::Right) {
        camera.rotate(0.0, look);
    }
    if is_key_down(KeyCode::Up) {
        camera.rotate(look, 0.0);
    }
    if is_key_down(KeyCode::Down) {
        camera.rotate(-look, 0.0);
    }

    let step = MOVE_SPEED * dt;
    let axis = |pos: KeyCode, neg: KeyCode| {
        (is_key_down(pos) as i32 - is_key_down(neg) as i32) as f32 * step
    };
    camera.translate(axis(KeyCode::W, KeyCode::S), axis(KeyCode::D, KeyCode::A), axis(KeyCode::E, KeyCode::Q));
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = if Path::new(CONFIG_PATH).exists() {
        match load_config(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}, using defaults", CONFIG_PATH, e);
                RenderConfig::default()
            }
        }
    } else {
        RenderConfig::default()
    };

    let mut fb = Framebuffer::new(config.resolution.x as usize, config.resolution.y as usize);
    let mut camera = Camera::new(Vec3::new(0.0, 1.0, 6.0));
    let mut material = config.material("ps1");
    let ground_material = config.material("baked");
    let sprite_material = MaterialConfig { tessellation: None, ..config.material("modern") };

    let cube = create_test_cube();
    let ground = create_ground_plane(30.0, 12, -1.0);
    let column = create_swaying_column();
    let sprite = create_sprite_quad();

    let checker = Texture::checkerboard(
        32,
        32,
        Vec4::new(0.9, 0.85, 0.7, 1.0),
        Vec4::new(0.35, 0.2, 0.15, 1.0),
    );
    let grass = Texture::checkerboard(16, 16, Vec4::new(0.2, 0.4, 0.15, 1.0), Vec4::new(0.15, 0.3, 0.1, 1.0));
    let sky = match Texture::from_file(SKY_PATH) {
        Ok(tex) => tex,
        Err(e) => {
            log::info!("{}, using gradient sky", e);
            Texture::sky_gradient(256, 128, Vec3::new(0.15, 0.25, 0.6), Vec3::new(0.9, 0.6, 0.4), Vec3::splat(0.1))
        }
    };

    let bind = [Mat4::IDENTITY, Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))];
    let inverse_bind: Vec<Mat4> = bind.iter().map(|m| m.inverse()).collect();

    log::info!("Bonnie Retro v{}", VERSION);

    let mut time = 0.0f32;

    loop {
        let dt = get_frame_time();
        time += dt;

        handle_toggles(&mut config, &mut material);
        handle_camera(&mut camera, dt);

        if is_key_pressed(KeyCode::F5) {
            if let Err(e) = save_config(&config, CONFIG_PATH) {
                log::error!("Failed to save {}: {}", CONFIG_PATH, e);
            }
        }

        fb.resize(config.resolution.x as usize, config.resolution.y as usize);
        let frame = config.frame_params(camera.view_matrix());

        let joint_world = [
            Mat4::from_translation(Vec3::new(-3.0, -1.0, 0.0)),
            Mat4::from_translation(Vec3::new(-3.0, 0.0, 0.0))
                * Mat4::from_rotation_z((time * 1.5).sin() * 0.5),
        ];
        let skin = Skin::from_joints(&joint_world, &inverse_bind);

        let cube_model = Mat4::from_rotation_translation(
            Quat::from_rotation_y(time * 0.6) * Quat::from_rotation_x(time * 0.3),
            Vec3::ZERO,
        );
        let sprite_model = Mat4::from_translation(Vec3::new(3.0, 0.5, 0.0));

        let draws = [
            Draw::new(&ground, &ground_material).with_texture(&grass),
            Draw::new(&cube, &material).with_model(cube_model).with_texture(&checker),
            Draw::new(&column, &material).with_skin(&skin),
            Draw::new(&sprite, &sprite_material).with_model(sprite_model).with_texture(&checker).billboard(),
        ];

        render_frame(
            &mut fb,
            &frame,
            &draws,
            Some(&sky as &dyn TextureSampler),
            &config.composite,
            &config.raster,
        );

        if is_key_pressed(KeyCode::P) {
            if let Err(e) = fb.save_png(SCREENSHOT_PATH) {
                log::error!("{}", e);
            }
        }

        clear_background(Color::from_rgba(0, 0, 0, 255));

        // Letterbox the internal frame at its own aspect
        let screen_w = screen_width();
        let screen_h = screen_height();
        let scale = (screen_w / fb.width as f32).min(screen_h / fb.height as f32);
        let draw_w = fb.width as f32 * scale;
        let draw_h = fb.height as f32 * scale;

        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.to_rgba8());
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            (screen_w - draw_w) * 0.5,
            (screen_h - draw_h) * 0.5,
            WHITE,
            DrawTextureParams {
                dest_size: Some(macroquad::math::vec2(draw_w, draw_h)),
                ..Default::default()
            },
        );

        draw_text(
            &format!(
                "snap:{} tess:{} light:{:?} dither:{} fog:{} composite:{} affine:{}",
                material.snap,
                material.tessellation.is_some(),
                material.lighting,
                material.dither,
                material.fog,
                config.composite.enabled,
                config.raster.affine_textures,
            ),
            8.0,
            18.0,
            16.0,
            Color::from_rgba(200, 200, 200, 255),
        );

        next_frame().await;
    }
}
