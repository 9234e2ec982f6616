//! Headless frame trace
//!
//! Builds the default pipeline over the recording backend, renders a few
//! frames of a small scene and prints what each frame did.
//!
//! Run with:
//!   cargo run --example frame_trace
//!   cargo run --example frame_trace -- --frames 3 --post-process --calls
//!   RUST_LOG=debug cargo run --example frame_trace

use clap::Parser;
use glam::{Vec2, Vec3, Vec4};
use render_pipeline::{
    backend::{DummyBackend, GraphicsBackend, ShaderDescriptor, ShaderSource, Viewport},
    build_default_pipeline,
    commands::ComputeDispatch,
    pipeline::{UiCanvas, UiElement, UiLayer},
    resources::{BlendMode, Material, Mesh, ShaderHandle},
    scene::{Camera, DirectionalLight, Drawable, Scene, SceneEntity, Transform},
    BackendResult, DebugLines, JobManager, MainThread, PipelineConfig, RenderAssets,
    RenderManager, RenderMode, RendererConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliRenderMode {
    #[default]
    Normal,
    Wireframe,
    Overdraw,
}

impl From<CliRenderMode> for RenderMode {
    fn from(mode: CliRenderMode) -> Self {
        match mode {
            CliRenderMode::Normal => RenderMode::Normal,
            CliRenderMode::Wireframe => RenderMode::Wireframe,
            CliRenderMode::Overdraw => RenderMode::Overdraw,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "frame_trace", about = "Render frames on the recording backend")]
struct Args {
    /// Number of frames to render.
    #[arg(long, default_value = "2")]
    frames: u64,

    /// Surface width in pixels.
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value = "720")]
    height: u32,

    /// Render the scene off-screen and tonemap it to the surface.
    #[arg(long)]
    post_process: bool,

    /// Add a compute pass in front of the default passes.
    #[arg(long)]
    compute: bool,

    #[arg(long, default_value = "normal", value_enum)]
    render_mode: CliRenderMode,

    /// Print every backend call of the last frame.
    #[arg(long)]
    calls: bool,
}

fn shader(
    backend: &mut dyn GraphicsBackend,
    assets: &mut RenderAssets,
    name: &str,
    source: ShaderSource,
) -> BackendResult<ShaderHandle> {
    let desc = ShaderDescriptor {
        label: Some(name.to_string()),
        source,
    };
    assets.create_shader(backend, &desc)
}

fn graphics_source() -> ShaderSource {
    ShaderSource::Graphics {
        vertex: String::new(),
        fragment: String::new(),
    }
}

fn main() -> BackendResult<()> {
    env_logger::init();
    let args = Args::parse();

    let config = RendererConfig {
        width: args.width,
        height: args.height,
        render_mode: args.render_mode.into(),
        ..Default::default()
    };
    let mut backend = DummyBackend::new(config.width, config.height);
    let mut assets = RenderAssets::new();
    let jobs = match JobManager::new(config.worker_threads) {
        Ok(jobs) => jobs,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let mut manager = RenderManager::new(&mut backend, config)?;

    let lit_shader = shader(&mut backend, &mut assets, "lit", graphics_source())?;
    let ui_shader = shader(&mut backend, &mut assets, "ui", graphics_source())?;
    let lit = assets.add_material(Material::new("lit").with_shader(lit_shader));
    let glass = assets.add_material(
        Material::new("glass")
            .with_shader(lit_shader)
            .with_blend_mode(BlendMode::Translucent)
            .with_color(Vec4::new(0.6, 0.8, 1.0, 0.4)),
    );
    let tonemap = assets.add_material(Material::new("tonemap").with_shader(lit_shader));

    let pipeline_config = PipelineConfig {
        post_process_material: args.post_process.then_some(tonemap),
        enable_compute: args.compute,
        ..Default::default()
    };
    build_default_pipeline(&mut manager, &mut backend, &mut assets, &pipeline_config)?;
    if args.compute {
        let particles = shader(
            &mut backend,
            &mut assets,
            "particles",
            ShaderSource::Compute(String::new()),
        )?;
        manager.queue_compute(ComputeDispatch::new(particles, [64, 1, 1]));
    }

    // Meshes are built on a worker and uploaded on the main thread
    let sender = jobs.main_thread_sender();
    let build = jobs.execute(move || {
        let ground = Mesh::plane(20.0, 20.0, 4);
        let cube = Mesh::cube();
        sender.send(move |main| {
            for mesh in [ground, cube] {
                if let Err(err) = main.assets.create_vertex_array(&mut *main.backend, &mesh) {
                    log::error!("Failed to upload '{}': {}", mesh.name, err);
                }
            }
        });
    });
    jobs.wait_on_job(build);
    jobs.run_main_thread_jobs(&mut MainThread {
        manager: &mut manager,
        assets: &mut assets,
        backend: &mut backend,
    });

    let quad = assets.create_vertex_array(&mut backend, &Mesh::quad())?;
    let cube = assets.create_vertex_array(&mut backend, &Mesh::cube())?;
    let mut camera = Camera::new(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO);
    camera.fit_viewport(Viewport::from_size(args.width, args.height));
    let camera = assets.add_camera(camera);

    let mut scene = Scene::new();
    scene.set_camera(Some(camera));
    scene.set_light(Some(DirectionalLight::default()));
    scene.spawn(SceneEntity::new("crate", Drawable::Model, cube, lit));
    scene.spawn(
        SceneEntity::new("window", Drawable::StaticMesh, quad, glass)
            .with_transform(
                Transform::from_position(Vec3::new(0.0, 1.0, 2.0))
                    .with_rotation(glam::Quat::from_rotation_y(0.5)),
            ),
    );
    scene.spawn(SceneEntity::new("logo", Drawable::Sprite { sort_order: 1 }, quad, lit));

    let mut canvas = UiCanvas::new();
    canvas.add(UiElement::new(
        quad,
        ui_shader,
        Vec2::new(16.0, 16.0),
        Vec2::new(200.0, 40.0),
    ));

    let mut lines = DebugLines::new(&mut backend, &mut assets, lit)?;
    lines.draw_line(Vec3::ZERO, Vec3::X, Vec4::new(1.0, 0.0, 0.0, 1.0), Some(1.0));
    lines.draw_line(Vec3::ZERO, Vec3::Y, Vec4::new(0.0, 1.0, 0.0, 1.0), Some(1.0));
    lines.draw_line(Vec3::ZERO, Vec3::Z, Vec4::new(0.0, 0.0, 1.0, 1.0), Some(1.0));

    println!("Passes: {:?}", manager.pass_names());
    let delta = 1.0 / 60.0;
    for frame in 0..args.frames {
        backend.clear_calls();
        let elapsed = frame as f32 * delta;

        manager.begin_frame(&scene, elapsed);
        manager.render_passes(&mut backend, &assets, &scene, Some(&canvas as &dyn UiLayer));
        lines.submit(&mut manager, delta);
        manager.end_frame(&mut backend, &assets)?;

        let stats = manager.stats();
        println!(
            "Frame {}: {} passes, {} commands, {} draws, {} dispatches, {} expired, {} backend calls",
            frame,
            stats.passes_rendered,
            stats.commands_executed,
            stats.draw_calls,
            stats.dispatches,
            stats.expired_resources,
            backend.render_call_count()
        );
    }

    for (name, texture) in manager.outputs().iter() {
        println!("Output '{}' -> {:?}", name, texture);
    }

    if args.calls {
        for call in backend.calls() {
            println!("  {:?}", call);
        }
    }

    Ok(())
}
