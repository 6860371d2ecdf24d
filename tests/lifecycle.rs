mod common;

use std::{cell::Cell, rc::Rc};

use common::{robot_model, Harness};
use showreel::{
    error::AssetError,
    rendering::{HeadlessBackend, ToneMapping},
    scenes::{DeformableConfig, DeformableMesh, LoadedAsset, ParticleCloud, ParticleConfig},
    AssetLoadState, LifecycleState, SceneController, SceneLifecycle,
};

fn counter() -> (Rc<Cell<usize>>, Box<dyn FnOnce()>) {
    let count = Rc::new(Cell::new(0));
    let inner = count.clone();
    (count, Box::new(move || inner.set(inner.get() + 1)))
}

fn group_children(controller: &SceneController<LoadedAsset>) -> Vec<String> {
    let group = controller.with_strategy(|robot| robot.group()).unwrap();
    controller
        .with_scene(|scene, _| {
            scene
                .get_object(group)
                .unwrap()
                .child_ids
                .iter()
                .map(|&child| scene.get_object(child).unwrap().name.clone())
                .collect()
        })
        .unwrap()
}

fn small_blob() -> DeformableMesh {
    DeformableMesh::new(DeformableConfig {
        detail: 3,
        ..Default::default()
    })
}

fn seeded_cloud() -> ParticleCloud {
    ParticleCloud::new(ParticleConfig {
        seed: Some(1),
        ..Default::default()
    })
}

#[test]
fn test_teardown_mirrors_setup() {
    let harness = Harness::new(1280, 720);
    let controller =
        SceneController::new(small_blob(), harness.container.clone(), harness.env(), None);

    controller.initialize();
    controller.start();

    assert_eq!(controller.state(), LifecycleState::Ready);
    assert_eq!(harness.viewport.listener_count(), 2);
    assert_eq!(harness.frames.pending_count(), 1);
    assert_eq!(harness.container.child_count(), 1);
    assert_eq!(harness.backend.stats().live(), 1);

    for frame in 1..=5 {
        harness.frames.run_frame(frame as f64 * 16.0);
    }
    assert_eq!(harness.backend.stats().frames, 6);

    controller.dispose();

    assert_eq!(controller.state(), LifecycleState::Disposed);
    assert_eq!(harness.viewport.listener_count(), 0);
    assert_eq!(harness.frames.pending_count(), 0);
    assert_eq!(harness.container.child_count(), 0);
    assert_eq!(harness.backend.stats().live(), 0);
    assert!(controller.with_scene(|_, _| ()).is_none());
}

#[test]
fn test_initialize_then_dispose_leaves_nothing_behind() {
    let harness = Harness::new(800, 600);
    let controller =
        SceneController::new(seeded_cloud(), harness.container.clone(), harness.env(), None);

    controller.initialize();
    assert_eq!(harness.container.child_count(), 1);
    controller.dispose();

    assert_eq!(harness.container.child_count(), 0);
    assert_eq!(harness.viewport.listener_count(), 0);
    assert_eq!(harness.backend.stats().live(), 0);
}

#[test]
fn test_dispose_twice_is_harmless() {
    let harness = Harness::new(800, 600);
    let controller =
        SceneController::new(seeded_cloud(), harness.container.clone(), harness.env(), None);

    controller.initialize();
    controller.start();
    controller.dispose();
    controller.dispose();

    assert_eq!(harness.backend.stats().disposed, 1);
    assert_eq!(harness.frames.run_frame(16.0), 0);
}

#[test]
fn test_dispose_before_initialize() {
    let harness = Harness::new(800, 600);
    let controller =
        SceneController::new(seeded_cloud(), harness.container.clone(), harness.env(), None);

    controller.dispose();
    controller.initialize();
    controller.start();

    assert_eq!(controller.state(), LifecycleState::Disposed);
    assert_eq!(harness.backend.stats().created, 0);
    assert_eq!(harness.viewport.listener_count(), 0);
}

#[test]
fn test_resize_updates_camera_and_renderer_once() {
    let harness = Harness::new(800, 600);
    let controller =
        SceneController::new(seeded_cloud(), harness.container.clone(), harness.env(), None);
    controller.initialize();
    controller.start();

    let resizes = harness.backend.stats().resizes;
    let projections = controller
        .with_scene(|_, camera| camera.projection_updates())
        .unwrap();

    harness.resize(1000, 500);

    assert_eq!(harness.backend.stats().resizes, resizes + 1);
    assert_eq!(harness.backend.stats().last_size, (1000, 500));
    let (aspect, updates) = controller
        .with_scene(|_, camera| (camera.aspect(), camera.projection_updates()))
        .unwrap();
    assert_eq!(aspect, 2.0);
    assert_eq!(updates, projections + 1);
    assert_eq!(controller.viewport_state().width, 1000);
}

#[test]
fn test_zero_size_container_defers_until_resize() {
    let harness = Harness::new(0, 0);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        seeded_cloud(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );

    controller.initialize();
    controller.start();

    assert_eq!(controller.state(), LifecycleState::Uninitialized);
    assert_eq!(harness.backend.stats().created, 0);
    assert_eq!(harness.viewport.listener_count(), 2);

    harness.resize(640, 480);

    assert_eq!(controller.state(), LifecycleState::Ready);
    assert_eq!(harness.backend.stats().created, 1);
    assert_eq!(harness.viewport.listener_count(), 2);
    assert_eq!(ready.get(), 1);
    assert_eq!(controller.viewport_state().aspect, 640.0 / 480.0);
}

#[test]
fn test_start_without_initialize_sets_up_sized_container() {
    let harness = Harness::new(800, 600);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        seeded_cloud(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );

    controller.start();

    assert_eq!(controller.state(), LifecycleState::Ready);
    assert_eq!(ready.get(), 1);
    assert_eq!(harness.backend.stats().created, 1);
    assert_eq!(harness.viewport.listener_count(), 2);
    assert_eq!(harness.frames.pending_count(), 1);

    controller.initialize();
    assert_eq!(harness.backend.stats().created, 1);
}

#[test]
fn test_missing_context_still_reports_ready() {
    let harness = Harness::with_backend(800, 600, HeadlessBackend::without_context());
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );

    controller.initialize();
    controller.start();

    assert_eq!(ready.get(), 1);
    assert_eq!(controller.asset_state(), AssetLoadState::Failed);
    assert_ne!(controller.state(), LifecycleState::Ready);
    assert_eq!(harness.frames.pending_count(), 0);
    assert_eq!(harness.container.child_count(), 0);
    assert_eq!(harness.assets.pending_count(), 0);

    controller.dispose();
    assert_eq!(harness.viewport.listener_count(), 0);
}

#[test]
fn test_model_load_normalizes_and_reports_ready() {
    let harness = Harness::new(800, 600);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );
    controller.initialize();
    controller.start();

    assert_eq!(harness.assets.pending_paths(), vec!["robot_2.0.glb"]);
    assert_eq!(controller.asset_state(), AssetLoadState::Loading);
    assert_eq!(ready.get(), 0);

    assert!(harness.assets.report_progress(50, 100));
    assert!(harness.assets.resolve_next(Ok(robot_model())));

    assert_eq!(ready.get(), 1);
    assert_eq!(controller.asset_state(), AssetLoadState::Loaded);

    let model = controller.with_strategy(|robot| robot.model()).unwrap();
    let size = controller
        .with_scene(|scene, _| scene.world_bounds(model).unwrap().size().max_element())
        .unwrap();
    assert!((size - 2.5).abs() < 1e-4);

    harness.frames.run_frame(16.0);
    assert_eq!(harness.backend.stats().last_draw_count, 1);
}

#[test]
fn test_failed_load_shows_fallback() {
    let harness = Harness::new(800, 600);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );
    controller.initialize();
    controller.start();

    harness
        .assets
        .resolve_next(Err(AssetError::Empty("robot_2.0.glb".to_string())));

    assert_eq!(ready.get(), 1);
    assert_eq!(controller.asset_state(), AssetLoadState::Failed);
    assert_eq!(controller.state(), LifecycleState::Ready);

    assert_eq!(group_children(&controller), vec!["Fallback"]);

    harness.frames.run_frame(16.0);
    assert_eq!(harness.backend.stats().last_draw_count, 1);
}

#[test]
fn test_out_of_range_indices_fall_back() {
    let harness = Harness::new(800, 600);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );
    controller.initialize();
    controller.start();

    let mut model = robot_model();
    model.roots[0].primitives[0].indices = Some(vec![0, 1, 7]);
    assert!(harness.assets.resolve_next(Ok(model)));

    assert_eq!(ready.get(), 1);
    assert_eq!(controller.asset_state(), AssetLoadState::Failed);
    assert!(controller.with_strategy(|robot| robot.model()).is_none());
    assert_eq!(group_children(&controller), vec!["Fallback"]);

    harness.frames.run_frame(16.0);
    assert_eq!(harness.backend.stats().last_draw_count, 1);
}

#[test]
fn test_out_of_range_primitive_is_dropped_from_model() {
    let harness = Harness::new(800, 600);
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        None,
    );
    controller.initialize();
    controller.start();

    let mut model = robot_model();
    let mut broken = model.roots[0].primitives[0].clone();
    broken.indices = Some(vec![0, 1, 7]);
    model.roots[0].primitives.push(broken);
    assert!(harness.assets.resolve_next(Ok(model)));

    assert_eq!(controller.asset_state(), AssetLoadState::Loaded);
    harness.frames.run_frame(16.0);
    assert_eq!(harness.backend.stats().last_draw_count, 1);
}

#[test]
fn test_load_settling_after_dispose_is_ignored() {
    let harness = Harness::new(800, 600);
    let (ready, on_ready) = counter();
    let controller = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        Some(on_ready),
    );
    controller.initialize();
    controller.start();
    controller.dispose();

    assert!(harness.assets.report_progress(10, 100));
    assert!(harness.assets.resolve_next(Ok(robot_model())));

    assert_eq!(ready.get(), 0);
    assert_eq!(controller.state(), LifecycleState::Disposed);
    assert!(controller.with_strategy(|robot| robot.model()).is_none());
    assert_eq!(harness.container.child_count(), 0);
}

#[test]
fn test_load_settling_after_drop_is_ignored() {
    let harness = Harness::new(800, 600);
    {
        let controller = SceneController::new(
            LoadedAsset::default(),
            harness.container.clone(),
            harness.env(),
            None,
        );
        controller.initialize();
        controller.start();
    }

    assert!(harness.assets.resolve_next(Err(AssetError::Empty(
        "robot_2.0.glb".to_string()
    ))));
    assert_eq!(harness.backend.stats().live(), 0);
}

#[test]
fn test_scenes_request_their_renderer_options() {
    let harness = Harness::new(800, 600);
    harness.viewport.set_device_pixel_ratio(3.0);

    let cloud = SceneController::new(seeded_cloud(), harness.container.clone(), harness.env(), None);
    cloud.initialize();
    let options = harness.backend.stats().last_options.unwrap();
    assert_eq!(options.tone_mapping, ToneMapping::None);
    assert_eq!(harness.backend.stats().pixel_ratio, 3.0);
    cloud.dispose();

    let robot = SceneController::new(
        LoadedAsset::default(),
        harness.container.clone(),
        harness.env(),
        None,
    );
    robot.initialize();
    let options = harness.backend.stats().last_options.unwrap();
    assert_eq!(options.tone_mapping, ToneMapping::AcesFilmic);
    assert_eq!(options.exposure, 1.2);
    assert!(options.alpha && options.antialias);
    assert_eq!(harness.backend.stats().pixel_ratio, 2.0);
}
