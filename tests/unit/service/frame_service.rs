use std::sync::Barrier;

use super::*;
use crate::scene::object::{SceneObject, regular_polygon, square};
use crate::scene::program::{ProgramSource, SceneBuilder};

#[derive(Default)]
struct FakeLink {
    reachable: bool,
    sent: Mutex<Vec<SceneData>>,
}

impl FakeLink {
    fn up() -> Arc<Self> {
        Arc::new(Self {
            reachable: true,
            ..Self::default()
        })
    }

    fn down() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl RendererLink for FakeLink {
    fn notify(&self, data: &SceneData) -> SyncResult<()> {
        if !self.reachable {
            return Err(SyncError::renderer("connection refused"));
        }
        self.sent.lock().unwrap().push(data.clone());
        Ok(())
    }

    fn endpoint(&self) -> String {
        "fake".to_owned()
    }
}

fn demo(b: &mut SceneBuilder) -> anyhow::Result<()> {
    let sq = b.create(SceneObject::vector("Square", square(2.0)))?;
    let tri = b.create(SceneObject::vector("Triangle", regular_polygon(3, 1.0)))?;
    b.add(sq)?;
    b.play(vec![Animation::shift(sq, Vec3::new(2.0, 0.0, 0.0)).with_run_time(2.0)])?;
    b.play(vec![
        Animation::rotate(sq, 1.0, Vec3::OUT),
        Animation::fade_in(tri),
    ])?;
    b.play(vec![Animation::fade_out(sq)])?;
    Ok(())
}

fn service_with(link: Arc<dyn RendererLink>, launcher: Option<RendererLauncher>) -> FrameService {
    let source = Arc::new(ProgramSource::new("Demo", demo));
    FrameService::new(source, ServiceOpts::default(), link, launcher)
}

fn request(index: usize, offset: f64, first: bool) -> FrameRequest {
    FrameRequest {
        animation_index: index,
        animation_offset: offset,
        end_index: 3,
        first_request: first,
    }
}

#[test]
fn unloaded_service_is_unavailable() {
    let service = service_with(FakeLink::up(), None);
    assert_eq!(service.status(), ServiceStatus::Uninitialized);
    assert!(matches!(
        service.get_frame_at_time(request(0, 0.0, true)),
        Err(SyncError::Unavailable(_))
    ));
    assert!(service.fetch_scene_data().has_exception);
}

#[test]
fn start_loads_and_notifies() {
    let link = FakeLink::up();
    let service = service_with(link.clone(), None);
    assert_eq!(service.start(), ReloadOutcome::Notified);
    assert_eq!(service.status(), ServiceStatus::Loaded);

    let sent = link.sent.lock().unwrap();
    let scene = sent[0].scene.as_ref().unwrap();
    assert_eq!(scene.name, "Demo");
    assert_eq!(scene.background_color, "#000000");
    let names: Vec<&str> = scene.segments.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Shift", "Rotate...", "FadeOut"]);
}

#[test]
fn first_request_adds_everything_and_sends_tweens() {
    let service = service_with(FakeLink::up(), None);
    service.start();
    let frame = service.get_frame_at_time(request(0, 0.0, true)).unwrap();
    assert_eq!(service.status(), ServiceStatus::Serving);

    assert!(frame.remove_ids.is_empty());
    assert_eq!(frame.add_mobjects.len(), 1);
    assert_eq!(frame.add_mobjects[0].name, "Square1");
    assert!(frame.all_animations_tweened);
    assert_eq!(frame.animations.len(), 1);
    let tween = &frame.animations[0].tween_data[0];
    assert_eq!(tween.attribute, "position");
    assert_eq!(tween.start_data, vec![0.0, 0.0, 0.0]);
    assert_eq!(tween.end_data, vec![2.0, 0.0, 0.0]);
    assert_eq!(frame.animations[0].easing_function, "smooth");
}

#[test]
fn scrubbing_a_tweened_segment_sends_nothing() {
    let service = service_with(FakeLink::up(), None);
    service.start();
    let handle = service.pin().unwrap();
    handle.get_frame_at_time(request(0, 0.0, true)).unwrap();
    let frame = handle.get_frame_at_time(request(0, 1.0, false)).unwrap();

    assert!(!frame.all_animations_tweened);
    assert!(frame.add_mobjects.is_empty());
    assert!(frame.update_ops.is_empty());
    assert_eq!(handle.copy_count(), 1);
}

#[test]
fn segment_change_diffs_against_served_ids() {
    let service = service_with(FakeLink::up(), None);
    service.start();
    service.get_frame_at_time(request(0, 0.0, true)).unwrap();

    let frame = service.get_frame_at_time(request(1, 0.5, false)).unwrap();
    let added: Vec<&str> = frame.add_mobjects.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(added, vec!["Triangle1"]);
    assert_eq!(frame.update_ops.len(), 1);
    assert_eq!(frame.update_ops[0].redraw.name, "Square1");
    assert!(!frame.all_animations_tweened);
    let tweened: Vec<&str> = frame.animations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(tweened, vec!["FadeIn"]);

    let back = service.get_frame_at_time(request(0, 0.5, false)).unwrap();
    assert_eq!(back.remove_ids, vec![frame.add_mobjects[0].id]);
}

#[test]
fn scrubbing_an_untweened_segment_redraws_the_target() {
    let service = service_with(FakeLink::up(), None);
    service.start();
    service.get_frame_at_time(request(1, 0.1, true)).unwrap();
    let frame = service.get_frame_at_time(request(1, 0.6, false)).unwrap();

    assert_eq!(frame.update_ops.len(), 1);
    assert_eq!(frame.update_ops[0].kind, UpdateKind::Redraw);
    assert_eq!(frame.update_ops[0].redraw.name, "Square1");
}

#[test]
fn seeking_past_the_end_finishes_the_scene() {
    let service = service_with(FakeLink::up(), None);
    service.start();
    let frame = service.get_frame_at_time(request(2, 9.0, true)).unwrap();
    assert!(frame.scene_finished);
    assert_eq!(frame.animation_index, 2);
    assert_eq!(frame.animation_offset, 1.0);
}

#[test]
fn failed_reload_keeps_in_flight_requests_on_the_old_scene() {
    let broken = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&broken);
    let source = Arc::new(ProgramSource::new("Demo", move |b| {
        if flag.load(Ordering::SeqCst) {
            anyhow::bail!("NameError: name 'Sqaure' is not defined");
        }
        demo(b)
    }));
    let service = Arc::new(FrameService::new(
        source,
        ServiceOpts::default(),
        FakeLink::up(),
        None,
    ));
    service.start();

    let pinned = Arc::new(Barrier::new(2));
    let reloaded = Arc::new(Barrier::new(2));
    let worker = {
        let service = Arc::clone(&service);
        let pinned = Arc::clone(&pinned);
        let reloaded = Arc::clone(&reloaded);
        std::thread::spawn(move || {
            let handle = service.pin().unwrap();
            pinned.wait();
            reloaded.wait();
            handle.get_frame_at_time(request(0, 0.0, true))
        })
    };

    pinned.wait();
    broken.store(true, Ordering::SeqCst);
    assert_eq!(service.on_file_changed(), ReloadOutcome::Notified);
    reloaded.wait();

    let frame = worker.join().unwrap().unwrap();
    assert_eq!(frame.add_mobjects.len(), 1);

    assert_eq!(service.status(), ServiceStatus::Errored);
    let data = service.fetch_scene_data();
    assert!(data.has_exception);
    assert!(data.exception.unwrap().contains("Sqaure"));
    assert!(matches!(
        service.get_frame_at_time(request(0, 0.0, true)),
        Err(SyncError::Unavailable(_))
    ));

    broken.store(false, Ordering::SeqCst);
    service.on_file_changed();
    assert_eq!(service.status(), ServiceStatus::Loaded);
}

#[test]
fn unreachable_renderer_without_launcher_keeps_serving() {
    let service = service_with(FakeLink::down(), None);
    assert_eq!(service.start(), ReloadOutcome::Unreachable);
    assert!(service.is_accepting());
}

#[test]
fn failed_launch_stops_accepting() {
    let launcher = RendererLauncher::new("/definitely/not/a/renderer", Vec::new());
    let service = service_with(FakeLink::down(), Some(launcher));
    assert_eq!(service.start(), ReloadOutcome::Stopped);
    assert!(!service.is_accepting());
}

#[cfg(unix)]
#[test]
fn running_launched_renderer_is_not_launched_twice() {
    let launcher = RendererLauncher::new("sleep", vec!["2".to_owned()]);
    let service = service_with(FakeLink::down(), Some(launcher));
    assert_eq!(service.start(), ReloadOutcome::Spawned);
    let pid = service.launched_renderer().unwrap();

    assert_eq!(service.on_file_changed(), ReloadOutcome::Spawned);
    assert_eq!(service.launched_renderer(), Some(pid));
    assert!(service.is_accepting());
}
