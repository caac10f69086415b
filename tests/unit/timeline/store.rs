use super::*;
use crate::foundation::core::{ObjectKey, Vec3};
use crate::scene::ease::RateFunc;
use crate::scene::object::{SceneObject, square};

fn square_scene() -> (SceneGraph, ObjectKey) {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(1.0)));
    g.add_root(sq);
    (g, sq)
}

fn three_segments() -> TimelineStore {
    let (g, sq) = square_scene();
    let mut store = TimelineStore::new();
    for d in [2.0, 1.5, 3.0] {
        store.record_segment(
            g.clone(),
            vec![Animation::shift(sq, Vec3::new(1.0, 0.0, 0.0)).with_run_time(d)],
            d,
        );
    }
    store
}

#[test]
fn overflowing_offset_advances_to_next_segment() {
    let mut store = three_segments();
    let out = store.seek(0, 2.5, 3, true).unwrap();
    assert_eq!(out.segment, 1);
    assert_eq!(out.offset, 0.0);
    assert!(!out.scene_finished);
}

#[test]
fn overflowing_last_segment_clamps_and_finishes() {
    let mut store = three_segments();
    let out = store.seek(2, 4.0, 3, false).unwrap();
    assert_eq!(out.segment, 2);
    assert_eq!(out.offset, 3.0);
    assert!(out.scene_finished);
}

#[test]
fn out_of_range_segment_clamps_to_end() {
    let mut store = three_segments();
    let out = store.seek(7, 0.5, 2, false).unwrap();
    assert_eq!(out.segment, 1);
    assert_eq!(out.offset, 1.5);
    assert!(out.scene_finished);

    let out = store.seek(0, -1.0, 0, false).unwrap();
    assert_eq!(out.segment, 0);
    assert_eq!(out.offset, 0.0);
}

#[test]
fn scrubbing_within_a_segment_reuses_the_cache() {
    let mut store = three_segments();
    let first = store.seek(1, 0.1, 3, true).unwrap();
    assert!(!first.used_cache);
    assert_eq!(store.copy_count(), 1);

    for offset in [0.2, 0.9, 1.4, 0.3] {
        let out = store.seek(1, offset, 3, false).unwrap();
        assert!(out.used_cache);
    }
    assert_eq!(store.copy_count(), 1);

    let other = store.seek(2, 0.0, 3, false).unwrap();
    assert!(!other.used_cache);
    assert_eq!(store.copy_count(), 2);
}

#[test]
fn cached_rematerialization_matches_a_fresh_copy() {
    let (g, sq) = square_scene();
    let mut store = TimelineStore::new();
    store.record_segment(
        g,
        vec![
            Animation::shift(sq, Vec3::new(2.0, 0.0, 0.0))
                .with_run_time(2.0)
                .with_rate_func(RateFunc::Linear),
        ],
        2.0,
    );

    store.seek(0, 1.5, 0, true).unwrap();
    store.seek(0, 0.5, 0, false).unwrap();
    let scrubbed = store.materialized().unwrap().scene.center(sq);

    let mut fresh = TimelineStore::new();
    fresh.record_segment(
        store.keyframes()[0].scene.clone(),
        store.keyframes()[0].animations.clone(),
        2.0,
    );
    fresh.seek(0, 0.5, 0, true).unwrap();
    let direct = fresh.materialized().unwrap().scene.center(sq);

    assert!(scrubbed.approx_eq(direct, 1e-12));
    assert!(direct.approx_eq(Vec3::new(0.5, 0.0, 0.0), 1e-12));
}

#[test]
fn keyframes_are_not_mutated_by_seeking() {
    let mut store = three_segments();
    let sq = store.keyframes()[0].scene.roots()[0];
    store.seek(0, 2.0, 3, true).unwrap();
    assert!(store.keyframes()[0].scene.center(sq).approx_eq(Vec3::ZERO, 1e-12));
}

#[test]
fn empty_timeline_is_an_error() {
    let mut store = TimelineStore::new();
    assert!(matches!(
        store.seek(0, 0.0, 0, true),
        Err(SyncError::Seek(_))
    ));
}

#[test]
fn keyframe_names_follow_animation_count() {
    let (g, sq) = square_scene();
    let mut store = TimelineStore::new();
    let one = store.record_segment(g.clone(), vec![Animation::fade_in(sq)], 1.0);
    let many = store.record_segment(
        g,
        vec![Animation::scale(sq, 2.0), Animation::fade_out(sq)],
        1.0,
    );
    assert_eq!(one.name(), "FadeIn");
    assert_eq!(many.name(), "Scale...");
    assert_eq!(many.index, 1);
}
