use super::*;
use crate::scene::object::{SceneObject, Style, square};

fn scene_with_square() -> (SceneGraph, ObjectKey) {
    let mut g = SceneGraph::new();
    let sq = g.insert(SceneObject::vector("Square", square(2.0)).with_style(Style {
        fill_opacity: 0.5,
        ..Style::default()
    }));
    g.add_root(sq);
    (g, sq)
}

#[test]
fn shift_interpolates_from_base() {
    let (base, sq) = scene_with_square();
    let anim = Animation::shift(sq, Vec3::new(2.0, 0.0, 0.0)).with_rate_func(RateFunc::Linear);

    let mut scene = base.clone();
    anim.apply_at(&base, &mut scene, anim.alpha_at(0.5));
    assert!(scene.center(sq).approx_eq(Vec3::new(1.0, 0.0, 0.0), 1e-12));
}

#[test]
fn move_to_measures_delta_against_start_state() {
    let (mut base, sq) = scene_with_square();
    base.shift(sq, Vec3::new(1.0, 1.0, 0.0));
    let anim = Animation::move_to(sq, Vec3::new(3.0, 1.0, 0.0));
    assert_eq!(anim.total_shift(&base), Some(Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn resolved_move_keeps_its_delta_against_any_base() {
    let (base, sq) = scene_with_square();
    let mut moved = base.clone();
    moved.shift(sq, Vec3::new(1.0, 0.0, 0.0));

    let mut anim = Animation::move_to(sq, Vec3::new(5.0, 0.0, 0.0));
    anim.resolve(&moved);
    assert_eq!(anim.total_shift(&base), Some(Vec3::new(4.0, 0.0, 0.0)));
    assert_eq!(anim.class_name(), "MoveTo");
}

#[test]
fn fade_in_scales_opacity_from_zero() {
    let (base, sq) = scene_with_square();
    let anim = Animation::fade_in(sq);

    let mut scene = base.clone();
    anim.apply_at(&base, &mut scene, 0.0);
    assert_eq!(scene.get(sq).unwrap().opacities(), Some((0.0, 0.0)));

    anim.apply_at(&base, &mut scene, 1.0);
    assert_eq!(scene.get(sq).unwrap().opacities(), Some((0.5, 1.0)));
}

#[test]
fn finish_reports_transform_for_log() {
    let (mut g, sq) = scene_with_square();
    let anim = Animation::rotate(sq, 1.0, Vec3::OUT);
    let (key, record) = anim.finish(&mut g).unwrap();
    assert_eq!(key, sq);
    assert_eq!(
        record,
        TransformRecord::Rotate {
            angle: 1.0,
            axis: Vec3::OUT
        }
    );
}

#[test]
fn fade_out_finish_detaches_target() {
    let (mut g, sq) = scene_with_square();
    assert!(Animation::fade_out(sq).finish(&mut g).is_none());
    assert!(g.roots().is_empty());
    assert_eq!(g.get(sq).unwrap().opacities(), Some((0.5, 1.0)));
}

#[test]
fn zero_run_time_jumps_to_end() {
    let (_, sq) = scene_with_square();
    let anim = Animation::scale(sq, 2.0).with_run_time(0.0);
    assert!((anim.alpha_at(0.0) - 1.0).abs() < 1e-9);
}

#[test]
fn wait_has_no_target_and_reports_class() {
    let w = Animation::wait(2.0);
    assert!(w.target.is_none());
    assert_eq!(w.class_name(), "Wait");
    assert_eq!(w.run_time, 2.0);
}
