use super::*;

#[test]
fn hex_roundtrip_is_stable_for_opaque_colors() {
    let c = Rgba::from_hex("#58C4DD").unwrap();
    assert_eq!(c.to_hex(), "#58C4DD");
    assert_eq!(Rgba::from_hex("58c4dd").unwrap(), c);
}

#[test]
fn hex_keeps_alpha_when_translucent() {
    let c = Rgba::from_hex("#FF000080").unwrap();
    assert!((c.a - 128.0 / 255.0).abs() < 1e-12);
    assert_eq!(c.to_hex(), "#FF000080");
}

#[test]
fn hex_rejects_garbage() {
    assert!(Rgba::from_hex("#FFF").is_err());
    assert!(Rgba::from_hex("#GG0000").is_err());
}

#[test]
fn color_equality_is_exact() {
    let a = Rgba::rgba(0.5, 0.5, 0.5, 1.0);
    let b = Rgba::rgba(0.5 + 1e-12, 0.5, 0.5, 1.0);
    assert_ne!(a, b);
    // Both still display identically.
    assert_eq!(a.to_hex(), b.to_hex());
}

#[test]
fn vec3_deserializes_from_short_arrays_and_objects() {
    let v: Vec3 = serde_json::from_str("[1.0, 2.0]").unwrap();
    assert_eq!(v, Vec3::new(1.0, 2.0, 0.0));
    let v: Vec3 = serde_json::from_str(r#"{"x": 1, "y": 2, "z": 3}"#).unwrap();
    assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn rotation_about_out_axis_turns_x_into_y() {
    let v = Vec3::new(1.0, 0.0, 0.0).rotated(std::f64::consts::FRAC_PI_2, Vec3::OUT);
    assert!(v.approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-12));
}

#[test]
fn approx_eq_respects_tolerance() {
    let a = Vec3::new(1.0, 1.0, 0.0);
    assert!(a.approx_eq(Vec3::new(1.0 + 1e-9, 1.0, 0.0), POSITION_TOLERANCE));
    assert!(!a.approx_eq(Vec3::new(1.001, 1.0, 0.0), POSITION_TOLERANCE));
}
