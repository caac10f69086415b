use std::path::PathBuf;

use super::*;
use crate::scene::object::square;

#[test]
fn asset_paths_are_made_relative_to_the_root() {
    let root = PathBuf::from("/project/assets");
    assert_eq!(
        relative_asset_path(&root.join("img/logo.png"), &root),
        Some("img/logo.png".to_owned())
    );
    assert_eq!(
        relative_asset_path(Path::new("/elsewhere/logo.png"), &root),
        None
    );
}

#[test]
fn relative_assets_root_resolves_against_the_working_directory() {
    let cwd = std::env::current_dir().unwrap();
    assert_eq!(
        relative_asset_path(&cwd.join("assets/img/logo.png"), Path::new("assets")),
        Some("img/logo.png".to_owned())
    );
    assert_eq!(
        relative_asset_path(Path::new("scenes/../assets/./logo.png"), Path::new("./assets")),
        Some("logo.png".to_owned())
    );
    assert_eq!(
        relative_asset_path(&cwd.join("other/logo.png"), Path::new("assets")),
        None
    );
}

#[test]
fn absolute_path_folds_dot_components() {
    assert_eq!(
        absolute_path(Path::new("/project/scenes/../assets/./a.png")),
        PathBuf::from("/project/assets/a.png")
    );
    assert!(absolute_path(Path::new("assets")).is_absolute());
}

#[test]
fn image_outside_assets_omits_path_field() {
    let img = SceneObject::image("/elsewhere/logo.png", 2.0, 1.0);
    let data = MobjectData::from_object(
        &img,
        ObjectId(1),
        "ImageMobject1",
        Path::new("/project/assets"),
        &mut HashMap::new(),
    )
    .unwrap();
    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["type"], "image");
    assert!(json.get("path").is_none());
    assert_eq!(json["width"], 2.0);
    assert!(json["style"].get("stroke_width").is_none());
}

#[test]
fn needs_redraw_follows_point_hash() {
    let sq = SceneObject::vector("Square", square(1.0));
    let mut hashes = HashMap::new();
    let root = Path::new("/");
    let first = MobjectData::from_object(&sq, ObjectId(0), "Square1", root, &mut hashes).unwrap();
    let again = MobjectData::from_object(&sq, ObjectId(0), "Square1", root, &mut hashes).unwrap();
    let redraw = |d: &MobjectData| match d.payload {
        MobjectPayload::Vectorized { needs_redraw, .. } => needs_redraw,
        MobjectPayload::Image { .. } => panic!("expected vectorized"),
    };
    assert!(redraw(&first));
    assert!(!redraw(&again));
}

#[test]
fn groups_and_trackers_are_not_drawable() {
    let mut hashes = HashMap::new();
    let root = Path::new("/");
    let group = SceneObject::group("VGroup", Vec::new());
    let tracker = SceneObject::tracker(1.0);
    assert!(MobjectData::from_object(&group, ObjectId(0), "VGroup1", root, &mut hashes).is_none());
    assert!(
        MobjectData::from_object(&tracker, ObjectId(1), "ValueTracker1", root, &mut hashes)
            .is_none()
    );
}

#[test]
fn requests_parse_from_wire_form() {
    let req: RpcRequest = serde_json::from_str(
        r#"{"method":"GetFrameAtTime","params":{"animation_index":1,"animation_offset":0.5}}"#,
    )
    .unwrap();
    assert_eq!(
        req,
        RpcRequest::GetFrameAtTime(FrameRequest {
            animation_index: 1,
            animation_offset: 0.5,
            end_index: 0,
            first_request: false,
        })
    );

    let req: RpcRequest = serde_json::from_str(r#"{"method":"FetchSceneData"}"#).unwrap();
    assert_eq!(req, RpcRequest::FetchSceneData);
}

#[test]
fn replies_are_externally_tagged() {
    let reply = RpcReply::Error {
        message: "nope".to_owned(),
    };
    assert_eq!(
        serde_json::to_string(&reply).unwrap(),
        r#"{"error":{"message":"nope"}}"#
    );

    let failed = serde_json::to_value(RpcReply::Scene(SceneData::failed("trace"))).unwrap();
    assert_eq!(failed["scene"]["has_exception"], true);
    assert_eq!(failed["scene"]["exception"], "trace");
}
