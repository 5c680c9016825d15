use assert_cmd::cargo::cargo_bin_cmd;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn write_pdf(dir: &Path, name: &str, sizes: &[(i64, i64)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for (width, height) in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("fixture should be written");
    path
}

fn run_json(args: &[&str], file: &Path) -> Value {
    let output = cargo_bin_cmd!("pdfmark")
        .arg(args[0])
        .arg(file)
        .args(&args[1..])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

fn number(object: &Object) -> f64 {
    match object {
        Object::Integer(value) => *value as f64,
        Object::Real(value) => f64::from(*value),
        other => panic!("not a number: {other:?}"),
    }
}

#[test]
fn info_lists_every_page_size() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "two.pdf", &[(600, 800), (612, 792)]);

    let value = run_json(&["info"], &pdf);

    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0], serde_json::json!({"page": 1, "width": 600.0, "height": 800.0}));
    assert_eq!(value["pages"][1]["width"], 612.0);
}

#[test]
fn highlight_stores_document_space_rects_in_a_sidecar() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    let created = run_json(
        &["highlight", "--page", "1", "--rect", "100,50,200,20", "--scale", "0.5", "--text", "selected words"],
        &pdf,
    );

    assert_eq!(created["type"], "highlight");
    assert_eq!(created["pageNumber"], 1);
    assert_eq!(created["text"], "selected words");
    assert_eq!(
        created["rects"],
        serde_json::json!([{"top": 200.0, "left": 100.0, "width": 400.0, "height": 40.0}])
    );
    assert!(temp.path().join("paper.pdf.pdfmark.json").is_file());

    let listed = run_json(&["list"], &pdf);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["id"], created["id"]);
}

#[test]
fn highlight_fitted_to_viewport_uses_base_scale() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    let created = run_json(
        &["highlight", "--page", "1", "--rect", "100,50,200,20", "--viewport", "1000x540", "--text", "x"],
        &pdf,
    );

    assert_eq!(created["rects"][0]["top"], 200.0);
    assert_eq!(created["rects"][0]["width"], 400.0);
}

#[test]
fn selection_outside_the_page_is_rejected() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    cargo_bin_cmd!("pdfmark")
        .args(["highlight"])
        .arg(&pdf)
        .args(["--page", "1", "--rect", "5000,5000,10,10", "--text", "gutter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the rendered page"));

    assert!(!temp.path().join("paper.pdf.pdfmark.json").exists());
}

#[test]
fn annotations_on_missing_pages_are_rejected() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    cargo_bin_cmd!("pdfmark")
        .arg("note")
        .arg(&pdf)
        .args(["--page", "3", "--at", "10,10", "--content", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 3 out of range"));
}

#[test]
fn list_filters_by_page_in_creation_order() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800), (600, 800)]);

    run_json(&["note", "--page", "2", "--at", "10,10", "--content", "first"], &pdf);
    run_json(&["shape", "--page", "1", "--kind", "arrow", "--from", "0,0", "--to", "50,50"], &pdf);
    run_json(&["stamp", "--page", "2", "--at", "300,400", "--kind", "approved"], &pdf);

    let page_two = run_json(&["list", "--page", "2"], &pdf);
    let kinds: Vec<&str> = page_two
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|record| record["type"].as_str())
        .collect();
    assert_eq!(kinds, vec!["note", "stamp"]);

    let everything = run_json(&["list"], &pdf);
    let contents: Vec<&str> = everything
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|record| record["type"].as_str())
        .collect();
    assert_eq!(contents, vec!["note", "arrow", "stamp"]);
}

#[test]
fn update_applies_a_json_patch() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    let created = run_json(&["note", "--page", "1", "--at", "10,10", "--content", "draft"], &pdf);
    let id = created["id"].as_str().expect("id").to_owned();

    let updated = run_json(&["update", "--id", &id, "--patch", r#"{"content": "final"}"#], &pdf);
    assert_eq!(updated["content"], "final");
    assert_eq!(updated["id"], created["id"]);

    cargo_bin_cmd!("pdfmark")
        .arg("update")
        .arg(&pdf)
        .args(["--id", &id, "--patch", r##"{"color": "#FF0000"}"##])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to update annotation"));
}

#[test]
fn delete_reports_outcome_and_succeeds_either_way() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    let created = run_json(&["note", "--page", "1", "--at", "10,10", "--content", "bye"], &pdf);
    let id = created["id"].as_str().expect("id").to_owned();

    for expected in ["deleted", "not found"] {
        cargo_bin_cmd!("pdfmark")
            .arg("delete")
            .arg(&pdf)
            .args(["--id", &id])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{expected}\n")));
    }

    assert_eq!(run_json(&["list"], &pdf), serde_json::json!([]));
}

#[test]
fn export_burns_highlights_into_a_copy() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);
    let original = fs::read(&pdf).expect("read source");

    run_json(&["highlight", "--page", "1", "--rect", "100,50,200,20", "--scale", "0.5", "--text", "x"], &pdf);
    run_json(&["note", "--page", "1", "--at", "10,10", "--content", "not exported"], &pdf);

    let output = temp.path().join("out/paper-annotated.pdf");
    fs::create_dir_all(output.parent().expect("parent")).expect("mkdir");

    cargo_bin_cmd!("pdfmark")
        .arg("export")
        .arg(&pdf)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("paper-annotated.pdf"));

    assert_eq!(fs::read(&pdf).expect("read source"), original);

    let doc = Document::load(&output).expect("exported PDF should parse");
    let page_id = *doc.get_pages().get(&1).expect("page 1");
    let content = Content::decode(&doc.get_page_content(page_id).expect("content")).expect("decode");
    let rects: Vec<Vec<f64>> = content
        .operations
        .iter()
        .filter(|op| op.operator == "re")
        .map(|op| op.operands.iter().map(number).collect())
        .collect();

    assert_eq!(rects, vec![vec![100.0, 560.0, 400.0, 40.0]]);
}

#[test]
fn export_refuses_to_overwrite_the_source() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    cargo_bin_cmd!("pdfmark")
        .arg("export")
        .arg(&pdf)
        .arg("--output")
        .arg(&pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output must differ"));
}

#[test]
fn overlay_projects_annotations_at_scale() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);

    run_json(&["highlight", "--page", "1", "--rect", "100,50,200,20", "--scale", "0.5", "--text", "x"], &pdf);

    let primitives = run_json(&["overlay", "--page", "1", "--scale", "0.25"], &pdf);

    assert_eq!(primitives[0]["primitive"], "fill_rect");
    assert_eq!(
        primitives[0]["rect"],
        serde_json::json!({"top": 50.0, "left": 25.0, "width": 100.0, "height": 10.0})
    );
}

#[test]
fn render_writes_png_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);
    let output_path = temp.path().join("page.png");

    run_json(&["highlight", "--page", "1", "--rect", "100,50,200,20", "--text", "x"], &pdf);

    cargo_bin_cmd!("pdfmark")
        .arg("render")
        .arg(&pdf)
        .args(["--page", "1", "--scale", "0.5"])
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("render should be a readable image").to_rgba8();
    assert_eq!((image.width(), image.height()), (300, 400));
    assert_ne!(image.get_pixel(60, 55).0, [255, 255, 255, 255]);
}

#[test]
fn config_file_is_validated() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), "paper.pdf", &[(600, 800)]);
    let config = temp.path().join("config.toml");
    fs::write(&config, "[viewer]\nmin_zoom = 3.0\nmax_zoom = 2.0\n").expect("write config");

    cargo_bin_cmd!("pdfmark")
        .arg("--config")
        .arg(&config)
        .arg("list")
        .arg(&pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid viewer configuration"));
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("pdfmark")
        .arg("info")
        .arg("definitely-missing.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("invalid.pdf");
    fs::write(&path, b"this is not a pdf").expect("write");

    cargo_bin_cmd!("pdfmark")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("encrypted-marker.pdf");
    fs::write(&path, b"%PDF-1.5\ntrailer << /Encrypt 5 0 R >>\n%%EOF\n").expect("write");

    cargo_bin_cmd!("pdfmark")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("pdfmark")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
