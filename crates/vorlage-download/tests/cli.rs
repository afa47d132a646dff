use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use zip::write::FileOptions;
use zip::ZipWriter;

use vorlage_docx::extract_paragraph_texts;

const SETTINGS: &str = r#"{
  "source": {"companyName": "Frankenberg", "street": "Mitterand Straße 35"},
  "ruleOrder": "longest-first"
}"#;

fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|text| format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", FileOptions::<()>::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

fn write(dir: &Path, name: &str, contents: impl AsRef<[u8]>) {
    std::fs::write(dir.join(name), contents).expect("write fixture");
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vorlage"))
        .arg("--settings")
        .arg(dir.join("vorlage.json"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run vorlage")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected exit 0\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

#[test]
fn personalize_writes_one_file_per_company() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "vorlage.json", SETTINGS);
    std::fs::create_dir_all(dir.path().join("store/vorlagen")).unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    write(
        &dir.path().join("store/vorlagen"),
        "gbu.docx",
        docx(&["Firma Frankenberg", "Mitterand Straße 35"]),
    );
    write(
        dir.path(),
        "template.json",
        r#"{"id": "gbu", "version": 3, "title": "Gefährdungsbeurteilung", "fileType": "docx", "storagePath": "vorlagen/gbu.docx"}"#,
    );
    write(
        dir.path(),
        "acme.json",
        r#"{"id": "c-1", "name": "Acme GmbH", "street": "Industriering 4"}"#,
    );
    write(
        dir.path(),
        "beta.json",
        r#"{"id": "c-2", "name": "Beta AG", "street": "Hafenweg 1"}"#,
    );

    let output = run(
        dir.path(),
        &[
            "personalize",
            "--root",
            "store",
            "--template",
            "template.json",
            "--company",
            "acme.json",
            "--company",
            "beta.json",
            "--out-dir",
            "out",
        ],
    );
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2, "{stdout}");
    assert!(
        stdout.contains("Gefährdungsbeurteilung - Acme GmbH.docx (application/vnd.openxmlformats-officedocument.wordprocessingml.document)"),
        "{stdout}"
    );

    let acme = std::fs::read(dir.path().join("out/Gefährdungsbeurteilung - Acme GmbH.docx"))
        .expect("read acme download");
    assert_eq!(
        extract_paragraph_texts(&acme).unwrap(),
        vec!["Firma Acme GmbH".to_string(), "Industriering 4".to_string()]
    );
    let beta = std::fs::read(dir.path().join("out/Gefährdungsbeurteilung - Beta AG.docx"))
        .expect("read beta download");
    assert_eq!(
        extract_paragraph_texts(&beta).unwrap(),
        vec!["Firma Beta AG".to_string(), "Hafenweg 1".to_string()]
    );
}

#[test]
fn personalize_fails_for_missing_template_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "vorlage.json", SETTINGS);
    write(
        dir.path(),
        "template.json",
        r#"{"id": "gbu", "title": "Plan", "fileType": "docx", "storagePath": "gone.docx"}"#,
    );
    write(dir.path(), "acme.json", r#"{"id": "c-1", "name": "Acme"}"#);

    let output = run(
        dir.path(),
        &[
            "personalize",
            "--root",
            ".",
            "--template",
            "template.json",
            "--company",
            "acme.json",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gone.docx"), "{stderr}");
}

#[test]
fn rules_prints_the_ordered_rule_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "vorlage.json", SETTINGS);
    write(
        dir.path(),
        "acme.json",
        r#"{"id": "c-1", "name": "Acme GmbH", "street": "Industriering 4"}"#,
    );

    let output = run(dir.path(), &["rules", "--company", "acme.json"]);
    assert_success(&output);

    let rules: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("rules are printed as JSON");
    assert_eq!(
        rules,
        serde_json::json!([
            {"find": "Mitterand Straße 35", "replace": "Industriering 4"},
            {"find": "Frankenberg", "replace": "Acme GmbH"},
        ])
    );
}

#[test]
fn inspect_prints_paragraph_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "gbu.docx", docx(&["Firma Frankenberg", "Mitterand Straße 35"]));

    let output = run(dir.path(), &["inspect", "gbu.docx"]);
    assert_success(&output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Firma Frankenberg\nMitterand Straße 35\n"
    );
}

#[test]
fn inspect_rejects_non_docx_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "plan.pdf", b"%PDF-1.7");

    let output = run(dir.path(), &["inspect", "plan.pdf"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a DOCX file"), "{stderr}");
}
