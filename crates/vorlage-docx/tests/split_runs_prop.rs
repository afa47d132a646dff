use std::io::{Cursor, Write};

use proptest::prelude::*;
use zip::write::FileOptions;
use zip::ZipWriter;

use vorlage_docx::{extract_paragraph_texts, patch_document, ReplacementRule};

const PLACEHOLDER: &str = "Mitterand Straße 35";

fn docx_with_runs(runs: &[String]) -> Vec<u8> {
    let runs: String = runs
        .iter()
        .map(|text| format!(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p>{runs}</w:p></w:body></w:document>"#
    );
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", FileOptions::<()>::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Split `text` into runs wherever `cuts[i]` is set (a cut after the i-th character).
fn split_at_cuts(text: &str, cuts: &[bool]) -> Vec<String> {
    let mut runs = vec![String::new()];
    for (i, ch) in text.chars().enumerate() {
        if let Some(last) = runs.last_mut() {
            last.push(ch);
        }
        if cuts.get(i).copied().unwrap_or(false) {
            runs.push(String::new());
        }
    }
    runs.retain(|run| !run.is_empty());
    runs
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn placeholder_matches_however_word_splits_it(
        prefix in "[A-Za-z ,:]{0,12}",
        suffix in "[A-Za-z ,:]{0,12}",
        cuts in proptest::collection::vec(any::<bool>(), 64),
    ) {
        let text = format!("{prefix}{PLACEHOLDER}{suffix}");
        let runs = split_at_cuts(&text, &cuts);
        let docx = docx_with_runs(&runs);

        let rules = [ReplacementRule::new(PLACEHOLDER, "Hauptstraße 12").unwrap()];
        let patched = patch_document(&docx, &rules).unwrap();

        prop_assert_eq!(
            extract_paragraph_texts(&patched).unwrap(),
            vec![format!("{prefix}Hauptstraße 12{suffix}")]
        );
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..=2048)
    ) {
        let rules = [ReplacementRule::new("a", "b").unwrap()];
        let result = std::panic::catch_unwind(|| patch_document(&bytes, &rules));
        prop_assert!(result.is_ok(), "patch_document panicked");
    }
}
