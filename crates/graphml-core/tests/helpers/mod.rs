#![allow(dead_code)]

use quick_xml::{
    Reader, Writer,
    events::{BytesText, Event},
};
use std::{
    env, fs,
    path::{Component, Path, PathBuf},
};

/// Re-indents a GraphML document so that two documents compare equal when
/// they differ only in layout: the declaration, comments and whitespace-only
/// text are dropped, text is trimmed and `<a/>` is written as `<a></a>`.
pub fn canonical_xml(content: &str) -> String {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .unwrap_or_else(|err| panic!("Failed to read XML: {err}"));
        let result = match event {
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => Ok(()),
            Event::Text(text) => {
                let text = text.decode().expect("text must be UTF-8");
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Ok(())
                } else {
                    writer.write_event(Event::Text(BytesText::from_escaped(trimmed.to_string())))
                }
            }
            Event::Empty(start) => {
                let end = start.to_end().into_owned();
                writer
                    .write_event(Event::Start(start))
                    .and_then(|_| writer.write_event(Event::End(end)))
            }
            e => writer.write_event(e),
        };
        result.unwrap_or_else(|err| panic!("Failed to write XML: {err}"));
        buf.clear();
    }
    String::from_utf8(writer.into_inner()).expect("canonical XML must be UTF-8")
}

pub fn fixtures_root() -> PathBuf {
    // CARGO_MANIFEST_DIR = crates/graphml-core
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent() // crates/
        .and_then(|p| p.parent()) // repo root
        .unwrap_or(&manifest_dir)
        .join("fixtures")
}

pub fn corpus_dir() -> PathBuf {
    fixtures_root().join("corpus")
}

pub fn expected_dir() -> PathBuf {
    fixtures_root().join("expected")
}

pub fn rel_fixture_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn is_update_enabled() -> bool {
    match env::var("UPDATE_EXPECTED") {
        Ok(v) => !v.trim().is_empty() && v != "0" && v.to_lowercase() != "false",
        Err(_) => false,
    }
}

pub fn read_to_string(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

pub fn write_string(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create dir {}: {e}", parent.display()));
    }
    fs::write(path, contents).unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
}
