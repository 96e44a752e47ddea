//! Word (.docx) to plain text.
//!
//! Reads the Office Open XML package and walks the WordprocessingML parts with
//! SAX-style events. Output order: headers, body, footers.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

const BODY_PART: &str = "word/document.xml";

/// Converts a `.docx` byte payload into plain text.
pub fn docx_to_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open document package: {e}"))?;

    let mut headers: Vec<String> = Vec::new();
    let mut footers: Vec<String> = Vec::new();
    for name in archive.file_names() {
        if is_part(name, "word/header") {
            headers.push(name.to_string());
        } else if is_part(name, "word/footer") {
            footers.push(name.to_string());
        }
    }
    headers.sort_by(|a, b| by_part_number(a, b));
    footers.sort_by(|a, b| by_part_number(a, b));

    let mut out = String::new();
    for name in &headers {
        out.push_str(&part_text(&mut archive, name)?);
    }
    out.push_str(&part_text(&mut archive, BODY_PART)?);
    for name in &footers {
        out.push_str(&part_text(&mut archive, name)?);
    }

    Ok(out)
}

/// Matches `word/header1.xml` style part names.
fn is_part(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix) && name.ends_with(".xml")
}

/// Orders `header2.xml` before `header10.xml`.
fn by_part_number(a: &str, b: &str) -> std::cmp::Ordering {
    (part_number(a), a).cmp(&(part_number(b), b))
}

/// Trailing digits of the part name, e.g. 10 for `word/footer10.xml`.
fn part_number(name: &str) -> Option<u32> {
    name.trim_end_matches(".xml")
        .rsplit(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

fn part_text<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<String, String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| format!("Missing document part {name}: {e}"))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| format!("Failed to read document part {name}: {e}"))?;
    wordml_to_text(&xml)
}

/// Collects run text from a WordprocessingML part.
///
/// Only `<w:t>` content is kept; field codes and other markup are dropped.
/// Paragraph ends and `<w:br/>`/`<w:cr/>` become newlines, `<w:tab/>` a tab.
fn wordml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| format!("Invalid text in document: {err}"))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "Malformed document XML at position {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(out)
}

/// Builds a minimal `.docx` package for tests.
#[cfg(test)]
pub(crate) fn build_docx(body: &str, header: Option<&str>) -> Vec<u8> {
    match header {
        Some(header) => build_docx_with_parts(body, &[("word/header1.xml", header)]),
        None => build_docx_with_parts(body, &[]),
    }
}

/// Like `build_docx`, with extra named parts written in the given order.
#[cfg(test)]
pub(crate) fn build_docx_with_parts(body: &str, parts: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file(BODY_PART, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        for (name, xml) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}
