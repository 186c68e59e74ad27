//! PDF strategy: rebuild the document page by page, then compress.
//!
//! Rewriting alone drops everything the pages no longer reference; Flate
//! compression of page content streams is lossless. Nothing is rasterized
//! or resampled.

mod rebuild;

pub use rebuild::rebuild;

use std::path::Path;

use anyhow::{Context, Result, bail};
use lopdf::{Document, Object, ObjectId};

use crate::asset::AssetFormat;
use crate::debug;
use crate::replace::Transform;

/// Rebuild + compress a PDF.
#[derive(Debug, Clone, Copy)]
pub struct RebuildPdf {
    /// Also Flate-compress non-content streams (fonts, images without a filter).
    pub compress_all_streams: bool,
}

impl Transform for RebuildPdf {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn skip_reason(&self, source: &Path) -> Result<Option<String>> {
        Ok((AssetFormat::from_path(source) != Some(AssetFormat::Pdf)).then(|| "not a pdf".into()))
    }

    fn apply(&self, source: &Path, candidate: &Path) -> Result<()> {
        let original = Document::load(source)
            .with_context(|| format!("failed to parse {}", source.display()))?;
        ensure_not_encrypted(&original)?;

        let (mut doc, pages) = rebuild(&original)?;
        let compressed = compress_content_streams(&mut doc, &pages)?;
        debug!(
            "pdf";
            "{}: {} pages, {} content streams compressed",
            source.display(),
            pages.len(),
            compressed
        );

        if self.compress_all_streams {
            doc.compress();
        }

        doc.save(candidate)
            .with_context(|| format!("failed to write {}", candidate.display()))?;
        Ok(())
    }
}

/// Encrypted documents are left alone: rewriting would drop the encryption.
fn ensure_not_encrypted(doc: &Document) -> Result<()> {
    if doc.trailer.has(b"Encrypt") {
        bail!("encrypted documents are not rewritten");
    }
    Ok(())
}

/// Flate-compress the content streams of `pages` that carry no filter yet.
///
/// Returns how many streams ended up compressed. Streams too small to
/// benefit are left as they are.
pub fn compress_content_streams(doc: &mut Document, pages: &[ObjectId]) -> Result<usize> {
    let mut stream_ids = Vec::new();
    for &page_id in pages {
        let page = doc.get_dictionary(page_id)?;
        if let Ok(contents) = page.get(b"Contents") {
            collect_stream_ids(doc, contents, &mut stream_ids);
        }
    }

    let mut compressed = 0;
    for id in stream_ids {
        let Ok(Object::Stream(stream)) = doc.get_object_mut(id) else {
            continue;
        };
        if stream.dict.has(b"Filter") {
            continue;
        }
        stream.compress()?;
        if stream.dict.has(b"Filter") {
            compressed += 1;
        }
    }
    Ok(compressed)
}

/// `/Contents` is a stream reference or an array of them, possibly indirect.
fn collect_stream_ids(doc: &Document, contents: &Object, out: &mut Vec<ObjectId>) {
    match contents {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => {
                out.extend(items.iter().filter_map(|o| o.as_reference().ok()));
            }
            Ok(_) => out.push(*id),
            Err(_) => {}
        },
        Object::Array(items) => out.extend(items.iter().filter_map(|o| o.as_reference().ok())),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::{candidate_path, replace_if_smaller};
    use lopdf::{Stream, dictionary};
    use std::fs;
    use tempfile::TempDir;

    /// A document with uncompressed, repetitive page content, a form
    /// XObject, and an unreferenced stream, saved without any compression.
    fn bloated_pdf(page_count: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(100),
                    Object::Integer(100),
                ],
            },
            b"0 0 m 100 100 l S\n".repeat(500),
        ));

        let mut kids = Vec::new();
        for n in 0..page_count {
            let line = format!("BT /F1 12 Tf 72 720 Td (Brochure page {n}) Tj ET\n");
            let content_id = doc.add_object(Stream::new(dictionary! {}, line.repeat(200).into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(i64::try_from(page_count).unwrap()),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => dictionary! { "Fm1" => form_id },
                },
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        doc.add_object(Stream::new(dictionary! {}, vec![b'z'; 64 * 1024]));
        doc
    }

    fn write_bloated_pdf(path: &Path, page_count: usize) {
        bloated_pdf(page_count).save(path).unwrap();
    }

    /// Whether the form XObject in `doc` carries a filter.
    fn form_is_filtered(doc: &Document) -> bool {
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == b"Form")
            })
            .map(|s| s.dict.has(b"Filter"))
            .unwrap()
    }

    fn step() -> RebuildPdf {
        RebuildPdf {
            compress_all_streams: true,
        }
    }

    #[test]
    fn test_bloated_pdf_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brochure.pdf");
        write_bloated_pdf(&path, 10);

        let result = replace_if_smaller(&path, &step()).unwrap();

        assert!(result.replaced);
        assert!(result.final_size < result.original_size);
        assert!(!candidate_path(&path).exists());

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 10);
    }

    #[test]
    fn test_content_streams_get_flate_filter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brochure.pdf");
        write_bloated_pdf(&path, 2);

        let original = Document::load(&path).unwrap();
        let (mut doc, pages) = rebuild(&original).unwrap();
        assert_eq!(compress_content_streams(&mut doc, &pages).unwrap(), 2);

        for id in pages {
            let page = doc.get_dictionary(id).unwrap();
            let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
            let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
            let filter = stream.dict.get(b"Filter").unwrap().as_name().unwrap();
            assert_eq!(filter, b"FlateDecode");
        }
    }

    #[test]
    fn test_second_pass_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brochure.pdf");
        write_bloated_pdf(&path, 3);

        assert!(replace_if_smaller(&path, &step()).unwrap().replaced);
        let bytes = fs::read(&path).unwrap();
        assert!(!replace_if_smaller(&path, &step()).unwrap().replaced);
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_unparseable_pdf_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4 nothing else").unwrap();

        assert!(replace_if_smaller(&path, &step()).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 nothing else");
        assert!(!candidate_path(&path).exists());
    }

    #[test]
    fn test_encrypted_pdf_is_refused() {
        let mut doc = bloated_pdf(1);
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => Object::Integer(1),
            "R" => Object::Integer(2),
        });
        doc.trailer.set("Encrypt", encrypt_id);
        assert!(ensure_not_encrypted(&doc).is_err());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.pdf");
        doc.save(&path).unwrap();
        let bytes = fs::read(&path).unwrap();

        assert!(replace_if_smaller(&path, &step()).is_err());
        assert_eq!(fs::read(&path).unwrap(), bytes);
        assert!(!candidate_path(&path).exists());
    }

    #[test]
    fn test_other_streams_compressed_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brochure.pdf");
        write_bloated_pdf(&path, 2);
        let out = dir.path().join("out.pdf");

        let contents_only = RebuildPdf {
            compress_all_streams: false,
        };
        contents_only.apply(&path, &out).unwrap();
        let doc = Document::load(&out).unwrap();
        assert!(!form_is_filtered(&doc));
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
        let content = doc.get_object(content_id).unwrap().as_stream().unwrap();
        assert!(content.dict.has(b"Filter"));

        step().apply(&path, &out).unwrap();
        assert!(form_is_filtered(&Document::load(&out).unwrap()));
    }

    #[test]
    fn test_non_pdf_is_skipped() {
        assert_eq!(
            step().skip_reason(Path::new("logo.png")).unwrap().as_deref(),
            Some("not a pdf")
        );
        assert_eq!(step().skip_reason(Path::new("a/brochure.PDF")).unwrap(), None);
    }
}
