//! Page-by-page reconstruction of a PDF into a fresh document.
//!
//! Only objects reachable from the pages (and the document info) are copied,
//! so unused objects, stale incremental-update revisions, and orphaned
//! streams are dropped along the way.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page-tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Build a new document holding every page of `source`, in order.
///
/// Returns the new document and the ids of its pages.
pub fn rebuild(source: &Document) -> Result<(Document, Vec<ObjectId>)> {
    let pages = source.get_pages();
    if pages.is_empty() {
        bail!("document has no pages");
    }

    let mut target = Document::with_version(source.version.clone());
    let pages_id = target.new_object_id();

    let mut copier = Copier::new(source, &mut target);
    // References back into the old page tree resolve to the new one.
    for &page_id in pages.values() {
        for ancestor in ancestors(source, page_id) {
            copier.map(ancestor, pages_id);
        }
    }

    // Pages get their ids up front so links between pages resolve to them
    // instead of queueing a plain copy.
    let kids: Vec<ObjectId> = pages.values().map(|&id| copier.reserve(id)).collect();
    for (&page_id, &new_id) in pages.values().zip(&kids) {
        copier.copy_page(page_id, new_id, pages_id)?;
    }

    let info = source
        .trailer
        .get(b"Info")
        .ok()
        .map(|info| copier.copy_object(info));
    copier.drain();

    let count = i64::try_from(kids.len())?;
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.iter().copied().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => Object::Integer(count),
        }),
    );

    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);
    if let Some(info) = info {
        target.trailer.set("Info", info);
    }

    Ok((target, kids))
}

/// Copies objects from one document into another, remembering which source
/// ids were already copied so shared objects stay shared.
///
/// Indirect objects are never copied recursively: a reference only reserves
/// the new id and queues the object, and [`Copier::drain`] copies the queue.
/// Stack depth therefore does not grow with reference chains (e.g. pages
/// linking to the next page).
struct Copier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    mapped: BTreeMap<ObjectId, ObjectId>,
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'a> Copier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            mapped: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    fn map(&mut self, from: ObjectId, to: ObjectId) {
        self.mapped.insert(from, to);
    }

    fn copy_page(&mut self, page_id: ObjectId, new_id: ObjectId, parent: ObjectId) -> Result<()> {
        let source = self.source;
        let page = source.get_dictionary(page_id)?;

        let mut copied = Dictionary::new();
        for (key, value) in page.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy_object(value));
        }
        for key in INHERITABLE {
            if copied.has(key) {
                continue;
            }
            if let Some(value) = inherited(source, page, key) {
                copied.set(key.to_vec(), self.copy_object(value));
            }
        }
        copied.set("Parent", parent);

        self.target.objects.insert(new_id, Object::Dictionary(copied));
        Ok(())
    }

    /// Copy a direct object, relinking the references inside it.
    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.copy_reference(*id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.copy_dictionary(&stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            copied.set(key.clone(), self.copy_object(value));
        }
        copied
    }

    /// New id for `id`, queueing the object for [`Copier::drain`] on first use.
    fn copy_reference(&mut self, id: ObjectId) -> ObjectId {
        if let Some(&mapped) = self.mapped.get(&id) {
            return mapped;
        }
        let new_id = self.reserve(id);
        self.pending.push((id, new_id));
        new_id
    }

    /// Copy every queued object, including whatever those objects reference.
    fn drain(&mut self) {
        let source = self.source;
        while let Some((from, to)) = self.pending.pop() {
            let copied = match source.get_object(from) {
                Ok(object) => self.copy_object(object),
                // Dangling references read as null.
                Err(_) => Object::Null,
            };
            self.target.objects.insert(to, copied);
        }
    }

    fn reserve(&mut self, id: ObjectId) -> ObjectId {
        if let Some(&mapped) = self.mapped.get(&id) {
            return mapped;
        }
        let new_id = self.target.new_object_id();
        self.mapped.insert(id, new_id);
        new_id
    }
}

/// Page-tree nodes above `page_id`, nearest first.
fn ancestors(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut found = Vec::new();
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let parent = doc
            .get_dictionary(current)
            .ok()
            .and_then(|node| node.get(b"Parent").ok())
            .and_then(|parent| parent.as_reference().ok());
        match parent {
            Some(parent) if !found.contains(&parent) => {
                found.push(parent);
                current = parent;
            }
            _ => break,
        }
    }
    found
}

/// Look up `key` on the nearest ancestor of `page` that defines it.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}
