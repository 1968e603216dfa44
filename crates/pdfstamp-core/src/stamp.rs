//! Signature overlay onto the last page of an existing PDF.
//!
//! The algorithm:
//! 1. Load the document and decode the PNG signature
//! 2. Select the last page of the page tree
//! 3. Embed the image as an XObject and register it in the page resources
//! 4. Append a content stream drawing the image at a fixed offset from the
//!    page center
//! 5. Serialize the mutated document

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::StampError;
use crate::image::SignatureImage;

/// Display size of the signature relative to its native pixel dimensions.
pub const SIGNATURE_SCALE: f64 = 0.5;

/// Horizontal offset from the page center, in PDF points.
pub const X_CENTER_OFFSET: f64 = 150.0;

/// Vertical offset below the page center, in PDF points.
pub const Y_BASELINE_OFFSET: f64 = 10.0;

/// Resource name under which the signature XObject is registered.
const XOBJECT_NAME: &str = "SigStamp";

/// Lower-left corner of the signature for a page and a scaled image.
///
/// `x` centers the image horizontally then shifts it right; `y` hangs the
/// full image height below the vertical center.
pub fn placement(
    page_width: f64,
    page_height: f64,
    image_width: f64,
    image_height: f64,
) -> (f64, f64) {
    (
        page_width / 2.0 - image_width / 2.0 + X_CENTER_OFFSET,
        page_height / 2.0 - image_height - Y_BASELINE_OFFSET,
    )
}

/// Overlay `png` onto the last page of `pdf` and return the signed document.
///
/// The page count is preserved; only the last page's `/Contents` and
/// `/Resources` are touched.
pub fn overlay_signature(pdf: &[u8], png: &[u8]) -> Result<Vec<u8>, StampError> {
    let mut doc =
        Document::load_mem(pdf).map_err(|e| StampError::MalformedPdf(e.to_string()))?;
    let image = SignatureImage::decode(png)?;

    let pages = doc.get_pages();
    let (_, &page_id) = pages.iter().next_back().ok_or(StampError::NoPages)?;

    let media_box = media_box(&doc, page_id);
    let page_width = f64::from(media_box[2] - media_box[0]);
    let page_height = f64::from(media_box[3] - media_box[1]);

    let (width, height) = image.scaled(SIGNATURE_SCALE);
    let (x, y) = placement(page_width, page_height, width, height);

    let image_id = image.add_to_document(&mut doc)?;
    register_xobject(&mut doc, page_id, image_id)?;
    append_draw_content(&mut doc, page_id, x, y, width, height)?;

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| StampError::SaveFailed(e.to_string()))?;
    Ok(buffer)
}

/// Parse PDF bytes and return page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, StampError> {
    let doc = Document::load_mem(bytes).map_err(|e| StampError::MalformedPdf(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Resolve the page MediaBox, walking up the Pages tree for inherited
/// boxes with a depth limit against malformed parent cycles.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

    let mut current = doc.get_object(page_id).ok();
    for _ in 0..10 {
        let dict = match current {
            Some(Object::Dictionary(dict)) => dict,
            _ => break,
        };

        if let Ok(media_box_obj) = dict.get(b"MediaBox") {
            let arr = match media_box_obj {
                Object::Array(arr) => Some(arr),
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Array(arr)) => Some(arr),
                    _ => None,
                },
                _ => None,
            };
            if let Some(arr) = arr {
                let values: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| match o {
                        Object::Integer(i) => Some(*i as f32),
                        Object::Real(r) => Some(*r),
                        _ => None,
                    })
                    .collect();
                if values.len() == 4 {
                    return [values[0], values[1], values[2], values[3]];
                }
            }
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_object(*parent_id).ok(),
            _ => break,
        };
    }

    LETTER
}

/// Register `image_id` under the page's `/Resources /XObject` dictionary,
/// handling inline, referenced, and absent resource dictionaries.
fn register_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    image_id: ObjectId,
) -> Result<(), StampError> {
    let resources = page_resources_mut(doc, page_id)?;

    // The XObject entry itself may also be an indirect reference.
    let xobjects_ref = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let xobjects = match xobjects_ref {
        Some(id) => match doc.get_object_mut(id) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => {
                return Err(StampError::MalformedPdf(
                    "page XObject entry is not a dictionary".into(),
                ))
            }
        },
        None => {
            let resources = page_resources_mut(doc, page_id)?;
            if !matches!(resources.get(b"XObject"), Ok(Object::Dictionary(_))) {
                resources.set("XObject", Object::Dictionary(Dictionary::new()));
            }
            match resources.get_mut(b"XObject") {
                Ok(Object::Dictionary(dict)) => dict,
                _ => {
                    return Err(StampError::MalformedPdf(
                        "page XObject entry is not a dictionary".into(),
                    ))
                }
            }
        }
    };

    xobjects.set(XOBJECT_NAME, Object::Reference(image_id));
    Ok(())
}

/// Get a mutable handle to the page's resource dictionary, creating an
/// inline one when the page has none.
///
/// A page without its own `/Resources` may inherit one from the Pages
/// tree, and an own entry replaces the inherited one entirely. The new
/// inline dictionary therefore starts as a clone of the inherited
/// entries, keeping the existing content's font and XObject lookups
/// valid.
fn page_resources_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
) -> Result<&'a mut Dictionary, StampError> {
    let resources_ref = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(id) = resources_ref {
        return match doc.get_object_mut(id) {
            Ok(Object::Dictionary(dict)) => Ok(dict),
            _ => Err(StampError::MalformedPdf(
                "page Resources reference is not a dictionary".into(),
            )),
        };
    }

    let inherited = {
        let page = page_dict(doc, page_id)?;
        if matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
            None
        } else {
            Some(inherited_resources(doc, page_id).unwrap_or_else(Dictionary::new))
        }
    };

    let page = page_dict_mut(doc, page_id)?;
    if let Some(inherited) = inherited {
        page.set("Resources", Object::Dictionary(inherited));
    }
    match page.get_mut(b"Resources") {
        Ok(Object::Dictionary(dict)) => Ok(dict),
        _ => Err(StampError::MalformedPdf(
            "page Resources entry is not a dictionary".into(),
        )),
    }
}

/// Find the `/Resources` a page would inherit, walking up the Pages tree
/// with the same depth limit as the MediaBox lookup.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = doc.get_object(page_id).ok();
    for _ in 0..10 {
        let dict = match current {
            Some(Object::Dictionary(dict)) => dict,
            _ => break,
        };

        match dict.get(b"Resources") {
            Ok(Object::Dictionary(resources)) => return Some(resources.clone()),
            Ok(Object::Reference(id)) => {
                if let Ok(Object::Dictionary(resources)) = doc.get_object(*id) {
                    return Some(resources.clone());
                }
            }
            _ => {}
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_object(*parent_id).ok(),
            _ => break,
        };
    }

    None
}

fn page_dict<'a>(doc: &'a Document, page_id: ObjectId) -> Result<&'a Dictionary, StampError> {
    doc.get_object(page_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .ok_or_else(|| StampError::MalformedPdf("page object is not a dictionary".into()))
}

fn page_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
) -> Result<&'a mut Dictionary, StampError> {
    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(dict)) => Ok(dict),
        _ => Err(StampError::MalformedPdf(
            "page object is not a dictionary".into(),
        )),
    }
}

/// Append a content stream drawing the signature XObject at `(x, y)` with
/// the given display size.
///
/// Existing page content is wrapped in its own graphics-state push/pop so
/// a transform or `q` the original content leaves open cannot compound
/// into the signature draw. A `/Contents` that is a reference to an array
/// object is resolved first, keeping the result a flat array.
fn append_draw_content(
    doc: &mut Document,
    page_id: ObjectId,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Result<(), StampError> {
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![XOBJECT_NAME.into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| StampError::SaveFailed(format!("failed to encode content stream: {e}")))?;

    let existing: Vec<Object> = {
        let page = page_dict(doc, page_id)?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };

    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), encoded)));

    let contents = if existing.is_empty() {
        Object::Reference(content_id)
    } else {
        let push_id =
            doc.add_object(Object::Stream(Stream::new(Dictionary::new(), b"q\n".to_vec())));
        let pop_id =
            doc.add_object(Object::Stream(Stream::new(Dictionary::new(), b"\nQ\n".to_vec())));

        let mut arr = Vec::with_capacity(existing.len() + 3);
        arr.push(Object::Reference(push_id));
        arr.extend(existing);
        arr.push(Object::Reference(pop_id));
        arr.push(Object::Reference(content_id));
        Object::Array(arr)
    };

    let page = page_dict_mut(doc, page_id)?;
    page.set("Contents", contents);
    Ok(())
}
