// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature appearance builder: form XObjects for signature widgets using
// `lopdf`.
//
// Two appearance flavours exist: a raster signature image fitted into the
// widget (see `fit.rs`), and hand-drawn ink strokes. Both produce an inner
// form holding the drawing and an outer form that places it; the outer form
// becomes the widget's normal appearance (`/AP << /N ... >>`).

use std::io::Cursor;

use folio_core::error::{FolioError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info, instrument, warn};

use super::fit::{AffineFit, Rect, compute_fit};

/// Resource name of the signature image inside the inner form.
const IMAGE_RESOURCE: &str = "Im0";
/// Resource name of the inner form inside the outer form.
const FORM_RESOURCE: &str = "Fm0";
/// How far up the `/Parent` chain a field type is searched for.
const MAX_FIELD_DEPTH: usize = 16;

/// A signature widget annotation found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureWidget {
    pub id: ObjectId,
    pub rect: Rect,
    /// Fully qualified field name, if the field has one.
    pub field_name: Option<String>,
}

/// The form XObjects making up one signature appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureAppearance {
    /// Outer form; this is what the widget's `/AP /N` points to.
    pub form: ObjectId,
    /// Inner form holding the actual drawing.
    pub content_form: ObjectId,
    /// BBox shared by both forms.
    pub bbox: Rect,
    /// Fit used for image appearances.
    pub fit: Option<AffineFit>,
}

impl SignatureAppearance {
    // -- Image appearance -----------------------------------------------------

    /// Build an appearance that draws `image_bytes` centred in `widget_rect`
    /// with its aspect ratio preserved.
    #[instrument(skip(doc, image_bytes), fields(bytes_len = image_bytes.len()))]
    pub fn from_image(doc: &mut Document, widget_rect: Rect, image_bytes: &[u8]) -> Result<Self> {
        let decoded = ::image::load_from_memory(image_bytes).map_err(|err| {
            FolioError::ImageError(format!("failed to decode signature image: {err}"))
        })?;
        let (width, height) = (decoded.width(), decoded.height());

        let fit = compute_fit(
            widget_rect.width(),
            widget_rect.height(),
            f64::from(width),
            f64::from(height),
        )?;

        let image_id = add_image_xobject(doc, &decoded)?;

        let bbox = Rect::from_corners(0.0, 0.0, f64::from(width), f64::from(height));
        let m = fit.matrix();
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", m.to_array().iter().map(|v| real(*v)).collect()),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];
        let resources = dictionary! {
            "XObject" => dictionary! { IMAGE_RESOURCE => Object::Reference(image_id) },
        };
        let content_form = add_form(doc, bbox, resources, operations)?;
        let form = add_placing_form(doc, bbox, content_form)?;

        info!(
            width,
            height,
            width_adjust = fit.width_adjust,
            height_adjust = fit.height_adjust,
            "Signature image appearance built"
        );

        Ok(Self {
            form,
            content_form,
            bbox,
            fit: Some(fit),
        })
    }

    // -- Ink appearance -------------------------------------------------------

    /// Build an appearance from hand-drawn strokes given in widget space
    /// (origin at the widget's lower-left corner).
    ///
    /// Strokes are drawn red, one unit wide, with round caps and joins.
    #[instrument(skip(doc, strokes), fields(strokes = strokes.len()))]
    pub fn from_ink(doc: &mut Document, widget_rect: Rect, strokes: &[Vec<(f64, f64)>]) -> Result<Self> {
        let (width, height) = (widget_rect.width(), widget_rect.height());
        if width <= 0.0 || height <= 0.0 {
            return Err(FolioError::DegenerateInput(format!(
                "widget rectangle is {width}x{height}"
            )));
        }
        if strokes.iter().all(|s| s.is_empty()) {
            return Err(FolioError::EmptyInk);
        }

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("RG", vec![real(1.0), real(0.0), real(0.0)]),
            Operation::new("w", vec![real(1.0)]),
            Operation::new("J", vec![Object::Integer(1)]),
            Operation::new("j", vec![Object::Integer(1)]),
        ];
        for stroke in strokes {
            let mut points = stroke.iter();
            let Some(&(x, y)) = points.next() else {
                continue;
            };
            operations.push(Operation::new("m", vec![real(x), real(y)]));
            for &(x, y) in points {
                operations.push(Operation::new("l", vec![real(x), real(y)]));
            }
        }
        operations.push(Operation::new("S", vec![]));
        operations.push(Operation::new("Q", vec![]));

        let bbox = Rect::from_corners(0.0, 0.0, width, height);
        let content_form = add_form(doc, bbox, Dictionary::new(), operations)?;
        let form = add_placing_form(doc, bbox, content_form)?;

        debug!(form = ?form, "Ink appearance built");

        Ok(Self {
            form,
            content_form,
            bbox,
            fit: None,
        })
    }

    // -- Widget binding -------------------------------------------------------

    /// Make this appearance the normal appearance of `widget_id`.
    pub fn apply_to_widget(&self, doc: &mut Document, widget_id: ObjectId) -> Result<()> {
        let widget = doc
            .get_object_mut(widget_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| pdf_err(format!("widget {widget_id:?}: {err}")))?;
        widget.set("AP", dictionary! { "N" => Object::Reference(self.form) });
        info!(widget = ?widget_id, form = ?self.form, "Appearance applied to widget");
        Ok(())
    }
}

/// Fit `image_bytes` into the widget and install it as the widget appearance.
pub fn apply_image_signature(
    doc: &mut Document,
    widget_id: ObjectId,
    image_bytes: &[u8],
) -> Result<SignatureAppearance> {
    let rect = widget_rect(doc, widget_id)?;
    let appearance = SignatureAppearance::from_image(doc, rect, image_bytes)?;
    appearance.apply_to_widget(doc, widget_id)?;
    Ok(appearance)
}

/// Install hand-drawn strokes as the widget appearance.
pub fn apply_ink_signature(
    doc: &mut Document,
    widget_id: ObjectId,
    strokes: &[Vec<(f64, f64)>],
) -> Result<SignatureAppearance> {
    let rect = widget_rect(doc, widget_id)?;
    let appearance = SignatureAppearance::from_ink(doc, rect, strokes)?;
    appearance.apply_to_widget(doc, widget_id)?;
    Ok(appearance)
}

// -- Widget lookup ------------------------------------------------------------

/// Read and normalise the `/Rect` of an annotation.
pub fn widget_rect(doc: &Document, widget_id: ObjectId) -> Result<Rect> {
    let dict = doc
        .get_object(widget_id)
        .and_then(Object::as_dict)
        .map_err(|err| pdf_err(format!("widget {widget_id:?}: {err}")))?;
    rect_of(doc, dict).ok_or_else(|| pdf_err(format!("widget {widget_id:?} has no usable /Rect")))
}

/// All widget annotations belonging to signature (`/FT /Sig`) fields.
#[instrument(skip(doc))]
pub fn find_signature_widgets(doc: &Document) -> Vec<SignatureWidget> {
    let mut widgets = Vec::new();
    for (&id, object) in &doc.objects {
        let Ok(dict) = object.as_dict() else {
            continue;
        };
        if name_of(dict, b"Subtype") != Some(b"Widget".as_slice()) {
            continue;
        }
        if inherited_field_type(doc, dict).as_deref() != Some(b"Sig".as_slice()) {
            continue;
        }
        match rect_of(doc, dict) {
            Some(rect) => widgets.push(SignatureWidget {
                id,
                rect,
                field_name: field_name(doc, dict),
            }),
            None => warn!(widget = ?id, "signature widget without /Rect skipped"),
        }
    }
    debug!(count = widgets.len(), "Signature widgets found");
    widgets
}

// -- Object helpers -----------------------------------------------------------

fn pdf_err(msg: String) -> FolioError {
    FolioError::PdfError(msg)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key).ok().and_then(|o| o.as_name().ok())
}

fn rect_of(doc: &Document, dict: &Dictionary) -> Option<Rect> {
    let array = resolve(doc, dict.get(b"Rect").ok()?)?.as_array().ok()?;
    let coords: Vec<f64> = array
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    match coords.as_slice() {
        [x1, y1, x2, y2] => Some(Rect::from_corners(*x1, *y1, *x2, *y2)),
        _ => None,
    }
}

fn parent_of<'a>(doc: &'a Document, dict: &Dictionary) -> Option<&'a Dictionary> {
    match dict.get(b"Parent").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn inherited_field_type(doc: &Document, dict: &Dictionary) -> Option<Vec<u8>> {
    let mut current = dict;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Some(ft) = name_of(current, b"FT") {
            return Some(ft.to_vec());
        }
        current = parent_of(doc, current)?;
    }
    None
}

fn field_name(doc: &Document, dict: &Dictionary) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(dict);
    let mut depth = 0;
    while let Some(d) = current {
        if depth == MAX_FIELD_DEPTH {
            break;
        }
        if let Ok(Object::String(bytes, _)) = d.get(b"T") {
            parts.push(String::from_utf8_lossy(bytes).into_owned());
        }
        current = parent_of(doc, d);
        depth += 1;
    }
    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

fn bbox_array(bbox: Rect) -> Object {
    Object::Array(vec![
        real(bbox.llx),
        real(bbox.lly),
        real(bbox.urx),
        real(bbox.ury),
    ])
}

fn add_form(
    doc: &mut Document,
    bbox: Rect,
    resources: Dictionary,
    operations: Vec<Operation>,
) -> Result<ObjectId> {
    let content = Content { operations }
        .encode()
        .map_err(|err| pdf_err(format!("failed to encode appearance content: {err}")))?;
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => bbox_array(bbox),
        "Resources" => resources,
    };
    Ok(doc.add_object(Stream::new(dict, content)))
}

fn add_placing_form(doc: &mut Document, bbox: Rect, inner: ObjectId) -> Result<ObjectId> {
    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new("Do", vec![Object::Name(FORM_RESOURCE.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ];
    let resources = dictionary! {
        "XObject" => dictionary! { FORM_RESOURCE => Object::Reference(inner) },
    };
    add_form(doc, bbox, resources, operations)
}

/// Add the decoded image as a Flate-compressed DeviceRGB image XObject, with
/// a soft mask when the image carries alpha.
fn add_image_xobject(doc: &mut Document, image: &::image::DynamicImage) -> Result<ObjectId> {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if image.color().has_alpha() {
        let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mask_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        let mask_id = add_compressed(doc, mask_dict, alpha)?;
        dict.set("SMask", Object::Reference(mask_id));
    }

    add_compressed(doc, dict, image.to_rgb8().into_raw())
}

fn add_compressed(doc: &mut Document, dict: Dictionary, data: Vec<u8>) -> Result<ObjectId> {
    let mut stream = Stream::new(dict, data);
    stream
        .compress()
        .map_err(|err| pdf_err(format!("failed to compress image data: {err}")))?;
    Ok(doc.add_object(stream))
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &::image::DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ::image::ImageFormat::Png)
        .map_err(|err| FolioError::ImageError(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}
