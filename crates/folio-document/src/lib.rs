// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document: Signature appearances for PDF form widgets.
//
// Provides the aspect-preserving image fit used to place a signature image in
// a widget rectangle, and builders that turn an image or hand-drawn ink into
// form XObjects attached to the widget's normal appearance.

pub mod signature;

// Re-export the primary items so callers can use `folio_document::compute_fit` etc.
pub use signature::appearance::{
    SignatureAppearance, SignatureWidget, apply_image_signature, apply_ink_signature,
    find_signature_widgets, widget_rect,
};
pub use signature::fit::{AffineFit, Matrix2D, Rect, compute_fit};
