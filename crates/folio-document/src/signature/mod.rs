// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signature module: image fitting and appearance stream construction.

pub mod appearance;
pub mod fit;

pub use appearance::SignatureAppearance;
pub use fit::{AffineFit, Matrix2D, compute_fit};
