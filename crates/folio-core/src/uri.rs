// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document-tree URIs.
//
// A tree URI names a directory the user granted access to, plus optionally a
// document underneath it:
//
//   content://<authority>/tree/<tree-id>
//   content://<authority>/tree/<tree-id>/document/<document-id>
//
// Both ids are percent-encoded. Document ids start with the tree id, so the
// relative path of a document is whatever follows that prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

const SCHEME: &str = "content://";

/// A permission-scoped document-tree URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeUri {
    authority: String,
    tree_id: String,
    document_id: Option<String>,
}

impl TreeUri {
    /// URI of the root of a tree.
    pub fn root(authority: impl Into<String>, tree_id: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            tree_id: tree_id.into(),
            document_id: None,
        }
    }

    /// Parse a `content://` tree URI.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || FolioError::InvalidUri(input.to_owned());

        let rest = input.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (authority, rest) = rest.split_once('/').ok_or_else(invalid)?;
        let rest = rest.strip_prefix("tree/").ok_or_else(invalid)?;

        let (tree_enc, document_enc) = match rest.split_once('/') {
            Some((tree, tail)) => {
                let doc = tail.strip_prefix("document/").ok_or_else(invalid)?;
                (tree, Some(doc))
            }
            None => (rest, None),
        };

        if authority.is_empty() || tree_enc.is_empty() {
            return Err(invalid());
        }

        let tree_id = decode(tree_enc).ok_or_else(invalid)?;
        let document_id = match document_enc {
            Some(doc) if !doc.is_empty() => Some(decode(doc).ok_or_else(invalid)?),
            Some(_) => return Err(invalid()),
            None => None,
        };

        Ok(Self {
            authority: authority.to_owned(),
            tree_id,
            document_id,
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The tree path: identifies which granted root this URI belongs to.
    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    /// Document id; the tree root's own id when no document is named.
    pub fn document_id(&self) -> &str {
        self.document_id.as_deref().unwrap_or(&self.tree_id)
    }

    /// Path of the document relative to the tree root (empty for the root).
    pub fn relative_path(&self) -> &str {
        let doc = self.document_id();
        doc.strip_prefix(self.tree_id.as_str())
            .unwrap_or(doc)
            .trim_start_matches('/')
    }

    /// Display name of the named document.
    pub fn name(&self) -> &str {
        let doc = self.document_id();
        let cut = doc.rfind(|c: char| c == '/' || c == ':').map(|i| i + 1).unwrap_or(0);
        let name = &doc[cut..];
        if name.is_empty() { doc } else { name }
    }

    /// URI of a direct child of this document.
    pub fn child(&self, name: &str) -> Self {
        let parent = self.document_id();
        let document_id = if parent.ends_with(':') || parent.ends_with('/') {
            format!("{parent}{name}")
        } else {
            format!("{parent}/{name}")
        };
        Self {
            authority: self.authority.clone(),
            tree_id: self.tree_id.clone(),
            document_id: Some(document_id),
        }
    }

    /// Whether `other` names this document or something beneath it.
    pub fn contains(&self, other: &TreeUri) -> bool {
        if self.authority != other.authority || self.tree_id != other.tree_id {
            return false;
        }
        let mine = self.document_id();
        let theirs = other.document_id();
        theirs == mine
            || theirs
                .strip_prefix(mine)
                .is_some_and(|tail| mine.ends_with(':') || tail.starts_with('/'))
    }
}

impl fmt::Display for TreeUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/tree/{}", self.authority, encode(&self.tree_id))?;
        if let Some(doc) = &self.document_id {
            write!(f, "/document/{}", encode(doc))?;
        }
        Ok(())
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'~' | b'!' | b'*' | b'\'' | b'(' | b')')
}

fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
