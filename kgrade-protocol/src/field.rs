//! Decoded/encoded field records and the path-scope guard shared by the field codecs.

use std::ops::{Deref, DerefMut};

use crate::error::{CodecError, DecodeError};
use crate::field_path::FieldPath;
use crate::value::Value;

/// One value at one path, with the half-open byte range `[start_offset, end_offset)` it
/// occupies in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub path: FieldPath,
    pub value: Value,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Field {
    pub fn anchor(&self) -> FieldAnchor {
        FieldAnchor {
            path: self.path.clone(),
            start_offset: self.start_offset,
            end_offset: self.end_offset,
        }
    }
}

/// A remembered field location, used to report a failure that is only detected after the
/// field itself has been read (a CRC or a length prefix, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAnchor {
    pub path: FieldPath,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl FieldAnchor {
    pub fn error(self, kind: CodecError) -> DecodeError {
        DecodeError::new(self.path, self.start_offset, self.end_offset, kind)
    }
}

/// Something that keeps a stack of path segments.
pub trait PathStack {
    fn push_segment(&mut self, segment: String);
    fn pop_segment(&mut self);
}

/// Pushes a segment on creation and pops it when dropped, so every exit from a nested
/// scope, including early returns through `?`, leaves the path balanced.
#[derive(Debug)]
pub struct PathScope<'s, T: PathStack> {
    inner: &'s mut T,
}

impl<'s, T: PathStack> PathScope<'s, T> {
    pub fn new(inner: &'s mut T, segment: impl Into<String>) -> Self {
        inner.push_segment(segment.into());
        Self { inner }
    }
}

impl<T: PathStack> Deref for PathScope<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner
    }
}

impl<T: PathStack> DerefMut for PathScope<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner
    }
}

impl<T: PathStack> Drop for PathScope<'_, T> {
    fn drop(&mut self) {
        self.inner.pop_segment();
    }
}
