//! Renders a flat field list as an indented tree.
//!
//! ```text
//! - ApiVersionsResponse
//!   - Header
//!     - CorrelationID (7)
//!   - Body
//!     ❌ ErrorCode (35)
//! ```
//!
//! Intermediate nodes are synthesized from the paths, so the list must be in wire order.

use tracing::{debug, error};

use crate::field::Field;
use crate::field_path::FieldPath;

const INDENT: &str = "  ";

/// Tracks the last printed path and the indent it left behind.
struct TreeCursor {
    indent: usize,
    last_printed: FieldPath,
    lines: Vec<String>,
}

impl TreeCursor {
    fn new() -> Self {
        Self {
            indent: 0,
            last_printed: FieldPath::root(),
            lines: Vec::new(),
        }
    }

    fn push(&mut self, text: String) {
        self.lines.push(format!("{}{text}", INDENT.repeat(self.indent)));
    }

    /// Prints the intermediate nodes between the last printed path and `next`.
    fn lead_to(&mut self, next: &FieldPath) {
        loop {
            if next.is_root() || next.is_sibling_of(&self.last_printed) {
                return;
            }
            if next.is_descendant_of(&self.last_printed) {
                for node in self.last_printed.descendants_until(next) {
                    self.push(format!("- {}", node.last_segment()));
                    self.indent += 1;
                }
                return;
            }

            let common = next.common_ancestor(&self.last_printed);
            if common == *next {
                // `next` encloses the last printed path; print it where its own parent left off.
                self.indent = next.depth() - 1;
                self.last_printed = next.clone();
                return;
            }
            self.indent = common.depth();
            self.last_printed = common;
        }
    }

    fn leaf(&mut self, field: &Field) {
        self.lead_to(&field.path);
        self.push(format!("- {} ({})", field.path.last_segment(), field.value));
        self.last_printed = field.path.clone();
    }
}

pub struct FieldTreePrinter<'a> {
    fields: &'a [Field],
}

impl<'a> FieldTreePrinter<'a> {
    pub fn new(fields: &'a [Field]) -> Self {
        Self { fields }
    }

    /// Every field, one leaf per field.
    pub fn lines(&self) -> Vec<String> {
        let mut cursor = TreeCursor::new();
        for field in self.fields {
            cursor.leaf(field);
        }
        cursor.lines
    }

    /// Fields up to and including the failed one, which is marked with `❌`.
    ///
    /// # Panics
    ///
    /// Panics when `error_path` is not one of the fields.
    pub fn lines_for_field_assertion_error(&self, error_path: &FieldPath) -> Vec<String> {
        let mut cursor = TreeCursor::new();
        for field in self.fields {
            if field.path == *error_path {
                cursor.lead_to(&field.path);
                cursor.push(format!("❌ {} ({})", field.path.last_segment(), field.value));
                return cursor.lines;
            }
            cursor.leaf(field);
        }
        panic!("Internal Error: error field path '{error_path}' not found in the decoded fields");
    }

    /// Fields decoded before the failure, then the failed path marked with `❌`. A failure
    /// anchored at an already decoded field marks that field instead.
    pub fn lines_for_decode_error(&self, error_path: &FieldPath) -> Vec<String> {
        let mut cursor = TreeCursor::new();
        for field in self.fields {
            if field.path == *error_path {
                cursor.lead_to(&field.path);
                cursor.push(format!("❌ {} ({})", field.path.last_segment(), field.value));
                return cursor.lines;
            }
            cursor.leaf(field);
        }
        if !error_path.is_root() {
            cursor.lead_to(error_path);
            cursor.push(format!("❌ {} (Decode Error)", error_path.last_segment()));
        }
        cursor.lines
    }

    pub fn log_for_debug(&self) {
        for line in self.lines() {
            debug!("{line}");
        }
    }

    pub fn log_for_field_assertion_error(&self, error_path: &FieldPath) {
        for line in self.lines_for_field_assertion_error(error_path) {
            error!("{line}");
        }
    }

    pub fn log_for_decode_error(&self, error_path: &FieldPath) {
        for line in self.lines_for_decode_error(error_path) {
            error!("{line}");
        }
    }
}
