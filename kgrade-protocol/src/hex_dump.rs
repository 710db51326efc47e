//! Hex dumps that point at a byte or byte range.
//!
//! ```text
//! Hex (bytes 0-11)                                | ASCII
//! ------------------------------------------------+------------------
//! 48 65 6c 6c 6f 20 57 6f 72 6c 64 21             | Hello World!
//!              ^--------^                               ^--^
//! ```

use std::fmt::Write;

const BYTES_PER_ROW: usize = 16;
const HEX_COLUMN_WIDTH: usize = BYTES_PER_ROW * 3;
const ASCII_COLUMN_WIDTH: usize = BYTES_PER_ROW + 2;
/// Column of the first ASCII character: the hex column plus `"| "`.
const ASCII_START: usize = HEX_COLUMN_WIDTH + 2;
/// Bytes shown before the highlighted offset when truncating.
const CONTEXT_BEFORE: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct InspectableHexDump<'a> {
    bytes: &'a [u8],
    /// Absolute index of `bytes[0]` in the original buffer.
    start_index: usize,
}

impl<'a> InspectableHexDump<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            start_index: 0,
        }
    }

    /// A single-row window starting a few bytes before `offset`.
    pub fn truncate_around_offset(&self, offset: usize) -> Self {
        let start = offset.saturating_sub(CONTEXT_BEFORE).min(self.bytes.len());
        let end = (start + BYTES_PER_ROW).min(self.bytes.len());
        Self {
            bytes: &self.bytes[start..end],
            start_index: self.start_index + start,
        }
    }

    /// Rows of `xx xx .. | ascii`, 16 bytes per row, the last row padded.
    pub fn formatted_string(&self) -> String {
        let rows: Vec<String> = self
            .bytes
            .chunks(BYTES_PER_ROW)
            .map(|chunk| {
                let mut hex = String::with_capacity(HEX_COLUMN_WIDTH);
                let mut ascii = String::with_capacity(BYTES_PER_ROW);
                for b in chunk {
                    let _ = write!(hex, "{b:02x} ");
                    ascii.push(if (32..=126).contains(b) { *b as char } else { '.' });
                }
                hex.push_str(&"   ".repeat(BYTES_PER_ROW - chunk.len()));
                format!("{hex}| {ascii}")
            })
            .collect();
        rows.join("\n")
    }

    pub fn formatted_string_with_heading(&self) -> String {
        let last_index = (self.start_index + self.bytes.len()).saturating_sub(1);
        let heading = format!("Hex (bytes {}-{})", self.start_index, last_index);
        format!(
            "{heading:<width$}| ASCII\n{}+{}\n{}",
            "-".repeat(HEX_COLUMN_WIDTH),
            "-".repeat(ASCII_COLUMN_WIDTH),
            self.formatted_string(),
            width = HEX_COLUMN_WIDTH,
        )
    }

    pub fn format_with_highlighted_offset(&self, offset: usize) -> String {
        self.format_with_highlighted_range(offset, offset)
    }

    /// Truncates around `start` and draws `^---^` under `start..=end` in both columns.
    /// An `end` beyond the window is clamped to its last byte.
    pub fn format_with_highlighted_range(&self, start: usize, end: usize) -> String {
        let window = self.truncate_around_offset(start);
        let rel_start = start - window.start_index;
        let rel_end = (end.max(start) - window.start_index)
            .min(window.bytes.len().saturating_sub(1))
            .max(rel_start);

        let mut pointer = String::new();
        draw_marker(&mut pointer, rel_start * 3 + 1, rel_end * 3 + 1);
        draw_marker(&mut pointer, ASCII_START + rel_start, ASCII_START + rel_end);

        format!("{}\n{pointer}", window.formatted_string_with_heading())
    }
}

/// Pads `line` to `from`, then draws `^`, or `^--^` when `to > from`.
fn draw_marker(line: &mut String, from: usize, to: usize) {
    let padding = from.saturating_sub(line.len());
    line.push_str(&" ".repeat(padding));
    line.push('^');
    if to > from {
        line.push_str(&"-".repeat(to - from - 1));
        line.push('^');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEPARATOR: &str = "------------------------------------------------+------------------";

    #[test]
    fn test_highlighted_offset() {
        let cases: [(&[u8], usize, &str, &str); 3] = [
            (
                b"Hello World!",
                5,
                "Hex (bytes 0-11)                                | ASCII",
                "48 65 6c 6c 6f 20 57 6f 72 6c 64 21             | Hello World!",
            ),
            (
                b"Helllo Earth & Moooon!",
                10,
                "Hex (bytes 5-20)                                | ASCII",
                "6f 20 45 61 72 74 68 20 26 20 4d 6f 6f 6f 6f 6e | o Earth & Moooon",
            ),
            (
                b"Long string with more than 16 bytes!",
                20,
                "Hex (bytes 15-30)                               | ASCII",
                "68 20 6d 6f 72 65 20 74 68 61 6e 20 31 36 20 62 | h more than 16 b",
            ),
        ];
        let pointer = "                ^                                      ^";

        for (bytes, offset, heading, row) in cases {
            let expected = format!("{heading}\n{SEPARATOR}\n{row}\n{pointer}");
            let dump = InspectableHexDump::new(bytes);
            assert_eq!(dump.format_with_highlighted_offset(offset), expected);
        }
    }

    #[test]
    fn test_highlighted_range() {
        let dump = InspectableHexDump::new(b"Hello World!");
        let prefix = format!(
            "Hex (bytes 0-11)                                | ASCII\n{SEPARATOR}\n48 65 6c 6c 6f 20 57 6f 72 6c 64 21             | Hello World!\n"
        );

        assert_eq!(
            dump.format_with_highlighted_range(4, 7),
            format!("{prefix}             ^--------^                               ^--^")
        );
        assert_eq!(
            dump.format_with_highlighted_range(0, 2),
            format!("{prefix} ^-----^                                          ^-^")
        );
    }

    #[test]
    fn test_multi_row_dump() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let dump = InspectableHexDump::new(&bytes).formatted_string();
        let rows: Vec<&str> = dump.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], format!("10 11 12 13 {}| ....", " ".repeat(36)));
    }

    #[test]
    fn test_offset_at_end_of_buffer() {
        let dump = InspectableHexDump::new(b"abc");
        let formatted = dump.format_with_highlighted_offset(3);
        assert!(formatted.starts_with("Hex (bytes 0-2)"));
        let pointer = format!("{}^{}^", " ".repeat(10), " ".repeat(42));
        assert_eq!(formatted.lines().last(), Some(pointer.as_str()));
    }
}
