//! OCR text cleaning.
//!
//! OCR output is noisy: stray glyphs from seals and signatures, ragged
//! whitespace, empty lines between every text block. Cleaning keeps word
//! characters and the punctuation that certificates actually use, collapses
//! whitespace within a line to single spaces, and drops blank lines.
//!
//! `clean_text(clean_text(t)) == clean_text(t)` for every input.

/// Punctuation kept alongside word characters.
const ALLOWED_PUNCTUATION: &[char] = &['-', '.', ',', ':', '/', '(', ')', '@', '#', '&'];

fn is_allowed(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ALLOWED_PUNCTUATION.contains(&ch)
}

/// Normalise extracted text.
pub fn clean_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let mut out = String::with_capacity(line.len());
        let mut pending_space = false;

        for ch in line.chars() {
            if ch.is_whitespace() {
                pending_space = true;
                continue;
            }
            // Dropped characters do not break a whitespace run.
            if !is_allowed(ch) {
                continue;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }

        if !out.is_empty() {
            lines.push(out);
        }
    }

    lines.join("\n")
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
