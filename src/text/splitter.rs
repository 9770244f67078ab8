//! Recursive, separator-aware text splitter.
//!
//! Splits on the coarsest separator present in the text (paragraphs, then
//! lines, then sentences, and so on), merges adjacent pieces back into chunks
//! of at most `chunk_size` characters, and recurses into any piece that is
//! still too long with the next finer separator. Raw character cuts are the
//! last resort.
//!
//! Lengths are measured in `char`s so cuts never land inside a UTF-8 sequence.

/// Separators in priority order. The empty separator means "cut characters".
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", ",", ">", "<", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Chunks never overlap.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_from(text, 0, &mut chunks);
        chunks
    }

    fn split_from(&self, text: &str, level: usize, chunks: &mut Vec<String>) {
        // No remaining separator occurs in the text: fall through to character cuts.
        let (level, separator) = self.separators[level.min(self.separators.len())..]
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(sep.as_str()))
            .map(|(i, sep)| (level + i, sep.as_str()))
            .unwrap_or((self.separators.len(), ""));

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).collect()
        };

        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                self.merge_pieces(&fitting, separator, chunks);
                fitting.clear();
            }

            if separator.is_empty() {
                // A single character wider than the chunk size cannot shrink further.
                chunks.push(piece.to_string());
            } else {
                self.split_from(piece, level + 1, chunks);
            }
        }

        if !fitting.is_empty() {
            self.merge_pieces(&fitting, separator, chunks);
        }
    }

    fn merge_pieces(&self, pieces: &[&str], separator: &str, chunks: &mut Vec<String>) {
        let separator_len = char_len(separator);
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined = if current.is_empty() { 0 } else { separator_len };

            if total + joined + len > self.chunk_size && !current.is_empty() {
                if let Some(chunk) = join_pieces(&current, separator) {
                    chunks.push(chunk);
                }
                current.clear();
                total = 0;
            }

            if !current.is_empty() {
                total += separator_len;
            }
            current.push(piece);
            total += len;
        }

        if let Some(chunk) = join_pieces(&current, separator) {
            chunks.push(chunk);
        }
    }
}

fn join_pieces(pieces: &[&str], separator: &str) -> Option<String> {
    let joined = pieces.join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The first `max_chars` characters of `text`.
pub(crate) fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
