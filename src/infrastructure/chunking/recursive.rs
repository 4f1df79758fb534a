//! Recursive character chunking with line tracking

use std::collections::VecDeque;

use crate::domain::chunking::{ChunkingConfig, TextChunk, TextChunker};
use crate::domain::DomainError;

/// Separators tried in order: paragraph, line, sentence, word, character
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Chunker that splits on the coarsest separator present in the text and
/// recurses with finer separators into pieces that are still too long.
///
/// Separators are kept at the start of the piece that follows them, so
/// joining adjacent pieces reproduces the source text. Sizes are counted
/// in characters.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    separators: Vec<String>,
}

impl RecursiveChunker {
    pub fn new() -> Self {
        Self::with_separators(DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_separators(separators: Vec<String>) -> Self {
        Self { separators }
    }

    /// Split without line tracking
    pub fn split_text(&self, text: &str, config: &ChunkingConfig) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        Self::split_recursive(text, &separators, config)
    }

    fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
        let (separator, finer) = Self::pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut good_splits: Vec<&str> = Vec::new();

        for piece in Self::split_keeping_separator(text, separator) {
            if char_len(piece) < config.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                chunks.extend(Self::merge_splits(&good_splits, config));
                good_splits.clear();
            }

            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(Self::split_recursive(piece, finer, config));
            }
        }

        if !good_splits.is_empty() {
            chunks.extend(Self::merge_splits(&good_splits, config));
        }

        chunks
    }

    /// First separator that occurs in `text`, plus the finer separators after it.
    /// The empty separator always matches and has nothing finer.
    fn pick_separator<'a, 'b>(text: &str, separators: &'b [&'a str]) -> (&'a str, &'b [&'a str]) {
        for (i, &separator) in separators.iter().enumerate() {
            if separator.is_empty() {
                return ("", &[]);
            }
            if text.contains(separator) {
                return (separator, &separators[i + 1..]);
            }
        }

        (separators.last().copied().unwrap_or(""), &[])
    }

    fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
        if separator.is_empty() {
            return text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect();
        }

        let mut pieces = Vec::new();
        let mut start = 0;

        for (index, _) in text.match_indices(separator) {
            if index > start {
                pieces.push(&text[start..index]);
            }
            start = index;
        }

        if start < text.len() {
            pieces.push(&text[start..]);
        }

        pieces
    }

    /// Greedily pack pieces into chunks of at most `chunk_size` characters,
    /// carrying up to `chunk_overlap` characters of trailing pieces into the
    /// next chunk.
    fn merge_splits(splits: &[&str], config: &ChunkingConfig) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len > config.chunk_size && !current.is_empty() {
                if total > config.chunk_size {
                    tracing::debug!(
                        size = total,
                        chunk_size = config.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }

                if let Some(doc) = join_pieces(&current) {
                    docs.push(doc);
                }

                while total > config.chunk_overlap
                    || (total + len > config.chunk_size && total > 0)
                {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_pieces(&current) {
            docs.push(doc);
        }

        docs
    }

    /// Attach 1-based line spans by locating each chunk in the source text.
    ///
    /// The search for a chunk starts one character past the previous chunk's
    /// start so overlapping chunks resolve to their own occurrence.
    fn locate_lines(text: &str, chunks: Vec<String>) -> Vec<TextChunk> {
        let mut cursor = 0usize;

        chunks
            .into_iter()
            .map(|content| {
                let start = text[cursor..]
                    .find(content.as_str())
                    .map(|offset| cursor + offset)
                    .unwrap_or(cursor);
                let end = floor_char_boundary(text, start + content.len());

                let line_start = count_newlines(&text[..start]) + 1;
                let line_end = count_newlines(&text[..end]) + 1;

                cursor = text[start..]
                    .chars()
                    .next()
                    .map(|c| start + c.len_utf8())
                    .unwrap_or(start);

                TextChunk::new(content, line_start, line_end)
            })
            .collect()
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl TextChunker for RecursiveChunker {
    fn chunk(&self, text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, DomainError> {
        config.validate()?;

        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let chunks = self.split_text(text, config);
        Ok(Self::locate_lines(text, chunks))
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, size: usize, overlap: usize) -> Vec<TextChunk> {
        RecursiveChunker::new()
            .chunk(text, &ChunkingConfig::new(size, overlap))
            .unwrap()
    }

    #[test]
    fn test_empty_and_whitespace_content() {
        assert!(chunk("", 100, 10).is_empty());
        assert!(chunk("   \n\n \t ", 100, 10).is_empty());
    }

    #[test]
    fn test_small_content() {
        let chunks = chunk("Small content", 1000, 200);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], TextChunk::new("Small content", 1, 1));
    }

    #[test]
    fn test_split_by_paragraphs() {
        let content = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunk(content, 30, 0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "First paragraph here.");
        assert_eq!(chunks[1].content, "Second paragraph here.");
        assert_eq!((chunks[1].line_start, chunks[1].line_end), (3, 3));
        assert_eq!((chunks[2].line_start, chunks[2].line_end), (5, 5));
    }

    #[test]
    fn test_chunks_respect_size() {
        let content = "This is a test sentence. ".repeat(100);
        let chunks = chunk(&content, 100, 20);

        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.content.chars().count() <= 100);
        }
    }

    #[test]
    fn test_overlap_carries_trailing_words() {
        let content = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunk(content, 20, 10);

        assert!(chunks.len() > 1);
        let first_words: Vec<&str> = chunks[0].content.split_whitespace().collect();
        let last_word = first_words[first_words.len() - 1];
        assert!(chunks[1].content.contains(last_word));
    }

    #[test]
    fn test_line_numbers_cover_input() {
        let content = (1..=40)
            .map(|i| format!("line number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk(&content, 80, 20);

        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks.last().unwrap().line_end, 40);
        for pair in chunks.windows(2) {
            assert!(pair[1].line_start <= pair[0].line_end + 1);
        }
        for c in &chunks {
            assert!(c.line_start <= c.line_end);
        }
    }

    #[test]
    fn test_repeated_text_resolves_distinct_positions() {
        let content = "same line\nsame line\nsame line";
        let chunks = chunk(content, 10, 0);

        let starts: Vec<usize> = chunks.iter().map(|c| c.line_start).collect();
        assert_eq!(starts, vec![1, 2, 3]);
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let content = "x".repeat(25);
        let chunks = chunk(&content, 10, 0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].content, "xxxxx");
    }

    #[test]
    fn test_multibyte_text() {
        let content = "héllo wörld ".repeat(20);
        let chunks = chunk(&content, 30, 5);

        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.chars().count() <= 30);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RecursiveChunker::new().chunk("text", &ChunkingConfig::new(10, 10));
        assert!(result.is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(RecursiveChunker::new().name(), "recursive");
    }
}
