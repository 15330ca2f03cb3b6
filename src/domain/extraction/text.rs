/// Splits plain text into chunks of at most `chunk_size` characters.
///
/// Blank lines separate paragraphs, and whole paragraphs are packed together
/// while they fit. A paragraph that is too long on its own is broken at
/// sentence ends, then at whitespace, and a single overlong word is cut at
/// character boundaries.
pub fn chunk_paragraphs(content: &str, chunk_size: usize) -> Vec<String> {
    let limit = chunk_size.max(1);

    let pieces = content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|p| split_paragraph(p, limit));

    pack(pieces, "\n\n", limit)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_paragraph(paragraph: &str, limit: usize) -> Vec<String> {
    if char_len(paragraph) <= limit {
        return vec![paragraph.to_string()];
    }

    let sentences = sentences(paragraph).into_iter().flat_map(|sentence| {
        if char_len(sentence) <= limit {
            vec![sentence.to_string()]
        } else {
            let words = sentence
                .split_whitespace()
                .flat_map(|word| split_word(word, limit));
            pack(words, " ", limit)
        }
    });

    pack(sentences, " ", limit)
}

/// Sentences end at `.`, `!` or `?` followed by whitespace.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let ends_sentence = matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if ends_sentence {
            let end = i + c.len_utf8();
            out.push(text[start..end].trim());
            start = end;
        }
    }
    out.push(text[start..].trim());

    out.retain(|s| !s.is_empty());
    out
}

fn split_word(word: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars.chunks(limit).map(|c| c.iter().collect()).collect()
}

/// Greedily joins pieces with `separator`. Every piece must already fit in
/// `limit` characters.
fn pack(pieces: impl IntoIterator<Item = String>, separator: &str, limit: usize) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = char_len(&piece);
        if current_len > 0 && current_len + separator_len + piece_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push_str(separator);
            current_len += separator_len;
        }
        current.push_str(&piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_paragraphs_single_chunk() {
        let chunks = chunk_paragraphs("Hello world.\n\nThis is a test.", 100);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello world.\n\nThis is a test.");
    }

    #[test]
    fn test_chunk_paragraphs_multiple_chunks() {
        let content = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_paragraphs(content, 30);

        assert_eq!(
            chunks,
            vec!["First paragraph.", "Second paragraph.", "Third paragraph."]
        );
    }

    #[test]
    fn test_chunk_paragraphs_skips_blank_paragraphs() {
        assert!(chunk_paragraphs("", 100).is_empty());
        assert!(chunk_paragraphs("  \n\n \t \n\n", 100).is_empty());
    }

    #[test]
    fn test_long_paragraph_splits_at_sentences() {
        let chunks = chunk_paragraphs("One two. Three four. Five six.", 20);

        assert_eq!(chunks, vec!["One two. Three four.", "Five six."]);
    }

    #[test]
    fn test_long_sentence_splits_at_whitespace() {
        let chunks = chunk_paragraphs("alpha beta gamma delta", 11);

        assert_eq!(chunks, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_unbroken_text_is_cut_to_chunk_size() {
        let chunks = chunk_paragraphs(&"x".repeat(50), 10);

        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c == &"x".repeat(10)));
    }

    #[test]
    fn test_chunk_size_counts_characters_not_bytes() {
        let content = "éééééé\n\néééééé";
        assert_eq!(content.len(), 26);

        let chunks = chunk_paragraphs(content, 20);
        assert_eq!(chunks, vec![content.to_string()]);

        let chunks = chunk_paragraphs("日本語のテキスト", 3);
        assert_eq!(chunks, vec!["日本語", "のテキ", "スト"]);
    }

    #[test]
    fn test_no_chunk_exceeds_chunk_size() {
        let content = "Our platform ingests decks. It answers questions fast!\n\n\
                       Supercalifragilisticexpialidocious pricing tiers apply.\n\n\
                       Short.";
        for size in [5, 12, 25, 60] {
            for chunk in chunk_paragraphs(content, size) {
                assert!(chunk.chars().count() <= size, "{chunk:?} exceeds {size}");
                assert!(!chunk.trim().is_empty());
            }
        }
    }
}
