use super::{BlockStrategy, StrategyKind};

/// Fallback for documents without numbered questions: every sentence that
/// ends in `?` becomes its own block.
///
/// A sentence starts after the previous `?`, newline, or `.`/`!` that is
/// followed by whitespace or the end of text (so "2.5" does not split), and
/// must contain at least one alphanumeric character.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceStrategy;

impl BlockStrategy for SentenceStrategy {
    fn blocks<'t>(&self, text: &'t str) -> Vec<&'t str> {
        let mut blocks = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '?' => {
                    let end = i + c.len_utf8();
                    let sentence = text[start..end].trim();
                    if sentence.chars().any(char::is_alphanumeric) {
                        blocks.push(sentence);
                    }
                    start = end;
                }
                '.' | '!' => {
                    let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
                    if at_boundary {
                        start = i + c.len_utf8();
                    }
                }
                '\n' => start = i + 1,
                _ => {}
            }
        }

        blocks
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Sentence
    }

    fn allows_choices(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_sentences_only() {
        let blocks = SentenceStrategy.blocks("Intro text. What is 2.5 times 2? Explain! Why not?");
        assert_eq!(blocks, vec!["What is 2.5 times 2?", "Why not?"]);
    }

    #[test]
    fn test_lines_are_boundaries() {
        let blocks = SentenceStrategy.blocks("Section heading\nIs it raining?\n???");
        assert_eq!(blocks, vec!["Is it raining?"]);
    }

    #[test]
    fn test_unicode_text() {
        let blocks = SentenceStrategy.blocks("Qu'est-ce que l'énergie? Fin.");
        assert_eq!(blocks, vec!["Qu'est-ce que l'énergie?"]);
    }

    #[test]
    fn test_no_question_mark() {
        assert!(SentenceStrategy.blocks("Nothing to ask. Really.").is_empty());
    }
}
