// Stem / choice separation inside one question block
//
// A choice is led by a single letter A-E followed by '.' or ')'. A physical
// line that starts with such a label is a choice line. Because light
// normalization collapses newlines, choices usually share a line with the
// stem ("What is 2+2? A) 3 B) 4"), so lines are also split at inline labels.
// A run of inline choices starts at the last "A" label before a "B" label and
// then follows the letters in sequence. Stray labels such as "Plan B.",
// "Vitamin C." or "vitamin A." stay in the text they belong to.

use crate::types::QuestionRecord;

const FIRST_LABEL: u8 = b'A';
const LAST_LABEL: u8 = b'E';

/// Build a record from a marker block. `None` when the stem is empty.
pub fn build_record(block: &str, inline_choices: bool) -> Option<QuestionRecord> {
    let mut stem_parts: Vec<&str> = Vec::new();
    let mut choices: Vec<String> = Vec::new();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let segments = if inline_choices {
            split_inline(line)
        } else {
            vec![line]
        };
        for segment in segments {
            if starts_with_label(segment) {
                choices.push(segment.to_string());
            } else {
                stem_parts.push(segment);
            }
        }
    }

    QuestionRecord::new(&stem_parts.join(" "), choices)
}

/// `A`-`E` followed by `.` or `)` at the start of a trimmed line
pub fn starts_with_label(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 2 && is_label_letter(bytes[0]) && is_label_punct(bytes[1])
}

fn is_label_letter(b: u8) -> bool {
    (FIRST_LABEL..=LAST_LABEL).contains(&b)
}

fn is_label_punct(b: u8) -> bool {
    b == b'.' || b == b')'
}

/// Label letter of an inline marker at byte `i`: preceded by whitespace and
/// followed by `.`/`)` plus whitespace or end of line. All bytes checked are
/// ASCII, so every index returned is a char boundary.
fn inline_label_at(bytes: &[u8], i: usize) -> Option<u8> {
    let letter = *bytes.get(i)?;
    if !is_label_letter(letter) || !bytes.get(i + 1).copied().is_some_and(is_label_punct) {
        return None;
    }
    let preceded = i > 0 && bytes[i - 1].is_ascii_whitespace();
    let followed = bytes.get(i + 2).map_or(true, |b| b.is_ascii_whitespace());
    (preceded && followed).then_some(letter)
}

/// Start of the inline choice run: the last `A` label before the first `B`
/// label that follows one. A lone `A` is stem text.
fn inline_run_start(bytes: &[u8]) -> Option<usize> {
    let mut last_a = None;
    for i in 1..bytes.len() {
        match inline_label_at(bytes, i) {
            Some(FIRST_LABEL) => last_a = Some(i),
            Some(letter) if letter == FIRST_LABEL + 1 && last_a.is_some() => return last_a,
            _ => {}
        }
    }
    None
}

/// Split one trimmed line into stem and choice segments, in order
fn split_inline(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut cuts = Vec::new();

    // Letter the next split must carry. A line that already opens with a
    // label continues from that label's successor.
    let (mut expected, from) = if starts_with_label(line) {
        (bytes[0] + 1, 1)
    } else {
        match inline_run_start(bytes) {
            Some(start) => {
                cuts.push(start);
                (FIRST_LABEL + 1, start + 1)
            }
            None => return vec![line],
        }
    };

    for i in from..bytes.len() {
        if expected > LAST_LABEL {
            break;
        }
        if inline_label_at(bytes, i) == Some(expected) {
            cuts.push(i);
            expected += 1;
        }
    }

    let mut segments = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        segments.push(line[start..cut].trim());
        start = cut;
    }
    segments.push(line[start..].trim());
    segments.retain(|s| !s.is_empty());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_choices_split_in_sequence() {
        assert_eq!(
            split_inline("What is 2+2? A) 3 B) 4 C) 5"),
            vec!["What is 2+2?", "A) 3", "B) 4", "C) 5"]
        );
    }

    #[test]
    fn test_stray_labels_stay_in_text() {
        assert_eq!(
            split_inline("Is Plan B. a good idea? A) Vitamin C. helps B. No"),
            vec!["Is Plan B. a good idea?", "A) Vitamin C. helps", "B. No"]
        );
    }

    #[test]
    fn test_inline_a_without_b_is_stem_text() {
        assert_eq!(
            split_inline("Which vitamin is A. found in carrots? A) x B) y"),
            vec!["Which vitamin is A. found in carrots?", "A) x", "B) y"]
        );
        assert_eq!(
            split_inline("Is vitamin A. soluble in fat?"),
            vec!["Is vitamin A. soluble in fat?"]
        );

        let record = build_record(" Which vitamin is A. found in carrots? A) x B) y", true).unwrap();
        assert_eq!(record.question, "Which vitamin is A. found in carrots?");
        assert_eq!(record.choices, Some(vec!["A) x".to_string(), "B) y".to_string()]));
    }

    #[test]
    fn test_line_opening_with_label_continues_sequence() {
        assert_eq!(split_inline("C) red D) blue"), vec!["C) red", "D) blue"]);
    }

    #[test]
    fn test_label_requires_surrounding_whitespace() {
        assert_eq!(split_inline("The U.S.A. flag"), vec!["The U.S.A. flag"]);
        assert_eq!(split_inline("Pick A)B) now"), vec!["Pick A)B) now"]);
    }

    #[test]
    fn test_choice_lines_without_inline_splitting() {
        let record = build_record(" Which is a noble gas?\nA. Neon\nB. Iron\n", false).unwrap();
        assert_eq!(record.question, "Which is a noble gas?");
        assert_eq!(
            record.choices,
            Some(vec!["A. Neon".to_string(), "B. Iron".to_string()])
        );

        let collapsed = build_record(" Which is a noble gas? A. Neon B. Iron", false).unwrap();
        assert_eq!(collapsed.question, "Which is a noble gas? A. Neon B. Iron");
        assert_eq!(collapsed.choices, None);
    }

    #[test]
    fn test_stem_lines_join_with_single_space() {
        let record = build_record("  Name two\n\n  noble gases.  ", true).unwrap();
        assert_eq!(record.question, "Name two noble gases.");
        assert!(!record.has_choices());
    }

    #[test]
    fn test_empty_stem() {
        assert!(build_record(" A) yes B) no", true).is_none());
        assert!(build_record("   ", true).is_none());
    }
}
