use similar::{Algorithm, ChangeTag, TextDiff as SimilarTextDiff};

use crate::matcher::SequenceMatcher;
use crate::summary::ChangeSummary;

/// Wrapper around text comparison operations
pub struct TextDiff;

impl TextDiff {
    /// Similarity ratio of two texts compared character by character
    ///
    /// The ratio is `2 * matches / (len(old) + len(new))`, where matches are
    /// counted over the blocks a [`SequenceMatcher`] finds. Identical texts
    /// score `1.0` and texts with nothing in common score `0.0`. Two empty
    /// texts are identical.
    pub fn ratio(old_text: &str, new_text: &str) -> f64 {
        if old_text == new_text {
            return 1.0;
        }
        let old: Vec<char> = old_text.chars().collect();
        let new: Vec<char> = new_text.chars().collect();
        SequenceMatcher::new(&old, &new).ratio()
    }

    /// Similarity ratio of two texts compared line by line
    pub fn line_ratio(old_text: &str, new_text: &str) -> f64 {
        if old_text == new_text {
            return 1.0;
        }
        let old: Vec<&str> = old_text.split_inclusive('\n').collect();
        let new: Vec<&str> = new_text.split_inclusive('\n').collect();
        SequenceMatcher::new(&old, &new).ratio()
    }

    /// Count inserted, deleted and unchanged lines between two texts
    pub fn summarize(old_text: &str, new_text: &str) -> ChangeSummary {
        let diff = SimilarTextDiff::from_lines(old_text, new_text);
        let mut summary = ChangeSummary::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Equal => summary.unchanged += 1,
                ChangeTag::Delete => summary.deleted += 1,
                ChangeTag::Insert => summary.inserted += 1,
            }
        }
        summary
    }

    /// Generate a unified diff string (like git diff)
    ///
    /// An empty string is returned when the texts are identical.
    pub fn unified_diff(
        old_text: &str,
        new_text: &str,
        old_label: &str,
        new_label: &str,
        context_lines: usize,
    ) -> String {
        if old_text == new_text {
            return String::new();
        }
        let diff = SimilarTextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_lines(old_text, new_text);

        diff.unified_diff()
            .context_radius(context_lines)
            .header(old_label, new_label)
            .to_string()
    }

    /// Render every line of the diff with a `-`, `+` or space marker
    pub fn annotated(old_text: &str, new_text: &str) -> String {
        let diff = SimilarTextDiff::from_lines(old_text, new_text);

        let mut result = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            result.push_str(sign);
            result.push_str(change.value());
            if change.missing_newline() {
                result.push('\n');
            }
        }
        result
    }
}
