/// Line counts of a comparison between two serialized trees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Lines only present in the new text
    pub inserted: usize,
    /// Lines only present in the old text
    pub deleted: usize,
    /// Lines present in both
    pub unchanged: usize,
}

impl ChangeSummary {
    /// Check if the comparison found any changes
    pub fn has_changes(&self) -> bool {
        self.inserted > 0 || self.deleted > 0
    }

    /// Total number of lines touched by the comparison
    pub fn total(&self) -> usize {
        self.inserted + self.deleted + self.unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = ChangeSummary::default();
        assert!(!summary.has_changes());
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_summary_with_changes() {
        let summary = ChangeSummary {
            inserted: 2,
            deleted: 1,
            unchanged: 4,
        };
        assert!(summary.has_changes());
        assert_eq!(summary.total(), 7);
    }
}
