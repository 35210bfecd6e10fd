//! Engine configuration.
//!
//! Tie-breaking is fixed and not configurable: RePair always picks the pair
//! with the highest count and, among equal counts, the lexicographically
//! smallest `(first, second)`. Horizontal cluster merges order their keys the
//! same way. Huffman construction breaks frequency ties by insertion order.

/// Configuration of a RePair run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairConfig {
    /// Stop after this many rules. `None` runs to the fixpoint.
    pub max_rules: Option<usize>,
}

impl RepairConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = Some(max_rules);
        self
    }
}

/// When parent/child collapses are allowed during Top DAG construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalMerges {
    /// Every round merges chains of single-child nodes pairwise, bottom-up.
    #[default]
    EveryRound,
    /// Every round merges a single-child parent only with a leaf child.
    LeafOnly,
    /// Vertical merges run only in rounds where no horizontal merge was
    /// possible.
    Fallback,
}

/// Order in which horizontal (sibling) merges are performed within a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HorizontalOrder {
    /// Most frequent merge first, then the rest left to right.
    #[default]
    ByFrequency,
    /// Plain left-to-right pairing.
    LeftToRight,
}

/// Configuration of a Top DAG construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopDagConfig {
    pub vertical: VerticalMerges,
    pub horizontal: HorizontalOrder,
}

impl TopDagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertical(mut self, vertical: VerticalMerges) -> Self {
        self.vertical = vertical;
        self
    }

    pub fn horizontal(mut self, horizontal: HorizontalOrder) -> Self {
        self.horizontal = horizontal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(RepairConfig::default().max_rules, None);
        let config = TopDagConfig::default();
        assert_eq!(config.vertical, VerticalMerges::EveryRound);
        assert_eq!(config.horizontal, HorizontalOrder::ByFrequency);
    }

    #[test]
    fn test_builders() {
        assert_eq!(RepairConfig::new().max_rules(4).max_rules, Some(4));
        let config = TopDagConfig::new()
            .vertical(VerticalMerges::Fallback)
            .horizontal(HorizontalOrder::LeftToRight);
        assert_eq!(config.vertical, VerticalMerges::Fallback);
        assert_eq!(config.horizontal, HorizontalOrder::LeftToRight);
    }
}
