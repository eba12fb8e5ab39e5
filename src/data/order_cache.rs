use std::collections::HashMap;

/// Rank of each symbol in some externally chosen sort order.
///
/// The paper trader binds this to the `order` variable so evolved rules can
/// condition on a stock's standing; the cache itself is opaque pass-through
/// data as far as the GP core is concerned.
#[derive(Debug, Clone, Default)]
pub struct OrderCache {
    ranks: HashMap<String, usize>,
}

impl OrderCache {
    /// Build from a list already in rank order (first symbol = rank 0).
    pub fn from_ordered_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ranks = symbols
            .into_iter()
            .enumerate()
            .map(|(rank, symbol)| (symbol.into(), rank))
            .collect();
        Self { ranks }
    }

    pub fn rank(&self, symbol: &str) -> Option<usize> {
        self.ranks.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_input_order() {
        let cache = OrderCache::from_ordered_symbols(["BHP", "RIO", "CBA"]);
        assert_eq!(cache.rank("BHP"), Some(0));
        assert_eq!(cache.rank("CBA"), Some(2));
        assert_eq!(cache.rank("WOW"), None);
        assert_eq!(cache.len(), 3);
    }
}
