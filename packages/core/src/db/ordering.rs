//! Sibling ordering with sparse integer sort keys
//!
//! Keys only encode relative order inside one sibling group. New positions are
//! taken from the gap between neighbours; when a gap is used up the whole group
//! is respaced at a fixed stride.

use thiserror::Error;

/// Spacing used when a sibling group is rebalanced
pub const DEFAULT_REBALANCE_STRIDE: i64 = 100;

/// Sort key of one sibling, as read inside the move transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingKey {
    pub id: String,
    pub sort_key: i64,
}

impl SiblingKey {
    pub fn new(id: impl Into<String>, sort_key: i64) -> Self {
        Self {
            id: id.into(),
            sort_key,
        }
    }
}

/// Where to put a node inside a sibling group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor<'a> {
    Before(&'a str),
    After(&'a str),
    End,
}

/// Outcome of a placement computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The gap was wide enough; only the placed node gets a key
    Key(i64),
    /// The group was respaced; `siblings` holds the new key of every other
    /// member, in final order
    Rebalanced {
        key: i64,
        siblings: Vec<SiblingKey>,
    },
}

impl Placement {
    pub fn key(&self) -> i64 {
        match self {
            Placement::Key(key) => *key,
            Placement::Rebalanced { key, .. } => *key,
        }
    }

    pub fn is_rebalanced(&self) -> bool {
        matches!(self, Placement::Rebalanced { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    #[error("Anchor node {0} is not part of the sibling group")]
    AnchorNotFound(String),

    #[error("Sort key space exhausted for a group of {0} siblings")]
    KeySpaceExhausted(usize),
}

/// Computes sort keys for inserts and moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeyCalculator {
    stride: i64,
}

impl Default for SortKeyCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_REBALANCE_STRIDE)
    }
}

impl SortKeyCalculator {
    /// Strides below 2 leave no room for a midpoint and are raised to 2.
    pub fn new(stride: i64) -> Self {
        Self {
            stride: stride.max(2),
        }
    }

    pub fn stride(&self) -> i64 {
        self.stride
    }

    /// Key for appending after the current maximum of a group
    ///
    /// ```
    /// # use knowtree_core::db::SortKeyCalculator;
    /// assert_eq!(SortKeyCalculator::append_key(None), Some(1));
    /// assert_eq!(SortKeyCalculator::append_key(Some(7)), Some(8));
    /// assert_eq!(SortKeyCalculator::append_key(Some(i64::MAX)), None);
    /// ```
    pub fn append_key(max: Option<i64>) -> Option<i64> {
        match max {
            None => Some(1),
            Some(max) => max.checked_add(1),
        }
    }

    /// Key strictly between two neighbours, or `None` when there is no room
    ///
    /// ```
    /// # use knowtree_core::db::SortKeyCalculator;
    /// assert_eq!(SortKeyCalculator::key_between(None, None), Some(1));
    /// assert_eq!(SortKeyCalculator::key_between(None, Some(100)), Some(99));
    /// assert_eq!(SortKeyCalculator::key_between(Some(300), None), Some(301));
    /// assert_eq!(SortKeyCalculator::key_between(Some(100), Some(200)), Some(150));
    /// assert_eq!(SortKeyCalculator::key_between(Some(5), Some(6)), None);
    /// ```
    pub fn key_between(prev: Option<i64>, next: Option<i64>) -> Option<i64> {
        match (prev, next) {
            (None, None) => Some(1),
            (None, Some(next)) => next.checked_sub(1),
            (Some(prev), None) => prev.checked_add(1),
            (Some(prev), Some(next)) => {
                let gap = next.checked_sub(prev)?;
                if gap > 1 {
                    Some(prev + gap / 2)
                } else {
                    None
                }
            }
        }
    }

    /// Whether any adjacent pair of ordered keys leaves no room for an insert
    pub fn needs_rebalancing(keys: &[i64]) -> bool {
        keys.windows(2)
            .any(|pair| Self::key_between(Some(pair[0]), Some(pair[1])).is_none())
    }

    /// Evenly spaced keys for a group of `count` members
    ///
    /// # Example
    /// Input:  count = 4, stride = 100
    /// Output: [100, 200, 300, 400]
    pub fn rebalance(&self, count: usize) -> Result<Vec<i64>, OrderingError> {
        (1..=count)
            .map(|i| {
                i64::try_from(i)
                    .ok()
                    .and_then(|i| i.checked_mul(self.stride))
                    .ok_or(OrderingError::KeySpaceExhausted(count))
            })
            .collect()
    }

    /// Place `moving_id` into a sibling group relative to `anchor`
    ///
    /// `siblings` is the current group; an entry for `moving_id` itself (when
    /// the node is reordered within its own group) is ignored. When the gap at
    /// the insertion point is exhausted, the whole group including the placed
    /// node is respaced at the stride, keeping the existing relative order.
    pub fn place(
        &self,
        siblings: &[SiblingKey],
        moving_id: &str,
        anchor: Anchor<'_>,
    ) -> Result<Placement, OrderingError> {
        let mut ordered: Vec<&SiblingKey> =
            siblings.iter().filter(|s| s.id != moving_id).collect();
        ordered.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then_with(|| a.id.cmp(&b.id)));

        let insert_at = match anchor {
            Anchor::End => ordered.len(),
            Anchor::Before(target) => Self::position_of(&ordered, target)?,
            Anchor::After(target) => Self::position_of(&ordered, target)? + 1,
        };

        let prev = insert_at.checked_sub(1).map(|i| ordered[i].sort_key);
        let next = ordered.get(insert_at).map(|s| s.sort_key);

        let candidate = match anchor {
            Anchor::End => Self::append_key(prev),
            _ => Self::key_between(prev, next),
        };

        if let Some(key) = candidate {
            return Ok(Placement::Key(key));
        }

        let keys = self.rebalance(ordered.len() + 1)?;
        let key = keys[insert_at];
        let respaced = ordered
            .iter()
            .enumerate()
            .map(|(i, sibling)| {
                let slot = if i < insert_at { i } else { i + 1 };
                SiblingKey::new(sibling.id.clone(), keys[slot])
            })
            .collect();

        Ok(Placement::Rebalanced {
            key,
            siblings: respaced,
        })
    }

    fn position_of(ordered: &[&SiblingKey], target: &str) -> Result<usize, OrderingError> {
        ordered
            .iter()
            .position(|s| s.id == target)
            .ok_or_else(|| OrderingError::AnchorNotFound(target.to_string()))
    }
}
