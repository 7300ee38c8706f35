/// Masonry column layout over a media sequence.
///
/// Holds indices into the sequence rather than the items themselves, so the
/// grid can map a clicked tile straight back to its position for overlay
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<Vec<usize>>,
}

impl ColumnLayout {
    pub fn columns(&self) -> &[Vec<usize>] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total number of placed items across all columns.
    pub fn item_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// True if `self` only appends to the columns of `previous`: same column
    /// count and every previous column is a prefix of the matching new one.
    pub fn extends(&self, previous: &ColumnLayout) -> bool {
        self.columns.len() == previous.columns.len()
            && self
                .columns
                .iter()
                .zip(previous.columns.iter())
                .all(|(new, old)| new.starts_with(old))
    }
}

/// Round-robin placement of the first `visible_count` items into
/// `column_count` columns: item `j` lands in column `j % column_count`,
/// keeping sequence order within each column.
///
/// A column count of zero is treated as one.
pub fn distribute_items<T>(
    items: &[T],
    column_count: usize,
    visible_count: Option<usize>,
) -> Vec<Vec<&T>> {
    let column_count = column_count.max(1);
    let shown = visible_count.map_or(items.len(), |visible| visible.min(items.len()));

    let mut columns: Vec<Vec<&T>> = (0..column_count)
        .map(|_| Vec::with_capacity(shown / column_count + 1))
        .collect();
    for (j, item) in items[..shown].iter().enumerate() {
        columns[j % column_count].push(item);
    }
    columns
}

/// [`distribute_items`] over the positions `0..len` of a sequence.
pub fn distribute(len: usize, column_count: usize, visible_count: Option<usize>) -> ColumnLayout {
    let positions: Vec<usize> = (0..len).collect();
    let columns = distribute_items(&positions, column_count, visible_count)
        .into_iter()
        .map(|column| column.into_iter().copied().collect())
        .collect();
    ColumnLayout { columns }
}
