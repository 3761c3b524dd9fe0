use crate::common::key::TabletId;
use crate::common::schema::TableSchema;
use crate::common::value::Value;
use crate::storage::column::Column;

/// Rows buffered for one tablet id.
///
/// `times[i]` and `records[c][i]` describe the same row for every column `c`.
#[derive(Debug, Clone)]
pub struct Tablet {
    tablet_id: TabletId,
    times: Vec<u64>,
    records: Vec<Column>,
}

impl Tablet {
    pub(crate) fn with_capacity(tablet_id: TabletId, schema: &TableSchema, capacity: usize) -> Self {
        let records = schema
            .semantic_types()
            .map(|t| Column::with_capacity(t, capacity))
            .collect();
        Self {
            tablet_id,
            times: Vec::with_capacity(capacity),
            records,
        }
    }

    pub fn tablet_id(&self) -> &TabletId {
        &self.tablet_id
    }

    pub fn times(&self) -> &[u64] {
        &self.times
    }

    pub fn records(&self) -> &[Column] {
        &self.records
    }

    pub fn num_rows(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Appends one row: its timestamp plus one value per schema field, in schema order.
    ///
    /// Supplying the wrong number of values or a value of the wrong type breaks the
    /// caller contract; it is only asserted in debug builds.
    pub fn append_row<I>(&mut self, time: u64, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let mut values = values.into_iter();
        for column in self.records.iter_mut() {
            match values.next() {
                Some(value) => column.append(value),
                None => {
                    debug_assert!(
                        false,
                        "row for tablet '{}' has the wrong number of values",
                        self.tablet_id
                    );
                    column.append_default();
                }
            }
        }
        debug_assert!(
            values.next().is_none(),
            "row for tablet '{}' has the wrong number of values",
            self.tablet_id
        );
        self.times.push(time);
    }

    /// Copies the rows at `indexes`, in that order, into a new tablet with the same id.
    pub(crate) fn take_indexes(&self, indexes: &[usize]) -> Tablet {
        Tablet {
            tablet_id: self.tablet_id.clone(),
            times: indexes.iter().map(|&i| self.times[i]).collect(),
            records: self.gather_records(indexes),
        }
    }

    pub(crate) fn gather_records(&self, indexes: &[usize]) -> Vec<Column> {
        self.records.iter().map(|c| c.gather(indexes)).collect()
    }

    /// Stable ascending order of row positions by timestamp.
    pub(crate) fn sorted_indexes(&self) -> Vec<usize> {
        let mut indexes: Vec<usize> = (0..self.times.len()).collect();
        // sort_by_key is stable: equal timestamps keep arrival order.
        indexes.sort_by_key(|&i| self.times[i]);
        indexes
    }

    pub(crate) fn is_aligned(&self) -> bool {
        self.records.iter().all(|c| c.len() == self.times.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::schema::SemanticType;

    fn schema() -> TableSchema {
        TableSchema::from_pairs(
            "t",
            vec![("value", SemanticType::Float64), ("tag", SemanticType::String)],
        )
        .unwrap()
    }

    #[test]
    fn test_append_keeps_columns_aligned() {
        let mut tablet = Tablet::with_capacity(TabletId::from("a"), &schema(), 4);
        tablet.append_row(7, vec![Value::Float64(1.0), Value::from("x")]);
        tablet.append_row(2, vec![Value::Float64(2.0), Value::from("y")]);

        assert_eq!(tablet.num_rows(), 2);
        assert_eq!(tablet.times(), &[7, 2]);
        assert!(tablet.is_aligned());
        assert_eq!(tablet.records()[1], Column::String(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_sorted_indexes_is_stable() {
        let mut tablet = Tablet::with_capacity(TabletId::from("a"), &schema(), 4);
        for (t, v) in [(5, 0.0), (3, 1.0), (3, 2.0), (10, 3.0), (3, 4.0)] {
            tablet.append_row(t, vec![Value::Float64(v), Value::from("")]);
        }
        assert_eq!(tablet.sorted_indexes(), vec![1, 2, 4, 0, 3]);

        let taken = tablet.take_indexes(&[3, 0]);
        assert_eq!(taken.times(), &[10, 5]);
        assert_eq!(taken.records()[0], Column::Float64(vec![3.0, 0.0]));
        assert_eq!(taken.tablet_id(), &TabletId::from("a"));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "wrong number of values")]
    fn test_short_row_asserts() {
        let mut tablet = Tablet::with_capacity(TabletId::from("a"), &schema(), 4);
        tablet.append_row(1, vec![Value::Float64(1.0)]);
    }
}
