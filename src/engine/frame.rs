//! Target frame under construction

use serde_json::Value;

use crate::table::{Column, Table, TableError, TableResult};

/// The dataset being built.
///
/// Height is fixed by the key frame, or by the first attached column when
/// the domain has no keys. Columns that fail before the height is known are
/// remembered and null-filled once it is.
#[derive(Debug)]
pub struct TargetFrame {
    table: Table,
    height: Option<usize>,
    pending: Vec<String>,
}

impl TargetFrame {
    /// Frame with no rows established
    pub fn empty(domain: &str) -> Self {
        Self {
            table: Table::new(domain),
            height: None,
            pending: Vec::new(),
        }
    }

    /// Frame seeded with key columns
    pub fn from_keys(keys: Table) -> Self {
        let height = Some(keys.height());
        Self {
            table: keys,
            height,
            pending: Vec::new(),
        }
    }

    pub fn height(&self) -> Option<usize> {
        self.height
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Attaches a derived column; its length must equal the frame height
    pub fn attach(&mut self, name: &str, values: Vec<Value>) -> TableResult<()> {
        match self.height {
            Some(height) if values.len() != height => {
                return Err(TableError::LengthMismatch {
                    table: self.table.name().to_string(),
                    column: name.to_string(),
                    expected: height,
                    actual: values.len(),
                });
            }
            Some(_) => {}
            None => {
                self.height = Some(values.len());
                self.table.push_column(Column::new(name, values))?;
                return self.fill_pending();
            }
        }
        self.table.push_column(Column::new(name, values))
    }

    /// Attaches an all-null column, deferred until the height is known
    pub fn attach_nulls(&mut self, name: &str) -> TableResult<()> {
        match self.height {
            Some(height) => self
                .table
                .push_column(Column::filled(name, Value::Null, height)),
            None => {
                self.pending.push(name.to_string());
                Ok(())
            }
        }
    }

    /// Final table with columns in `order`
    pub fn finish(mut self, order: &[String]) -> TableResult<Table> {
        if self.height.is_none() {
            self.height = Some(0);
        }
        self.fill_pending()?;
        Ok(self.table.select(order))
    }

    fn fill_pending(&mut self) -> TableResult<()> {
        let height = self.height.unwrap_or(0);
        for name in std::mem::take(&mut self.pending) {
            self.table
                .push_column(Column::filled(name, Value::Null, height))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_height_fixed_by_keys() {
        let keys = Table::from_records("ADSL", &[json!({"USUBJID": "S1"}), json!({"USUBJID": "S2"})])
            .unwrap();
        let mut frame = TargetFrame::from_keys(keys);
        assert_eq!(frame.height(), Some(2));
        frame.attach("A", vec![json!(1), json!(2)]).unwrap();
        let err = frame.attach("B", vec![json!(1)]).unwrap_err();
        assert_eq!(err.code(), "ADAM_TABLE_LENGTH_MISMATCH");
    }

    #[test]
    fn test_placeholders_filled_when_height_known() {
        let mut frame = TargetFrame::empty("ADSL");
        frame.attach_nulls("FAILED").unwrap();
        assert_eq!(frame.height(), None);
        frame.attach("A", vec![json!(1), json!(2), json!(3)]).unwrap();
        assert_eq!(frame.height(), Some(3));

        let table = frame.finish(&["FAILED".to_string(), "A".to_string()]).unwrap();
        assert_eq!(table.column_names(), vec!["FAILED", "A"]);
        assert_eq!(table.values("FAILED").unwrap(), &[Value::Null, Value::Null, Value::Null]);
    }

    #[test]
    fn test_finish_without_height() {
        let mut frame = TargetFrame::empty("ADSL");
        frame.attach_nulls("X").unwrap();
        let table = frame.finish(&["X".to_string()]).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.column_names(), vec!["X"]);
    }
}
