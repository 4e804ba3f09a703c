//! Editor tuning options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::slug::DuplicateIdPolicy;

/// Options for one content editor instance.
///
/// Every field has a default, so partial config files deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Quiet period before heading ids are reconciled with their text.
    pub reconcile_delay_ms: u64,
    /// Heading levels offered on the toolbar.
    pub heading_levels: Vec<u8>,
    pub max_table_rows: usize,
    pub max_table_cols: usize,
    /// Undo steps kept.
    pub history_depth: usize,
    pub duplicate_ids: DuplicateIdPolicy,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            reconcile_delay_ms: 500,
            heading_levels: vec![1, 2, 3],
            max_table_rows: 10,
            max_table_cols: 10,
            history_depth: 100,
            duplicate_ids: DuplicateIdPolicy::default(),
        }
    }
}

impl EditorOptions {
    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_fill_defaults() {
        let options: EditorOptions =
            serde_json::from_str(r#"{ "reconcile_delay_ms": 250, "duplicate_ids": "preserve" }"#)
                .expect("valid options");
        assert_eq!(options.reconcile_delay(), Duration::from_millis(250));
        assert_eq!(options.duplicate_ids, DuplicateIdPolicy::Preserve);
        assert_eq!(options.heading_levels, vec![1, 2, 3]);
        assert_eq!(options.history_depth, 100);
    }
}
