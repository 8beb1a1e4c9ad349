use crate::models::frame::{column_cells, column_cells_or_empty, set_column_cells};
use crate::models::{FieldPair, MatchMapping};
use anyhow::{Result, anyhow};
use polars::prelude::*;
use tracing::debug;

/// Copies catalog fields into a target table along a match mapping.
pub struct FieldPropagator;

impl FieldPropagator {
    /// For every `target row -> source row` in `mapping`, copy each pair's
    /// source field into the target field. Unmapped target rows are left alone.
    /// Returns the number of cells written.
    pub fn propagate(
        &self,
        mapping: &MatchMapping,
        source: &DataFrame,
        target: &mut DataFrame,
        field_pairs: &[FieldPair],
    ) -> Result<usize> {
        if mapping.is_empty() {
            return Ok(0);
        }

        let mut written = 0;

        for pair in field_pairs {
            let source_cells = column_cells(source, &pair.source)?;
            let mut target_cells = column_cells_or_empty(target, &pair.target)?;

            for (&target_row, &source_row) in mapping {
                let value = source_cells.get(source_row).ok_or_else(|| {
                    anyhow!(
                        "Source row {} out of range for column '{}'",
                        source_row,
                        pair.source
                    )
                })?;
                let slot = target_cells.get_mut(target_row).ok_or_else(|| {
                    anyhow!(
                        "Target row {} out of range for column '{}'",
                        target_row,
                        pair.target
                    )
                })?;
                *slot = value.clone();
                written += 1;
            }

            set_column_cells(target, &pair.target, &target_cells)?;
            debug!("Propagated '{}' -> '{}' for {} rows", pair.source, pair.target, mapping.len());
        }

        Ok(written)
    }
}
