//! Reshaping of raw hit rows into structured records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::fetch::RawHitTable;
use super::params::metric_column_names;
use super::types::SearchError;

/// The nested alignment record leading every hit row, expanded into
/// top-level fields. `hit_smiles` is the compound description the `name` and
/// `smiles` columns are derived from; fields beyond the known pair are kept
/// as-is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlignmentRecord {
    #[serde(rename = "hitSmiles")]
    pub hit_smiles: String,
    #[serde(rename = "qrySmiles", default, skip_serializing_if = "Option::is_none")]
    pub qry_smiles: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One similarity hit: derived identity columns, the expanded alignment
/// record, and the scalar metric columns keyed by their configured names in
/// wire order. Metric values are opaque to this client and kept as raw JSON
/// numbers.
#[derive(Debug, Clone, Serialize)]
pub struct HitRow {
    pub smiles: String,
    pub name: String,
    #[serde(flatten)]
    pub alignment: AlignmentRecord,
    #[serde(flatten)]
    pub metrics: IndexMap<String, Value>,
}

/// Split a hit description on its first whitespace run: the leading token is
/// the structure, the remainder the molecule name.
fn split_description(description: &str) -> (&str, &str) {
    let mut parts = description.splitn(2, char::is_whitespace);
    let smiles = parts.next().unwrap_or("");
    let name = parts.next().map(str::trim_start).unwrap_or("");
    (smiles, name)
}

/// Expand a raw hit table into structured rows.
///
/// Rows whose leading element is not a decodable alignment record, or whose
/// description has no structure token, are dropped. An input that yields zero
/// surviving rows is the recoverable [`SearchError::EmptyTable`] outcome.
pub(crate) fn shape(table: &RawHitTable) -> Result<Vec<HitRow>, SearchError> {
    let mut rows = Vec::with_capacity(table.data.len());

    for raw in &table.data {
        let Some((head, tail)) = raw.split_first() else {
            continue;
        };

        let alignment: AlignmentRecord = match serde_json::from_value(head.clone()) {
            Ok(alignment) => alignment,
            Err(err) => {
                debug!(stage = "shape", error = %err, "skipping row with undecodable alignment record");
                continue;
            }
        };

        let (smiles, name) = split_description(&alignment.hit_smiles);
        if smiles.is_empty() {
            continue;
        }

        let metrics: IndexMap<String, Value> = metric_column_names()
            .zip(tail.iter().cloned())
            .map(|(column, value)| (column.to_string(), value))
            .collect();

        rows.push(HitRow {
            smiles: smiles.to_string(),
            name: name.to_string(),
            alignment,
            metrics,
        });
    }

    if rows.is_empty() {
        return Err(SearchError::EmptyTable);
    }
    Ok(rows)
}
