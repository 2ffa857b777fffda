//! Query parameter tables for the submission and hit-list endpoints.
//!
//! The hit-list view speaks the DataTables wire dialect: one parameter block
//! per result column plus global ordering/search entries. The column table is
//! fixed at build time; only the thresholds and the input structure vary per
//! run.

use super::types::{HitListId, SearchConfig};

pub(crate) const SUBMIT_ENDPOINT: &str = "search/submit";
pub(crate) const VIEW_ENDPOINT: &str = "search/view";

pub(crate) const HITLIST_START: usize = 0;
pub(crate) const HITLIST_LENGTH: usize = 300;
pub(crate) const HITLIST_DRAW: usize = 0;

/// One column of the hit-list view.
pub(crate) struct ColumnSpec {
    pub name: &'static str,
    pub orderable: bool,
    /// Range filter sent as the column's `search[value]`, empty for none.
    pub range: &'static str,
}

/// The 17 columns of the hit-list view, in wire order. Column 0 is the
/// nested alignment record; the rest are scalar metrics.
pub(crate) const COLUMNS: [ColumnSpec; 17] = [
    ColumnSpec {
        name: "alignment",
        orderable: false,
        range: "",
    },
    ColumnSpec {
        name: "dist",
        orderable: true,
        range: "0-12",
    },
    ColumnSpec {
        name: "ecfp4",
        orderable: true,
        range: "",
    },
    ColumnSpec {
        name: "daylight",
        orderable: true,
        range: "",
    },
    ColumnSpec {
        name: "topodist",
        orderable: true,
        range: "0-8",
    },
    ColumnSpec {
        name: "mces",
        orderable: true,
        range: "",
    },
    ColumnSpec {
        name: "tdn",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "tup",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "rdn",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "rup",
        orderable: true,
        range: "0-2",
    },
    ColumnSpec {
        name: "ldn",
        orderable: true,
        range: "0-2",
    },
    ColumnSpec {
        name: "lup",
        orderable: true,
        range: "0-2",
    },
    ColumnSpec {
        name: "mut",
        orderable: true,
        range: "",
    },
    ColumnSpec {
        name: "maj",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "min",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "hyb",
        orderable: true,
        range: "0-6",
    },
    ColumnSpec {
        name: "sub",
        orderable: true,
        range: "0-6",
    },
];

/// Names of the scalar metric columns (everything after the alignment
/// record), in wire order.
pub(crate) fn metric_column_names() -> impl Iterator<Item = &'static str> {
    COLUMNS[1..].iter().map(|col| col.name)
}

/// Parameters for the submission endpoint: the run thresholds plus the input
/// structure. The structure is passed through verbatim; malformed input is
/// rejected by the service, not locally.
pub(crate) fn submit_params(config: &SearchConfig, smiles: &str) -> Vec<(String, String)> {
    vec![
        ("smi".to_string(), smiles.to_string()),
        ("db".to_string(), config.db.clone()),
        ("dist".to_string(), config.dist.to_string()),
        ("sdist".to_string(), config.sdist.to_string()),
        ("tdn".to_string(), config.tdn.to_string()),
        ("tup".to_string(), config.tup.to_string()),
        ("rdn".to_string(), config.rdn.to_string()),
        ("rup".to_string(), config.rup.to_string()),
        ("ldn".to_string(), config.ldn.to_string()),
        ("lup".to_string(), config.lup.to_string()),
        ("maj".to_string(), config.maj.to_string()),
        ("min".to_string(), config.min.to_string()),
        ("sub".to_string(), config.sub.to_string()),
        ("scores".to_string(), config.scores.clone()),
    ]
}

/// Parameters for the hit-list view: the correlated id, the fixed pagination
/// window, and the full per-column block.
pub(crate) fn hitlist_params(id: &HitListId) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(COLUMNS.len() * 6 + 8);
    params.push(("hlid".to_string(), id.as_str().to_string()));
    params.push(("start".to_string(), HITLIST_START.to_string()));
    params.push(("length".to_string(), HITLIST_LENGTH.to_string()));
    params.push(("draw".to_string(), HITLIST_DRAW.to_string()));

    for (index, col) in COLUMNS.iter().enumerate() {
        params.push((format!("columns[{index}][data]"), index.to_string()));
        params.push((format!("columns[{index}][name]"), col.name.to_string()));
        params.push((format!("columns[{index}][searchable]"), "true".to_string()));
        params.push((
            format!("columns[{index}][orderable]"),
            col.orderable.to_string(),
        ));
        params.push((
            format!("columns[{index}][search][value]"),
            col.range.to_string(),
        ));
        params.push((
            format!("columns[{index}][search][regex]"),
            "false".to_string(),
        ));
    }

    params.push(("order[0][column]".to_string(), "0".to_string()));
    params.push(("order[0][dir]".to_string(), "asc".to_string()));
    params.push(("search[value]".to_string(), String::new()));
    params.push(("search[regex]".to_string(), "false".to_string()));
    params
}
