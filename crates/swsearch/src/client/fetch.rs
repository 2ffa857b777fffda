//! Hit-list retrieval for a correlated search.

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::SmallWorldClient;
use super::params::{VIEW_ENDPOINT, hitlist_params};
use super::types::{HitListId, SearchError};

/// Raw hit table as returned by the view endpoint. Each row is an ordered
/// sequence whose first element is the nested alignment record and whose
/// remaining elements line up with the scalar metric columns.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawHitTable {
    #[serde(rename = "recordsTotal", default)]
    pub records_total: u64,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/// Exchange a hit-list id for the raw hit table.
///
/// The id is consumed by exactly one fetch. Zero reported records and a
/// missing or empty `data` field are recoverable "no data" outcomes, not
/// failures; the caller collapses them to an empty result set. A connection
/// cut while the body is being read is tolerated the same way the
/// submission stream tolerates it: whatever bytes arrived are parsed.
pub(crate) async fn fetch(
    client: &SmallWorldClient,
    id: &HitListId,
) -> Result<RawHitTable, SearchError> {
    let url = client.endpoint(VIEW_ENDPOINT)?;
    let params = hitlist_params(id);
    let response = client.send_get("hitlist", url, params).await?;

    let payload = read_body_tolerant(response).await;
    let table: RawHitTable =
        serde_json::from_slice(&payload).map_err(|err| SearchError::json("hitlist", err))?;

    if table.records_total == 0 {
        debug!(stage = "hitlist", hlid = %id, "reply reported zero records");
        return Err(SearchError::NoHits);
    }
    if table.data.is_empty() {
        debug!(stage = "hitlist", hlid = %id, "reply carried no data rows");
        return Err(SearchError::EmptyReply);
    }

    Ok(table)
}

/// Accumulate the response body, treating a mid-read transport error as
/// truncation rather than failure.
async fn read_body_tolerant(response: reqwest::Response) -> Vec<u8> {
    let mut stream = response.bytes_stream();
    let mut payload = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => payload.extend_from_slice(&bytes),
            Err(err) => {
                warn!(
                    stage = "hitlist",
                    error = %err,
                    "hit-list body truncated; parsing what arrived"
                );
                break;
            }
        }
    }
    payload
}
