// Parsing of the `resultSets` envelope returned by the dashboard endpoints.

use ptstats_core::RawRow;
use serde::Deserialize;
use serde_json::Value;

use crate::http::FetchError;

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

/// Turn `resultSets[index]` into header -> value rows.
pub fn result_set_rows(
    endpoint: &str,
    body: Value,
    index: usize,
) -> Result<Vec<RawRow>, FetchError> {
    let shape = |message: String| FetchError::Shape {
        endpoint: endpoint.to_string(),
        message,
    };

    let envelope: StatsEnvelope =
        serde_json::from_value(body).map_err(|e| shape(format!("bad envelope: {e}")))?;
    let set_count = envelope.result_sets.len();
    let set = envelope
        .result_sets
        .into_iter()
        .nth(index)
        .ok_or_else(|| shape(format!("result set {index} missing ({set_count} present)")))?;

    let headers = set.headers;
    set.row_set
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != headers.len() {
                return Err(shape(format!(
                    "row {i} has {} values for {} headers",
                    row.len(),
                    headers.len()
                )));
            }
            Ok(headers.iter().cloned().zip(row).collect::<RawRow>())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zips_headers_with_each_row() {
        let body = json!({
            "resource": "leaguedashptstats",
            "resultSets": [{
                "name": "LeagueDashPtStats",
                "headers": ["TEAM_ID", "TEAM_ABBREVIATION", "DRIVES"],
                "rowSet": [
                    [1610612737, "ATL", 3012],
                    [1610612738, "BOS", 2870],
                ],
            }],
        });
        let rows = result_set_rows("leaguedashptstats", body, 0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["TEAM_ABBREVIATION"], json!("BOS"));
        assert_eq!(rows[0]["DRIVES"], json!(3012));
    }

    #[test]
    fn empty_row_set_is_no_rows() {
        let body = json!({ "resultSets": [{ "headers": ["TEAM_ID"], "rowSet": [] }] });
        assert!(result_set_rows("x", body, 0).unwrap().is_empty());
    }

    #[test]
    fn missing_result_set_is_a_shape_error() {
        let body = json!({ "resultSets": [] });
        let err = result_set_rows("leaguedashteamptshot", body, 0).unwrap_err();
        assert!(matches!(err, FetchError::Shape { ref endpoint, .. } if endpoint == "leaguedashteamptshot"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let body = json!({
            "resultSets": [{ "headers": ["A", "B"], "rowSet": [[1]] }],
        });
        assert!(result_set_rows("x", body, 0).is_err());
    }
}
