//! Chunked-upload arithmetic and payload parsing (PRD-31).
//!
//! Raw data arrives as numbered chunks per entity type, possibly out of
//! order and re-delivered. Everything here is a pure function of the
//! received set, which is what makes re-delivery a no-op and assembly
//! deterministic.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// A single parsed source row. Key order is preserved from the payload,
/// so the first row doubles as the header list for mapping suggestions.
pub type RawRow = Map<String, Value>;

/// Reject out-of-range chunk coordinates before anything is stored.
pub fn check_chunk_bounds(
    entity_type: &str,
    chunk_index: i32,
    total_chunks: i32,
) -> Result<(), CoreError> {
    if total_chunks < 1 {
        return Err(CoreError::Validation(format!(
            "total_chunks must be at least 1 for '{entity_type}', got {total_chunks}"
        )));
    }
    if chunk_index < 0 || chunk_index >= total_chunks {
        return Err(CoreError::Validation(format!(
            "chunk_index {chunk_index} out of range for '{entity_type}' (total_chunks {total_chunks})"
        )));
    }
    Ok(())
}

/// The total declared by the first chunk for an entity type is
/// authoritative; any later chunk must agree.
pub fn check_chunk_total(
    entity_type: &str,
    declared: i32,
    reported: i32,
) -> Result<(), CoreError> {
    if declared == reported {
        Ok(())
    } else {
        Err(CoreError::ChunkTotalMismatch {
            entity_type: entity_type.to_string(),
            declared,
            reported,
        })
    }
}

/// Chunk indexes still missing from a received set, ascending.
pub fn missing_indexes(total_chunks: i32, received: &[i32]) -> Vec<i32> {
    (0..total_chunks).filter(|i| !received.contains(i)).collect()
}

/// Parse a chunk payload into rows. The payload must be a JSON array of
/// objects; anything else is a caller error.
pub fn parse_chunk_rows(payload: &Value) -> Result<Vec<RawRow>, CoreError> {
    let items = payload
        .as_array()
        .ok_or_else(|| CoreError::Validation("chunk payload must be a JSON array".to_string()))?;

    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => rows.push(map.clone()),
            _ => {
                return Err(CoreError::Validation(format!(
                    "chunk payload row {i} is not a JSON object"
                )))
            }
        }
    }
    Ok(rows)
}

/// Source column names in left-to-right order, taken from the first row.
/// Empty when the dataset has no rows.
pub fn source_headers(rows: &[RawRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    // -- bounds --------------------------------------------------------------

    #[test]
    fn bounds_accept_valid_coordinates() {
        assert!(check_chunk_bounds("customer", 0, 1).is_ok());
        assert!(check_chunk_bounds("customer", 4, 5).is_ok());
    }

    #[test]
    fn bounds_reject_zero_total() {
        assert_matches!(
            check_chunk_bounds("customer", 0, 0),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn bounds_reject_index_at_or_past_total() {
        assert_matches!(
            check_chunk_bounds("customer", 3, 3),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            check_chunk_bounds("customer", -1, 3),
            Err(CoreError::Validation(_))
        );
    }

    // -- total agreement -----------------------------------------------------

    #[test]
    fn total_mismatch_names_entity_and_both_totals() {
        let err = check_chunk_total("product", 4, 6).unwrap_err();
        assert_matches!(
            err,
            CoreError::ChunkTotalMismatch {
                declared: 4,
                reported: 6,
                ..
            }
        );
        assert!(err.to_string().contains("product"));
    }

    #[test]
    fn total_agreement_passes() {
        assert!(check_chunk_total("product", 4, 4).is_ok());
    }

    // -- missing indexes -----------------------------------------------------

    #[test]
    fn missing_indexes_lists_gaps_ascending() {
        assert_eq!(missing_indexes(5, &[0, 2, 4]), vec![1, 3]);
        assert_eq!(missing_indexes(3, &[2, 1, 0]), Vec::<i32>::new());
        assert_eq!(missing_indexes(2, &[]), vec![0, 1]);
    }

    // -- payload parsing -----------------------------------------------------

    #[test]
    fn parse_rows_from_object_array() {
        let payload = json!([{"name": "Acme", "mail": "a@acme.test"}, {"name": "Beta"}]);
        let rows = parse_chunk_rows(&payload).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], json!("Acme"));
    }

    #[test]
    fn parse_preserves_key_order_for_headers() {
        let payload = json!([{"zeta": 1, "alpha": 2, "mid": 3}]);
        let rows = parse_chunk_rows(&payload).unwrap();
        assert_eq!(source_headers(&rows), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn parse_rejects_non_array_payload() {
        assert_matches!(
            parse_chunk_rows(&json!({"rows": []})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn parse_rejects_non_object_row() {
        let err = parse_chunk_rows(&json!([{"ok": 1}, 42])).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("row 1"));
    }

    #[test]
    fn headers_empty_for_empty_dataset() {
        assert!(source_headers(&[]).is_empty());
    }
}
