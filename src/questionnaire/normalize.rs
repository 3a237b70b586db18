use serde_json::Value;

/// Bounds for a plausible team or player ID. Values outside this range are
/// treated as malformed and dropped. Zero and negatives are always
/// rejected, never sign-flipped or passed through.
const MIN_VALID_ID: i64 = 1;
const MAX_VALID_ID: i64 = 10_000_000;

/// Normalizes a stored answer into a deduplicated list of IDs.
///
/// Answers arrive in two shapes: a single numeric-like value (legacy rows)
/// or an array of numeric-like values (current rows, where multiple IDs
/// represent a tie). Strings of digits are coerced, anything non-finite,
/// non-integral or out of range is dropped, and duplicates are removed
/// while keeping first-occurrence order.
pub fn normalize_answer(raw: &Value) -> Vec<i64> {
    let mut ids = Vec::new();

    match raw {
        Value::Array(items) => {
            for item in items {
                if let Some(id) = scalar_to_id(item) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        scalar => {
            if let Some(id) = scalar_to_id(scalar) {
                ids.push(id);
            }
        }
    }

    ids
}

fn scalar_to_id(value: &Value) -> Option<i64> {
    let candidate = match value {
        Value::Number(n) => match n.as_i64() {
            Some(whole) => whole,
            None => {
                let f = n.as_f64()?;
                if !f.is_finite() || f.fract() != 0.0 {
                    return None;
                }
                f as i64
            }
        },
        Value::String(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(whole) => whole,
                Err(_) => {
                    let f = trimmed.parse::<f64>().ok()?;
                    if !f.is_finite() || f.fract() != 0.0 {
                        return None;
                    }
                    f as i64
                }
            }
        }
        _ => return None,
    };

    (MIN_VALID_ID..=MAX_VALID_ID)
        .contains(&candidate)
        .then_some(candidate)
}

/// True iff any of the user's normalized predicted IDs appears in the
/// normalized valid-answer set.
///
/// This is the tie mechanism: when two teams share the best goal
/// difference, both IDs sit in `valid_answers` and predicting either one
/// scores. Either side normalizing to empty never matches.
pub fn prediction_matches(prediction: &Value, valid_answers: &Value) -> bool {
    let predicted = normalize_answer(prediction);
    let valid = normalize_answer(valid_answers);

    if predicted.is_empty() || valid.is_empty() {
        return false;
    }

    predicted.iter().any(|id| valid.contains(id))
}
