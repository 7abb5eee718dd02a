use crate::error::{DecodeError, RecipeApiError};
use crate::model::Recipe;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Where the list of recipes sits inside a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `{"<field>": [ ... ]}` (search uses `results`, random uses `recipes`)
    Wrapped(&'static str),
    /// `[ ... ]` at the top level (findByIngredients)
    BareArray,
}

/// Decode a recipe list, reporting the path of the first element that fails
pub fn decode_recipe_list(
    endpoint: &'static str,
    body: &[u8],
    envelope: Envelope,
) -> Result<Vec<Recipe>, RecipeApiError> {
    let root = parse_json(endpoint, body)?;

    let (items, prefix) = match (envelope, root) {
        (Envelope::BareArray, Value::Array(items)) => (items, String::new()),
        (Envelope::BareArray, other) => {
            return Err(shape_error(endpoint, None, "an array", &other));
        }
        (Envelope::Wrapped(field), Value::Object(mut map)) => match map.remove(field) {
            Some(Value::Array(items)) => (items, field.to_string()),
            Some(other) => return Err(shape_error(endpoint, Some(field), "an array", &other)),
            None => {
                return Err(DecodeError {
                    endpoint,
                    path: None,
                    message: format!("missing field `{}`", field),
                }
                .into())
            }
        },
        (Envelope::Wrapped(_), other) => {
            return Err(shape_error(endpoint, None, "an object", &other));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Recipe>(item).map_err(|e| {
                RecipeApiError::from(DecodeError {
                    endpoint,
                    path: Some(format!("{}[{}]", prefix, index)),
                    message: e.to_string(),
                })
            })
        })
        .collect()
}

/// Decode a single object from the body
pub fn decode_object<T: DeserializeOwned>(
    endpoint: &'static str,
    body: &[u8],
) -> Result<T, RecipeApiError> {
    let root = parse_json(endpoint, body)?;
    if !root.is_object() {
        return Err(shape_error(endpoint, None, "an object", &root));
    }
    serde_json::from_value(root).map_err(|e| {
        RecipeApiError::from(DecodeError {
            endpoint,
            path: None,
            message: e.to_string(),
        })
    })
}

fn parse_json(endpoint: &'static str, body: &[u8]) -> Result<Value, RecipeApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RecipeApiError::NoData);
    }
    serde_json::from_slice(body).map_err(|e| {
        RecipeApiError::from(DecodeError {
            endpoint,
            path: None,
            message: format!("invalid JSON: {}", e),
        })
    })
}

fn shape_error(
    endpoint: &'static str,
    path: Option<&str>,
    expected: &str,
    actual: &Value,
) -> RecipeApiError {
    DecodeError {
        endpoint,
        path: path.map(str::to_string),
        message: format!("expected {}, found {}", expected, json_type(actual)),
    }
    .into()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeDetail;

    fn decode_error(err: RecipeApiError) -> DecodeError {
        match err {
            RecipeApiError::Decode(e) => e,
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_results_preserve_order() {
        let body = br#"{"results":[{"id":3,"title":"C"},{"id":1,"title":"A"}],"totalResults":2}"#;
        let recipes = decode_recipe_list("search", body, Envelope::Wrapped("results")).unwrap();
        let ids: Vec<_> = recipes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_bare_array() {
        let body = br#"[{"id":5,"title":"Tacos","image":"x","usedIngredientCount":2}]"#;
        let recipes = decode_recipe_list("findByIngredients", body, Envelope::BareArray).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, 5);
        assert_eq!(recipes[0].used_ingredient_count, Some(2));
    }

    #[test]
    fn test_bare_array_expected_but_object_received() {
        let body = br#"{"results":[]}"#;
        let err = decode_error(
            decode_recipe_list("findByIngredients", body, Envelope::BareArray).unwrap_err(),
        );
        assert_eq!(err.message, "expected an array, found an object");
    }

    #[test]
    fn test_missing_wrapper_field() {
        let body = br#"{"status":"failure"}"#;
        let err =
            decode_error(decode_recipe_list("random", body, Envelope::Wrapped("recipes")).unwrap_err());
        assert_eq!(err.message, "missing field `recipes`");
    }

    #[test]
    fn test_bad_element_reports_path_and_types() {
        let body = br#"{"results":[{"id":1,"title":"ok"},{"id":"two","title":"bad"}]}"#;
        let err =
            decode_error(decode_recipe_list("search", body, Envelope::Wrapped("results")).unwrap_err());
        assert_eq!(err.path.as_deref(), Some("results[1]"));
        assert!(err.message.contains("invalid type"));
        assert!(err.message.contains("i64"));
    }

    #[test]
    fn test_empty_body_is_no_data() {
        let err = decode_recipe_list("search", b"  ", Envelope::Wrapped("results")).unwrap_err();
        assert_eq!(err, RecipeApiError::NoData);
    }

    #[test]
    fn test_invalid_json() {
        let err = decode_error(
            decode_object::<RecipeDetail>("information", b"<html>oops</html>").unwrap_err(),
        );
        assert!(err.message.starts_with("invalid JSON"));
    }

    #[test]
    fn test_object_expected() {
        let err = decode_error(decode_object::<RecipeDetail>("information", b"[]").unwrap_err());
        assert_eq!(err.message, "expected an object, found an array");
    }
}
