use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::{ValidationError, now_rfc3339, required};
use crate::db::{Document, ID_FIELD, check_field};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTutorRequest {
    #[serde(rename = "tutorName", alias = "name")]
    pub name: Option<String>,
    pub language: Option<String>,
    pub price: Option<Value>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTutor {
    #[serde(rename = "tutorName")]
    pub name: String,
    pub language: String,
    pub price: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub review: i64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Non-negative finite price, from a JSON number or a numeric string.
fn parse_price(value: &Value) -> Result<Number, ValidationError> {
    let invalid = || ValidationError::new("price must be a non-negative number");
    let number = match value {
        Value::Number(n) => n.clone(),
        Value::String(s) => {
            let parsed: f64 = s.trim().parse().map_err(|_| invalid())?;
            Number::from_f64(parsed).ok_or_else(invalid)?
        }
        _ => return Err(invalid()),
    };

    match number.as_f64() {
        Some(p) if p.is_finite() && p >= 0.0 => Ok(number),
        _ => Err(invalid()),
    }
}

impl NewTutorRequest {
    pub fn validate(self) -> Result<NewTutor, ValidationError> {
        if self.name.is_none() || self.language.is_none() || matches!(self.price, None | Some(Value::Null)) {
            return Err(ValidationError::new("tutorName, language and price are required"));
        }

        let name = required(self.name, "tutorName")?;
        let language = required(self.language, "language")?;
        let price = parse_price(self.price.as_ref().unwrap_or(&Value::Null))?;

        Ok(NewTutor {
            name,
            language,
            price,
            description: self.description,
            image: self.image,
            review: 0,
            created_at: now_rfc3339(),
        })
    }
}

/// Checks a PATCH body for a tutor. Any field may be set, but known fields
/// keep their types. The id is never writable.
pub fn validate_tutor_patch(mut patch: Document) -> Result<Document, ValidationError> {
    patch.remove(ID_FIELD);
    if patch.is_empty() {
        return Err(ValidationError::new("No fields to update"));
    }

    for (field, value) in patch.iter_mut() {
        if check_field(field).is_err() {
            return Err(ValidationError::new(format!("Invalid field name: {}", field)));
        }

        match field.as_str() {
            "price" => *value = Value::Number(parse_price(value)?),
            "review" => {
                if !matches!(value.as_i64(), Some(n) if n >= 0) {
                    return Err(ValidationError::new("review must be a non-negative integer"));
                }
            }
            "tutorName" | "language" => {
                if !matches!(value.as_str(), Some(s) if !s.trim().is_empty()) {
                    return Err(ValidationError::new(format!("{} must be a non-empty string", field)));
                }
            }
            "description" | "image" => {
                if !(value.is_string() || value.is_null()) {
                    return Err(ValidationError::new(format!("{} must be a string", field)));
                }
            }
            "createdAt" => return Err(ValidationError::new("createdAt cannot be changed")),
            _ => {}
        }
    }

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> NewTutorRequest {
        serde_json::from_value(body).expect("valid request json")
    }

    #[test]
    fn new_tutor_starts_with_zero_reviews() {
        let tutor = request(json!({ "tutorName": "Ana", "language": "Spanish", "price": 20 }))
            .validate()
            .expect("valid tutor");

        assert_eq!(tutor.name, "Ana");
        assert_eq!(tutor.review, 0);
        assert_eq!(tutor.price.as_i64(), Some(20));
    }

    #[test]
    fn price_accepts_numeric_strings() {
        let tutor = request(json!({ "tutorName": "Ana", "language": "Spanish", "price": " 12.5 " }))
            .validate()
            .expect("valid tutor");
        assert_eq!(tutor.price.as_f64(), Some(12.5));
    }

    #[test]
    fn missing_fields_are_rejected() {
        for body in [
            json!({ "language": "Spanish", "price": 20 }),
            json!({ "tutorName": "Ana", "price": 20 }),
            json!({ "tutorName": "Ana", "language": "Spanish" }),
            json!({ "tutorName": "Ana", "language": "Spanish", "price": null }),
            json!({ "tutorName": "  ", "language": "Spanish", "price": 20 }),
        ] {
            assert!(request(body.clone()).validate().is_err(), "accepted {}", body);
        }
    }

    #[test]
    fn bad_prices_are_rejected() {
        for price in [json!(-1), json!("abc"), json!(true), json!([20])] {
            let body = json!({ "tutorName": "Ana", "language": "Spanish", "price": price });
            assert_eq!(
                request(body).validate().unwrap_err(),
                ValidationError::new("price must be a non-negative number")
            );
        }
    }

    #[test]
    fn patch_keeps_arbitrary_fields_and_drops_id() {
        let patch = json!({ "_id": "x", "bio": "hello", "price": "30" });
        let Value::Object(patch) = patch else { unreachable!() };

        let checked = validate_tutor_patch(patch).expect("valid patch");
        assert!(!checked.contains_key("_id"));
        assert_eq!(checked["bio"], "hello");
        assert_eq!(checked["price"].as_f64(), Some(30.0));
    }

    #[test]
    fn patch_rejects_bad_known_fields() {
        for patch in [
            json!({}),
            json!({ "_id": "x" }),
            json!({ "review": 1.5 }),
            json!({ "language": 3 }),
            json!({ "description": 42 }),
            json!({ "image": { "url": "a.png" } }),
            json!({ "first name": "x" }),
            json!({ "meta.level": "B2" }),
        ] {
            let Value::Object(patch) = patch else { unreachable!() };
            assert!(validate_tutor_patch(patch).is_err());
        }
    }
}
