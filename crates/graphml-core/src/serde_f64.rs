use serde::{Deserialize, Deserializer, Serializer};

use crate::value::fmt_double;

/// Whole numbers serialize as JSON integers (no `.0`). NaN and infinities
/// have no JSON number form and are written as their GraphML text.
pub fn ser_f64_compact<S>(v: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if !v.is_finite() {
        return s.serialize_str(&fmt_double(*v));
    }

    // Normalize -0.0 -> 0
    let v = if *v == 0.0 { 0.0 } else { *v };

    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        return s.serialize_i64(v as i64);
    }

    s.serialize_f64(v)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accepts what [`ser_f64_compact`] produces: integer or float numbers, or
/// the `NaN`/`Infinity`/`-Infinity` strings.
pub fn de_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(d)? {
        NumberOrText::Number(v) => Ok(if v == 0.0 { 0.0 } else { v }),
        NumberOrText::Text(text) => text
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a floating point value: {text}"))),
    }
}
