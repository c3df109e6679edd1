pub mod ingestion;
pub mod question_set;
pub mod student;
pub mod submission;

/// Serde helper for integer fields that legacy documents (and JSON clients)
/// sometimes carry as strings, e.g. `"regno": "2113"` or `"Time": "30"`.
pub(crate) mod lenient_int {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrText {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<i64>,
    {
        let value = match IntOrText::deserialize(deserializer)? {
            IntOrText::Int(value) => value,
            IntOrText::Float(value) if value.is_finite() => value.trunc() as i64,
            IntOrText::Float(value) => {
                return Err(de::Error::custom(format!("expected integer, got {}", value)))
            }
            IntOrText::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i64)
                .ok_or_else(|| de::Error::custom(format!("expected integer, got {:?}", text)))?,
        };
        T::try_from(value).map_err(|_| de::Error::custom(format!("integer {} out of range", value)))
    }
}
