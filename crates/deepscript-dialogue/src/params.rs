//! Request parameters for dialogue generation.
//!
//! Every numeric knob is clamped into a fixed range, so out-of-range
//! input is corrected rather than rejected. Only values that cannot be
//! read as a number at all produce a [`ParamError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use deepscript_model::SamplingParams;

use crate::Emotion;

pub const NUM_EXCHANGES_RANGE: (i64, i64) = (1, 5);
pub const MAX_TURN_LENGTH_RANGE: (i64, i64) = (20, 80);
pub const TEMPERATURE_RANGE: (f64, f64) = (0.1, 1.0);
pub const TOP_K_RANGE: (i64, i64) = (10, 100);
pub const TOP_P_RANGE: (f64, f64) = (0.5, 1.0);
pub const REPETITION_PENALTY_RANGE: (f64, f64) = (1.0, 2.0);

/// The local model blocks any 4-gram from repeating within a turn.
pub const NO_REPEAT_NGRAM_SIZE: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ParamError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ParamError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Loosely-typed parameters as they arrive from a client.
///
/// Values may be JSON numbers or numeric strings; `null` or a missing
/// key means "use the default".
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawParams {
    #[serde(default)]
    pub emotion: Option<Value>,
    #[serde(default)]
    pub num_exchanges: Option<Value>,
    #[serde(default)]
    pub max_turn_length: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub top_k: Option<Value>,
    #[serde(default)]
    pub top_p: Option<Value>,
    #[serde(default)]
    pub repetition_penalty: Option<Value>,
}

/// Effective, clamped generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueParams {
    /// Canonical label for known emotions, otherwise the client's text
    pub emotion: String,
    pub num_exchanges: usize,
    pub max_turn_length: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repetition_penalty: f64,
}

impl Default for DialogueParams {
    fn default() -> Self {
        Self {
            emotion: Emotion::default().to_string(),
            num_exchanges: 3,
            max_turn_length: 50,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.85,
            repetition_penalty: 1.5,
        }
    }
}

impl DialogueParams {
    /// Parse and clamp raw client values.
    pub fn from_raw(raw: &RawParams) -> Result<Self, ParamError> {
        let defaults = Self::default();

        let emotion = match &raw.emotion {
            None => defaults.emotion,
            Some(Value::String(s)) if s.trim().is_empty() => defaults.emotion,
            // Labels outside the known set still reach the template verbatim
            Some(Value::String(s)) => s
                .parse::<Emotion>()
                .map(|e| e.to_string())
                .unwrap_or_else(|_| s.trim().to_string()),
            Some(other) => {
                return Err(ParamError::invalid(
                    "emotion",
                    format!("expected a string, got {}", other),
                ))
            }
        };

        let num_exchanges = clamp_int(
            int_or("num_exchanges", &raw.num_exchanges, defaults.num_exchanges)?,
            NUM_EXCHANGES_RANGE,
        );
        let max_turn_length = clamp_int(
            int_or(
                "max_turn_length",
                &raw.max_turn_length,
                defaults.max_turn_length,
            )?,
            MAX_TURN_LENGTH_RANGE,
        );
        let temperature = clamp_float(
            float_or("temperature", &raw.temperature, defaults.temperature)?,
            TEMPERATURE_RANGE,
        );
        let top_k = clamp_int(int_or("top_k", &raw.top_k, defaults.top_k)?, TOP_K_RANGE);
        let top_p = clamp_float(float_or("top_p", &raw.top_p, defaults.top_p)?, TOP_P_RANGE);
        let repetition_penalty = clamp_float(
            float_or(
                "repetition_penalty",
                &raw.repetition_penalty,
                defaults.repetition_penalty,
            )?,
            REPETITION_PENALTY_RANGE,
        );

        Ok(Self {
            emotion,
            num_exchanges,
            max_turn_length,
            temperature,
            top_k,
            top_p,
            repetition_penalty,
        })
    }

    /// Sampling settings for one turn.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            max_new_tokens: self.max_turn_length,
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty as f32,
            no_repeat_ngram_size: NO_REPEAT_NGRAM_SIZE,
            seed: None,
        }
    }
}

fn int_or(field: &'static str, value: &Option<Value>, default: usize) -> Result<i64, ParamError> {
    match value {
        None => Ok(default as i64),
        Some(v) => parse_int(field, v),
    }
}

fn float_or(field: &'static str, value: &Option<Value>, default: f64) -> Result<f64, ParamError> {
    match value {
        None => Ok(default),
        Some(v) => parse_float(field, v),
    }
}

/// Integers accept whole numbers, floats (truncated toward zero) and
/// integer strings.
fn parse_int(field: &'static str, value: &Value) -> Result<i64, ParamError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                let f = n
                    .as_f64()
                    .ok_or_else(|| ParamError::invalid(field, format!("invalid number {}", n)))?;
                if f.is_finite() {
                    Ok(f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
                } else {
                    Err(ParamError::invalid(field, format!("invalid number {}", n)))
                }
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            ParamError::invalid(field, format!("invalid literal for int: '{}'", s))
        }),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(ParamError::invalid(
            field,
            format!("expected a number, got {}", other),
        )),
    }
}

fn parse_float(field: &'static str, value: &Value) -> Result<f64, ParamError> {
    let f = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ParamError::invalid(field, format!("invalid number {}", n)))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            ParamError::invalid(
                field,
                format!("could not convert string to float: '{}'", s),
            )
        })?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        other => {
            return Err(ParamError::invalid(
                field,
                format!("expected a number, got {}", other),
            ))
        }
    };

    // Infinities clamp to a bound; NaN has no place in any range
    if f.is_nan() {
        Err(ParamError::invalid(field, format!("not a number: {}", f)))
    } else {
        Ok(f)
    }
}

fn clamp_int(value: i64, (min, max): (i64, i64)) -> usize {
    value.clamp(min, max) as usize
}

fn clamp_float(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_when_missing_or_null() {
        let params = DialogueParams::from_raw(&raw(json!({"temperature": null}))).unwrap();
        assert_eq!(params, DialogueParams::default());
    }

    #[test]
    fn test_clamps_out_of_range_values() {
        let params = DialogueParams::from_raw(&raw(json!({
            "num_exchanges": 99,
            "max_turn_length": 1,
            "temperature": 5.0,
            "top_k": -3,
            "top_p": 0.0,
            "repetition_penalty": 0.2
        })))
        .unwrap();

        assert_eq!(params.num_exchanges, 5);
        assert_eq!(params.max_turn_length, 20);
        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.top_k, 10);
        assert_eq!(params.top_p, 0.5);
        assert_eq!(params.repetition_penalty, 1.0);
    }

    #[test]
    fn test_clamping_holds_for_sweep_of_inputs() {
        let samples = [
            json!(-1e12),
            json!(-7),
            json!(0),
            json!(0.05),
            json!(0.75),
            json!(1),
            json!(3.9),
            json!(42),
            json!(1e12),
            json!("12"),
            json!("0.3"),
        ];

        for sample in &samples {
            let r = RawParams {
                temperature: Some(sample.clone()),
                top_p: Some(sample.clone()),
                repetition_penalty: Some(sample.clone()),
                ..Default::default()
            };
            let p = DialogueParams::from_raw(&r).unwrap();
            assert!((0.1..=1.0).contains(&p.temperature), "{:?}", sample);
            assert!((0.5..=1.0).contains(&p.top_p), "{:?}", sample);
            assert!((1.0..=2.0).contains(&p.repetition_penalty), "{:?}", sample);

            // "0.3" is not an integer literal, every other sample is
            let r = RawParams {
                num_exchanges: Some(sample.clone()),
                max_turn_length: Some(sample.clone()),
                top_k: Some(sample.clone()),
                ..Default::default()
            };
            match DialogueParams::from_raw(&r) {
                Ok(p) => {
                    assert!((1..=5).contains(&p.num_exchanges));
                    assert!((20..=80).contains(&p.max_turn_length));
                    assert!((10..=100).contains(&p.top_k));
                }
                Err(_) => assert_eq!(sample, &json!("0.3")),
            }
        }
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let params = DialogueParams::from_raw(&raw(json!({
            "num_exchanges": "2",
            "temperature": "0.4",
            "top_k": " 55 "
        })))
        .unwrap();

        assert_eq!(params.num_exchanges, 2);
        assert!((params.temperature - 0.4).abs() < 1e-9);
        assert_eq!(params.top_k, 55);
    }

    #[test]
    fn test_float_for_int_field_truncates() {
        let params = DialogueParams::from_raw(&raw(json!({"num_exchanges": 4.9}))).unwrap();
        assert_eq!(params.num_exchanges, 4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = DialogueParams::from_raw(&raw(json!({"num_exchanges": "many"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "num_exchanges: invalid literal for int: 'many'"
        );

        let err = DialogueParams::from_raw(&raw(json!({"temperature": "hot"}))).unwrap_err();
        assert!(err.to_string().starts_with("temperature:"));

        let err = DialogueParams::from_raw(&raw(json!({"top_p": [0.9]}))).unwrap_err();
        assert!(err.to_string().starts_with("top_p:"));

        let err = DialogueParams::from_raw(&raw(json!({"temperature": "NaN"}))).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_infinite_floats_clamp_to_bounds() {
        let params = DialogueParams::from_raw(&raw(json!({
            "temperature": "inf",
            "top_p": "-infinity",
            "repetition_penalty": "Infinity"
        })))
        .unwrap();

        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.top_p, 0.5);
        assert_eq!(params.repetition_penalty, 2.0);
    }

    #[test]
    fn test_booleans_count_as_zero_or_one() {
        let params = DialogueParams::from_raw(&raw(json!({
            "top_k": true,
            "num_exchanges": false,
            "temperature": true
        })))
        .unwrap();

        assert_eq!(params.top_k, 10);
        assert_eq!(params.num_exchanges, 1);
        assert_eq!(params.temperature, 1.0);
    }

    #[test]
    fn test_emotion_parsing() {
        let params = DialogueParams::from_raw(&raw(json!({"emotion": "Joy"}))).unwrap();
        assert_eq!(params.emotion, "joy");

        let params = DialogueParams::from_raw(&raw(json!({"emotion": " happy "}))).unwrap();
        assert_eq!(params.emotion, "happy");

        let params = DialogueParams::from_raw(&raw(json!({"emotion": "  "}))).unwrap();
        assert_eq!(params.emotion, "neutral");

        assert!(DialogueParams::from_raw(&raw(json!({"emotion": 3}))).is_err());
    }

    #[test]
    fn test_sampling_carries_turn_length_and_ngram_size() {
        let params = DialogueParams {
            max_turn_length: 64,
            repetition_penalty: 1.25,
            ..Default::default()
        };
        let sampling = params.sampling();
        assert_eq!(sampling.max_new_tokens, 64);
        assert_eq!(sampling.no_repeat_ngram_size, 4);
        assert!((sampling.repetition_penalty - 1.25).abs() < f32::EPSILON);
    }
}
