//! Sampling parameters sent with each completion request.
//!
//! Every parameter is optional; unset values are left out of the request so
//! the provider falls back to its own defaults. Values are validated against
//! the ranges the chat completions API accepts.

use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// Static description of one tunable parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo {
    pub name: &'static str,
    pub range: Option<(f32, f32)>,
    pub description: &'static str,
}

/// All parameters understood by [`ModelParameters::set`].
pub const PARAM_INFO: &[ParamInfo] = &[
    ParamInfo {
        name: "max_tokens",
        range: None,
        description: "Maximum number of tokens to generate.",
    },
    ParamInfo {
        name: "stream",
        range: None,
        description: "Whether to stream tokens as they are generated.",
    },
    ParamInfo {
        name: "temperature",
        range: Some((0.0, 2.0)),
        description: "Sampling randomness. Lower is more deterministic.",
    },
    ParamInfo {
        name: "top_p",
        range: Some((0.0, 1.0)),
        description: "Nucleus sampling mass. Prefer tuning this or temperature, not both.",
    },
    ParamInfo {
        name: "presence_penalty",
        range: Some((0.0, 2.0)),
        description: "Penalty for tokens already present in the context.",
    },
    ParamInfo {
        name: "frequency_penalty",
        range: Some((0.0, 2.0)),
        description: "Penalty proportional to how often a token has appeared.",
    },
];

/// Sampling parameters for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default)]
    pub stream: bool,
}

impl ModelParameters {
    /// Set a parameter from its textual form.
    ///
    /// `none`, `unset` and `remove` clear an optional parameter; `zero` is
    /// accepted as `0`. Booleans accept the usual yes/no spellings.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), ParamError> {
        let value = raw.trim().to_lowercase();
        let cleared = matches!(value.as_str(), "none" | "unset" | "remove");
        let value = if value == "zero" { "0".to_string() } else { value };

        match name {
            "max_tokens" => {
                self.max_tokens = if cleared {
                    None
                } else {
                    Some(value.parse().map_err(|_| ParamError::BadValue {
                        name: "max_tokens",
                        expected: "a non-negative integer",
                        value: raw.to_string(),
                    })?)
                };
            }
            "stream" => {
                self.stream = parse_bool(&value).ok_or_else(|| ParamError::BadValue {
                    name: "stream",
                    expected: "true or false",
                    value: raw.to_string(),
                })?;
            }
            "temperature" => self.temperature = ranged("temperature", &value, raw, cleared)?,
            "top_p" => self.top_p = ranged("top_p", &value, raw, cleared)?,
            "presence_penalty" => {
                self.presence_penalty = ranged("presence_penalty", &value, raw, cleared)?
            }
            "frequency_penalty" => {
                self.frequency_penalty = ranged("frequency_penalty", &value, raw, cleared)?
            }
            other => return Err(ParamError::Unknown(other.to_string())),
        }
        Ok(())
    }

    /// Check that every set value is within its documented range.
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("temperature", self.temperature),
            ("top_p", self.top_p),
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ] {
            if let Some(v) = value {
                check_range(info(name), v)?;
            }
        }
        Ok(())
    }

    /// One line per parameter, showing the current value and its range.
    pub fn describe(&self) -> Vec<String> {
        PARAM_INFO
            .iter()
            .map(|p| {
                let current = match p.name {
                    "max_tokens" => fmt_opt(self.max_tokens),
                    "stream" => self.stream.to_string(),
                    "temperature" => fmt_opt(self.temperature),
                    "top_p" => fmt_opt(self.top_p),
                    "presence_penalty" => fmt_opt(self.presence_penalty),
                    _ => fmt_opt(self.frequency_penalty),
                };
                match p.range {
                    Some((lo, hi)) => format!("{} = {current} ({lo}-{hi}) {}", p.name, p.description),
                    None => format!("{} = {current} {}", p.name, p.description),
                }
            })
            .collect()
    }
}

/// Parse a human boolean: true/t/yes/y/1/on and false/f/no/n/0/off.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn info(name: &str) -> &'static ParamInfo {
    PARAM_INFO
        .iter()
        .find(|p| p.name == name)
        .unwrap_or(&PARAM_INFO[0])
}

fn ranged(
    name: &'static str,
    value: &str,
    raw: &str,
    cleared: bool,
) -> Result<Option<f32>, ParamError> {
    if cleared {
        return Ok(None);
    }
    let parsed: f32 = value.parse().map_err(|_| ParamError::BadValue {
        name,
        expected: "a number",
        value: raw.to_string(),
    })?;
    check_range(info(name), parsed)?;
    Ok(Some(parsed))
}

fn check_range(info: &ParamInfo, value: f32) -> Result<(), ParamError> {
    if let Some((min, max)) = info.range {
        if !(min..=max).contains(&value) {
            return Err(ParamError::OutOfRange {
                name: info.name,
                min,
                max,
                value,
            });
        }
    }
    Ok(())
}

fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unset".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_temperature() {
        let mut params = ModelParameters::default();
        params.set("temperature", "0.7").unwrap();
        assert_eq!(params.temperature, Some(0.7));
    }

    #[test]
    fn test_zero_and_none_keywords() {
        let mut params = ModelParameters::default();
        params.set("temperature", "zero").unwrap();
        assert_eq!(params.temperature, Some(0.0));
        params.set("temperature", "None").unwrap();
        assert_eq!(params.temperature, None);
        params.set("max_tokens", "500").unwrap();
        params.set("max_tokens", "unset").unwrap();
        assert_eq!(params.max_tokens, None);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut params = ModelParameters::default();
        let err = params.set("top_p", "1.5").unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { name: "top_p", .. }));
        assert_eq!(params.top_p, None);
    }

    #[test]
    fn test_negative_max_tokens_rejected() {
        let mut params = ModelParameters::default();
        assert!(matches!(
            params.set("max_tokens", "-3"),
            Err(ParamError::BadValue { name: "max_tokens", .. })
        ));
    }

    #[test]
    fn test_unknown_param() {
        let mut params = ModelParameters::default();
        assert_eq!(
            params.set("top_k", "3"),
            Err(ParamError::Unknown("top_k".to_string()))
        );
    }

    #[test]
    fn test_stream_bool() {
        let mut params = ModelParameters::default();
        params.set("stream", "yes").unwrap();
        assert!(params.stream);
        params.set("stream", "off").unwrap();
        assert!(!params.stream);
        assert!(params.set("stream", "maybe").is_err());
    }

    #[test]
    fn test_validate_catches_deserialized_values() {
        let params: ModelParameters =
            serde_json::from_str(r#"{"presence_penalty": 4.0}"#).unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_describe_lists_every_param() {
        let lines = ModelParameters::default().describe();
        assert_eq!(lines.len(), PARAM_INFO.len());
        assert!(lines.iter().any(|l| l.starts_with("temperature = unset (0-2)")));
    }

    #[test]
    fn test_parse_bool() {
        for s in ["true", "T", "yes", "y", "1", "on"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        assert_eq!(parse_bool("nah"), None);
    }
}
