use serde::{Deserialize, Serialize};

/// Upper bounds applied while parsing, so a pathological string is rejected
/// with [`SmartsError::ResourceLimit`](super::SmartsError::ResourceLimit)
/// instead of growing memory without bound.
///
/// Missing fields take their default when deserialized, so a config file only
/// needs to name the limits it changes:
///
/// ```
/// use smartscrab::ParseLimits;
///
/// let limits: ParseLimits = serde_json::from_str(r#"{ "max_atoms": 64 }"#).unwrap();
/// assert_eq!(limits.max_atoms, 64);
/// assert_eq!(limits.max_input_len, ParseLimits::default().max_input_len);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    /// Maximum input length in characters.
    pub max_input_len: usize,
    /// Maximum number of atoms, counting atoms of recursive sub-queries.
    pub max_atoms: usize,
    /// Maximum number of ring closures open at the same time.
    pub max_open_ring_closures: usize,
    /// Maximum nesting of `!` chains and `$(...)` recursive queries.
    pub max_recursion_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_input_len: 64 * 1024,
            max_atoms: 10_000,
            max_open_ring_closures: 100,
            max_recursion_depth: 32,
        }
    }
}

impl ParseLimits {
    /// No practical limit on anything.
    pub fn unlimited() -> Self {
        Self {
            max_input_len: usize::MAX,
            max_atoms: usize::MAX,
            max_open_ring_closures: usize::MAX,
            max_recursion_depth: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let limits: ParseLimits =
            serde_json::from_str(r#"{ "max_open_ring_closures": 4 }"#).unwrap();
        assert_eq!(limits.max_open_ring_closures, 4);
        assert_eq!(limits.max_atoms, ParseLimits::default().max_atoms);
        assert_eq!(limits.max_recursion_depth, 32);
    }

    #[test]
    fn serializes_every_field() {
        let json = serde_json::to_value(ParseLimits::default()).unwrap();
        assert_eq!(json["max_input_len"], 65536);
        assert_eq!(json["max_atoms"], 10000);
    }
}
