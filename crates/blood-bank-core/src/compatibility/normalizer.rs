//! Reference name normalizer.
//!
//! Handles:
//! - Blood type spellings ("a pos", "AB negative", "0-" → "A+", "AB-", "O-")
//! - Component aliases (PRBC → Red Blood Cells, FFP → Plasma)
//!
//! Unrecognised input is returned trimmed so lookups report the caller's text.

use std::collections::HashMap;

/// Normalizer for user-entered reference names.
pub struct ReferenceNormalizer {
    /// Component alias map: lowercase alias → canonical name
    component_aliases: HashMap<String, String>,
}

impl Default for ReferenceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceNormalizer {
    /// Create a new normalizer with default mappings.
    pub fn new() -> Self {
        Self {
            component_aliases: Self::default_component_aliases(),
        }
    }

    /// Canonicalize a blood type name.
    pub fn canonical_blood_type(&self, input: &str) -> String {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_uppercase();

        let (group, rest) = if let Some(rest) = compact.strip_prefix("AB") {
            ("AB", rest)
        } else if let Some(rest) = compact.strip_prefix('A') {
            ("A", rest)
        } else if let Some(rest) = compact.strip_prefix('B') {
            ("B", rest)
        } else if let Some(rest) = compact.strip_prefix('O').or_else(|| compact.strip_prefix('0')) {
            ("O", rest)
        } else {
            return input.trim().to_string();
        };

        let rest = rest.strip_prefix("RH").unwrap_or(rest);
        let rh = match rest {
            "+" | "POS" | "POSITIVE" | "-POS" | "-POSITIVE" => '+',
            "-" | "NEG" | "NEGATIVE" | "-NEG" | "-NEGATIVE" => '-',
            _ => return input.trim().to_string(),
        };

        format!("{}{}", group, rh)
    }

    /// Canonicalize a component name via alias expansion.
    pub fn canonical_component(&self, input: &str) -> String {
        let key = collapse_whitespace(input).to_lowercase();
        self.component_aliases
            .get(&key)
            .cloned()
            .unwrap_or_else(|| input.trim().to_string())
    }

    /// Default component alias mappings.
    fn default_component_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        for alias in ["whole blood", "wholeblood", "whole", "wb"] {
            map.insert(alias.into(), "Whole Blood".into());
        }
        for alias in [
            "red blood cells",
            "red blood cell",
            "red cells",
            "rbc",
            "rbcs",
            "prbc",
            "prbcs",
            "packed red cells",
            "packed red blood cells",
        ] {
            map.insert(alias.into(), "Red Blood Cells".into());
        }
        for alias in ["plasma", "ffp", "fresh frozen plasma", "fp"] {
            map.insert(alias.into(), "Plasma".into());
        }
        for alias in ["platelets", "platelet", "plt", "plts"] {
            map.insert(alias.into(), "Platelets".into());
        }

        map
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
