use crate::models::Cell;
use anyhow::Result;
use regex::Regex;

/// Noise removed from product names before matching. Applied in order: the
/// bracket pattern relies on hashtag-set markers already being gone.
const NOISE_PATTERNS: &[&str] = &[
    // Promotional hashtag sets: #001セット
    r"#.*?セット",
    // Annotations: 【送料無料】
    r"【.*?】",
    // Slash separators (lazy, so only the slash itself)
    r"/.*?",
    // Catalog marketing words
    r"韓コスメ",
    r"口紅",
    r"リップ",
    r"アワグロウ",
    // Leftover brackets and hashes
    r"[\[\]【】#]",
    r"\s{2,}",
];

/// Turns free-text product names into comparison keys.
pub struct TextNormalizer {
    noise: Vec<Regex>,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        let noise = NOISE_PATTERNS
            .iter()
            .map(|pat| Regex::new(pat))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TextNormalizer {
            noise,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    /// Canonical key for a product name. Missing input yields `""`.
    pub fn normalize(&self, text: Option<&str>) -> String {
        let Some(text) = text else {
            return String::new();
        };

        let mut cleaned = text.to_string();
        for pattern in &self.noise {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }

        self.whitespace.replace_all(cleaned.trim(), "").into_owned()
    }

    /// Keys for a whole name column. Non-text cells count as missing.
    pub fn normalize_cells(&self, cells: &[Cell]) -> Vec<String> {
        cells.iter().map(|cell| self.normalize(cell.as_str())).collect()
    }
}
