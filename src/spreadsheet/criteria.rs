use crate::error::NormalizerError;
use glob::Pattern;

/// Sheet selection by name patterns.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name patterns; `None` selects every sheet.
    pub(crate) sheet_name_patterns: Option<Vec<Pattern>>,
}

impl Criteria {
    /// Compiles glob patterns; an empty list selects every sheet.
    pub(crate) fn new(patterns: &[String]) -> Result<Criteria, NormalizerError> {
        let sheet_name_patterns = if patterns.is_empty() {
            None
        } else {
            Some(patterns.iter().map(|pattern| Pattern::new(pattern)).collect::<Result<Vec<_>, _>>()?)
        };
        Ok(Criteria { sheet_name_patterns })
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
