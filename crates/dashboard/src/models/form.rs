//! Raw HTML form submissions.
//!
//! Handlers extract `Form<Vec<(String, String)>>` so repeated fields (the
//! platform checkboxes) survive, then parse through [`FormFields`].

use std::str::FromStr;

use flipledger_core::types::UnknownVariant;
use flipledger_core::validation::{ValidationError, non_blank, parse_enum};

/// Ordered name/value pairs from a urlencoded body.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    /// Wrap decoded pairs.
    #[must_use]
    pub const fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Build from borrowed pairs.
    #[cfg(test)]
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    /// First value submitted for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every non-blank value submitted for `name`.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .filter_map(|(_, value)| non_blank(Some(value.as_str())))
    }

    /// Every submitted pair, in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `name` was submitted at all, even blank.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Trimmed optional text.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        non_blank(self.get(name)).map(ToString::to_string)
    }

    /// A checkbox: the last value submitted, when not an off value, means
    /// checked. A hidden `false` before the box reads as unchecked.
    #[must_use]
    pub fn checkbox(&self, name: &str) -> bool {
        self.all(name)
            .last()
            .is_some_and(|v| !matches!(v, "off" | "false" | "0"))
    }

    /// Parse every value of a repeated enum field, recording bad values.
    pub fn enum_list<T>(&self, name: &str, errors: &mut ValidationError) -> Vec<T>
    where
        T: FromStr<Err = UnknownVariant> + PartialEq,
    {
        let mut values = Vec::new();
        for raw in self.all(name) {
            match parse_enum::<T>(name, raw) {
                Ok(value) if !values.contains(&value) => values.push(value),
                Ok(_) => {}
                Err(e) => errors.push(e),
            }
        }
        values
    }

    /// Non-empty lines of a textarea.
    #[must_use]
    pub fn lines(&self, name: &str) -> Vec<String> {
        self.get(name)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| non_blank(Some(line)))
            .map(ToString::to_string)
            .collect()
    }
}

impl From<Vec<(String, String)>> for FormFields {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipledger_core::Platform;

    fn form(pairs: &[(&str, &str)]) -> FormFields {
        FormFields::from_pairs(pairs)
    }

    #[test]
    fn test_get_returns_first_value() {
        let f = form(&[("a", "1"), ("a", "2")]);
        assert_eq!(f.get("a"), Some("1"));
        assert_eq!(f.get("b"), None);
    }

    #[test]
    fn test_enum_list_dedupes_and_reports() {
        let f = form(&[
            ("platforms", "Vinted"),
            ("platforms", "ebay"),
            ("platforms", "vinted"),
            ("platforms", "Etsy"),
            ("platforms", ""),
        ]);
        let mut errors = ValidationError::default();
        let platforms: Vec<Platform> = f.enum_list("platforms", &mut errors);
        assert_eq!(platforms, vec![Platform::Vinted, Platform::Ebay]);
        assert_eq!(errors.errors().len(), 1);
    }

    #[test]
    fn test_checkbox_and_text() {
        let f = form(&[("buyer_paid_shipping", "on"), ("notes", "  ")]);
        assert!(f.checkbox("buyer_paid_shipping"));
        assert!(!f.checkbox("missing"));
        assert!(form(&[("x", "false"), ("x", "on")]).checkbox("x"));
        assert!(!form(&[("x", "false")]).checkbox("x"));
        assert_eq!(f.text("notes"), None);
        assert!(f.has("notes"));
    }

    #[test]
    fn test_lines_skips_blanks() {
        let f = form(&[("photos", "a.jpg\n\n  b.jpg  \r\n")]);
        assert_eq!(f.lines("photos"), vec!["a.jpg", "b.jpg"]);
    }
}
