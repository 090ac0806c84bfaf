use crate::config::ReplacementRule;

/// Applies literal replacement rules in list order
///
/// Each rule sees the output of the previous one; rules with an empty `find`
/// are skipped.
///
/// # Examples
///
/// ```
/// use site_mirror::config::ReplacementRule;
/// use site_mirror::rewrite::apply_replacements;
///
/// let rules = vec![ReplacementRule::new("ab", "x"), ReplacementRule::new("x", "y")];
/// assert_eq!(apply_replacements("ab", &rules), "y");
/// ```
pub fn apply_replacements(text: &str, rules: &[ReplacementRule]) -> String {
    let mut out = text.to_string();
    for rule in rules {
        if rule.find.is_empty() {
            continue;
        }
        if out.contains(&rule.find) {
            out = out.replace(&rule.find, &rule.replace_with);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_apply_in_order() {
        let rules = vec![ReplacementRule::new("ab", "x"), ReplacementRule::new("x", "y")];
        assert_eq!(apply_replacements("ab", &rules), "y");
    }

    #[test]
    fn test_empty_find_is_noop() {
        let rules = vec![ReplacementRule::new("", "boom")];
        assert_eq!(apply_replacements("text", &rules), "text");
    }

    #[test]
    fn test_all_occurrences_replaced() {
        let rules = vec![ReplacementRule::new("Acme", "Archive")];
        assert_eq!(
            apply_replacements("Acme news from Acme", &rules),
            "Archive news from Archive"
        );
    }

    #[test]
    fn test_no_rules() {
        assert_eq!(apply_replacements("unchanged", &[]), "unchanged");
    }
}
