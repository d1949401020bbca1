//! `{{placeholder}}` substitution for marketing messages.
//!
//! Templates are authored by staff in the admin panel, so rendering never
//! fails: unknown placeholders are left in place (a preview then shows what
//! is missing) and an unterminated `{{` is copied through verbatim.

use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render `template`, replacing `{{key}}` (whitespace inside the braces is
/// ignored) with the value from `vars`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use atelier_core::template::render;
///
/// let vars = HashMap::from([("name", "Lina")]);
/// assert_eq!(render("Hi {{ name }}, {{code}}", &vars), "Hi Lina, {{code}}");
/// ```
#[must_use]
pub fn render<K, V>(template: &str, vars: &HashMap<K, V>) -> String
where
    K: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    V: AsRef<str>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let (before, after_open) = rest.split_at(start);
        out.push_str(before);

        let inner_start = OPEN.len();
        let Some(end) = after_open[inner_start..].find(CLOSE) else {
            out.push_str(after_open);
            return out;
        };

        let raw = &after_open[..inner_start + end + CLOSE.len()];
        let key = after_open[inner_start..inner_start + end].trim();

        match vars.get(key) {
            Some(value) if is_key(key) => out.push_str(value.as_ref()),
            _ => out.push_str(raw),
        }

        rest = &after_open[raw.len()..];
    }

    out.push_str(rest);
    out
}

/// The distinct placeholder keys referenced by `template`, in order of first
/// appearance.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let key = after_open[..end].trim();
        if is_key(key) && !keys.iter().any(|k| k == key) {
            keys.push(key.to_owned());
        }
        rest = &after_open[end + CLOSE.len()..];
    }

    keys
}

/// Placeholder keys are identifiers: ASCII letters, digits and underscores.
fn is_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("name", "Yasmine".to_string()),
            ("code", "SUMMER20".to_string()),
        ])
    }

    #[test]
    fn test_substitutes_known_keys() {
        assert_eq!(
            render("Bonjour {{name}}! Use {{ code }} today.", &vars()),
            "Bonjour Yasmine! Use SUMMER20 today."
        );
    }

    #[test]
    fn test_repeated_keys() {
        assert_eq!(render("{{name}}/{{name}}", &vars()), "Yasmine/Yasmine");
    }

    #[test]
    fn test_unknown_keys_left_in_place() {
        assert_eq!(
            render("Hi {{first_name}}", &vars()),
            "Hi {{first_name}}"
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(render("Hi {{name", &vars()), "Hi {{name");
        assert_eq!(render("{{name}} and {{", &vars()), "Yasmine and {{");
    }

    #[test]
    fn test_non_identifier_is_not_a_placeholder() {
        assert_eq!(render("{{ a b }}", &vars()), "{{ a b }}");
        assert_eq!(render("{{}}", &vars()), "{{}}");
    }

    #[test]
    fn test_unicode_text_around_placeholders() {
        assert_eq!(render("مرحبا {{name}} ✨", &vars()), "مرحبا Yasmine ✨");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("{{name}} {{ code }} {{name}} {{bad key}} {{email"),
            vec!["name".to_string(), "code".to_string()]
        );
        assert!(placeholders("no placeholders").is_empty());
    }
}
