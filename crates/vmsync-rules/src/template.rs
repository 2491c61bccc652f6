//! `{{attribute}}` placeholder rendering.

use vmsync_core::AttributeMap;

/// Renders `template` against `source`.
///
/// Each `{{name}}` is replaced by the text form of the attribute; missing attributes
/// render as empty text. An unterminated `{{` is kept literally.
pub fn render(template: &str, source: &AttributeMap) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        if let Some(value) = source.get(name) {
            out.push_str(&value.to_text());
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> AttributeMap {
        let mut map = AttributeMap::new();
        map.set("name", "web01");
        map.set("cpu_count", 4i64);
        map.set("networks", vec!["prod", "backup"]);
        map
    }

    #[test]
    fn test_render_replaces_placeholders() {
        assert_eq!(render("vm-{{name}}", &source()), "vm-web01");
        assert_eq!(render("{{ name }}/{{cpu_count}}", &source()), "web01/4");
        assert_eq!(render("{{networks}}", &source()), "prod, backup");
    }

    #[test]
    fn test_render_missing_attribute_is_empty() {
        assert_eq!(render("{{owner}}", &source()), "");
        assert_eq!(render("x{{owner}}y", &source()), "xy");
    }

    #[test]
    fn test_render_literal_and_unterminated() {
        assert_eq!(render("plain", &source()), "plain");
        assert_eq!(render("a{{name", &source()), "a{{name");
    }
}
