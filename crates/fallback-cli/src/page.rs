use fallback_core::ScriptElement;
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>").expect("valid script tag pattern"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("valid attribute pattern")
});

/// Attributes of every `<script>` tag in `html`, in page order
pub fn scan_scripts(html: &str) -> Vec<ScriptElement> {
    SCRIPT_TAG
        .captures_iter(html)
        .map(|tag| {
            let attributes = tag.get(1).map_or("", |m| m.as_str());
            ATTRIBUTE
                .captures_iter(attributes)
                .fold(ScriptElement::new(), |script, attribute| {
                    let value = (2..=4)
                        .find_map(|group| attribute.get(group))
                        .map_or("", |m| m.as_str());
                    script.with_attribute(&attribute[1], value)
                })
        })
        .collect()
}
