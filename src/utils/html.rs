// src/utils/html.rs

/// Sanitizes admin-authored text (question stems, explanations, module
/// descriptions) before it is stored and later rendered by the client.
///
/// Whitelist based: harmless markup such as `<b>` or `<sub>` survives,
/// `<script>` (with its content), `<iframe>` and event handler attributes do not.
/// Plain text passes through unchanged apart from entity escaping of `<`/`>`.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_html)
}
