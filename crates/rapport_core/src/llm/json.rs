//! Locating a JSON object inside free-form model output.

/// Returns the slice from the first `{` to its matching `}`.
///
/// Braces inside string literals are ignored. When the object never closes,
/// the slice runs to the last `}` in the text instead. Returns `None` when
/// there is no `{`, or no `}` after it.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::extract_json_object;

    #[test]
    fn strips_prose_and_code_fences() {
        let text = "好的，结果如下：\n```json\n{\"a\": {\"b\": 1}}\n```\n希望有帮助 {x}";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"reason": "desc1 has } and { inside \"quotes\"", "more_detailed": "desc1"} tail"#;
        let object = extract_json_object(text).unwrap();
        assert!(object.ends_with("\"desc1\"}"));
        let value: serde_json::Value = serde_json::from_str(object).unwrap();
        assert_eq!(value["more_detailed"], "desc1");
    }

    #[test]
    fn unbalanced_object_falls_back_to_last_brace() {
        let unclosed = "x {\"a\": {\"b\": 1}";
        assert_eq!(extract_json_object(unclosed), Some("{\"a\": {\"b\": 1}"));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} before {"), None);
    }
}
