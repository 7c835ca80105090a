//! Human-friendly text output formatting
//!
//! Used when --format text is specified.

use super::types::*;

fn push_captures(output: &mut String, captures: &[Capture]) {
    for cap in captures {
        let name_str = cap
            .name
            .as_ref()
            .map(|n| format!(" ({})", n))
            .unwrap_or_default();
        output.push_str(&format!(
            "  Group {}{}: \"{}\" [{}..{}]\n",
            cap.group, name_str, cap.text, cap.start, cap.end
        ));
    }
}

/// Format TestResult as human-readable text
pub fn format_test_result(result: &TestResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Pattern: {}\n", result.pattern));
    output.push_str(&format!(
        "Groups:  {}{}\n",
        result.groups,
        if result.studied { " (studied)" } else { "" }
    ));
    output.push('\n');

    if result.matched {
        for (i, m) in result.matches.iter().enumerate() {
            output.push_str(&format!(
                "Match {}: \"{}\" [{}..{}]\n",
                i + 1,
                m.text,
                m.start,
                m.end
            ));
            push_captures(&mut output, &m.captures);
        }
        output.push('\n');
        output.push_str(&format!(
            "{} match{} found in {}μs\n",
            result.match_count,
            if result.match_count == 1 { "" } else { "es" },
            result.elapsed_us
        ));
    } else {
        output.push_str("No matches found\n");
    }

    output
}

/// Format ExecOutput as human-readable text
pub fn format_exec_result(result: &ExecOutput) -> String {
    let mut output = String::new();

    output.push_str(&format!("Pattern: {}\n", result.pattern));
    output.push_str(&format!("State:   {} ({})\n", result.state, result.code));
    if let (Some((start, end)), Some(text)) = (result.span, &result.text) {
        output.push_str(&format!("Span:    \"{}\" [{}..{}]\n", text, start, end));
    }
    push_captures(&mut output, &result.captures);

    output
}

/// Format ReplaceResult as human-readable text
pub fn format_replace_result(result: &ReplaceResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Pattern:     {}\n", result.pattern));
    output.push_str(&format!("Replacement: {}\n", result.replacement));
    output.push('\n');
    output.push_str(&format!("Original: {}\n", result.original));
    output.push_str(&format!("Result:   {}\n", result.result));
    output.push('\n');
    output.push_str(&format!(
        "{} replacement{} made\n",
        result.replacements_made,
        if result.replacements_made == 1 {
            ""
        } else {
            "s"
        }
    ));

    output
}

/// Format ValidateResult as human-readable text
pub fn format_validate_result(result: &ValidateResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Pattern: {}\n", result.pattern));
    match &result.error {
        None => {
            output.push_str("Valid\n");
            if let Some(groups) = result.groups {
                output.push_str(&format!("Groups:  {}\n", groups));
            }
            if !result.names.is_empty() {
                output.push_str(&format!("Names:   {}\n", result.names.join(", ")));
            }
            if let Some(prefix) = &result.literal_prefix {
                output.push_str(&format!("Prefix:  \"{}\"\n", prefix));
            }
        }
        Some(err) => {
            output.push_str(&format!("Invalid: {}\n", err.message));
            output.push_str(&format!("  at offset {} ({})\n", err.position, err.kind));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_reports_offset() {
        let result = ValidateResult {
            pattern: "a(".into(),
            valid: false,
            groups: None,
            names: Vec::new(),
            literal_prefix: None,
            error: Some(ValidationError {
                kind: "UnterminatedGroup".into(),
                position: 2,
                message: "missing )".into(),
            }),
        };
        let text = format_validate_result(&result);
        assert!(text.contains("Invalid: missing )"));
        assert!(text.contains("at offset 2"));
    }

    #[test]
    fn test_replace_text_pluralizes() {
        let result = ReplaceResult {
            pattern: "a".into(),
            replacement: "b".into(),
            template: false,
            original: "aa".into(),
            result: "bb".into(),
            replacements_made: 1,
        };
        assert!(format_replace_result(&result).contains("1 replacement made"));
    }
}
