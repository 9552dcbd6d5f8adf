/// Parse and validate a global variable name for IIFE/UMD bundles.
///
/// The name must be a valid JavaScript identifier: a letter, underscore or
/// dollar sign followed by letters, digits, underscores or dollar signs.
pub fn parse_global(s: &str) -> Result<String, String> {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return Err("Global name cannot be empty".to_string());
    };

    if !first.is_alphabetic() && first != '_' && first != '$' {
        return Err(format!(
            "Global name must start with a letter, underscore, or dollar sign: '{s}'"
        ));
    }
    if chars.any(|c| !c.is_alphanumeric() && c != '_' && c != '$') {
        return Err(format!(
            "Global name can only contain letters, numbers, underscores, or dollar signs: '{s}'"
        ));
    }

    Ok(s.to_string())
}

/// Parse `KEY=VALUE` of `--env`.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Expected KEY=VALUE, got '{s}'")),
    }
}
