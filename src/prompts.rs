use anyhow::Result;
use dialoguer::Input;
use std::io::IsTerminal;

/// Use `value` when given, otherwise ask for it on an interactive terminal.
/// Both paths run `validator` on the trimmed input.
pub fn prompt_required_string_with_validation<F>(
    value: Option<&str>,
    prompt_message: &str,
    validator: F,
) -> Result<String>
where
    F: Fn(&str) -> Result<(), String>,
{
    match value {
        Some(val) => {
            let val = val.trim();
            if let Err(e) = validator(val) {
                return Err(anyhow::anyhow!("Invalid value '{}': {}", val, e));
            }
            Ok(val.to_string())
        }
        None if !std::io::stdin().is_terminal() => Err(anyhow::anyhow!(
            "{} (no terminal to prompt on; pass it as an argument)",
            prompt_message
        )),
        None => {
            let input: String = Input::new()
                .with_prompt(prompt_message)
                .validate_with(|input: &String| validator(input.trim()))
                .interact_text()?;

            Ok(input.trim().to_string())
        }
    }
}

/// Validation for migration names typed by the user. A name may be prefixed
/// with a relative directory (`tenant/add users`).
pub fn validate_migration_name(input: &str) -> Result<(), String> {
    if input.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if input.contains('\\') {
        return Err("Use '/' to separate directories".to_string());
    }
    if input.starts_with('/') || input.split('/').any(|part| part == "..") {
        return Err("Name must stay inside the migrations directory".to_string());
    }

    let name = input.rsplit('/').next().unwrap_or(input);
    if name.len() > 100 {
        return Err("Name must be 100 characters or less".to_string());
    }
    if !name.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err("Name must contain at least one letter or digit".to_string());
    }
    Ok(())
}
