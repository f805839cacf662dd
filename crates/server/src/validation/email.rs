use super::ValidationError;

/// Check an address typed into the sign-in form and return it trimmed.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };

    let is_valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    if is_valid {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}
