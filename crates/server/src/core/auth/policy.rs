//! Boundary checks for account input: password strength and email shape.

/// Symbols that satisfy the "special character" rule.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_PASSWORD_LEN: usize = 8;

/// Returns every rule the password breaks, empty if it is acceptable.
pub fn password_violations(password: &str) -> Vec<String> {
    if password.trim().is_empty() {
        return vec!["Password is required".to_string()];
    }

    let mut reasons = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        reasons.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        reasons.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        reasons.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        reasons.push("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        reasons.push("Password must contain at least one special character".to_string());
    }
    reasons
}

/// Case-normalized form used as the tenant identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural email check on an already normalized address.
pub fn email_violation(email: &str) -> Option<String> {
    let Some((local, domain)) = email.split_once('@') else {
        return Some("Invalid email: missing @".to_string());
    };

    if local.is_empty() || domain.contains('@') {
        return Some("Invalid email: malformed local part".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Some("Invalid email: contains whitespace".to_string());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Some("Invalid email: domain must contain a dot".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_passes() {
        assert!(password_violations("Aa1!aaaa").is_empty());
        assert!(password_violations("Correct.Horse9").is_empty());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let reasons = password_violations("abc");
        assert_eq!(reasons.len(), 4, "{:?}", reasons);
        assert!(reasons.iter().any(|r| r.contains("8 characters")));
        assert!(reasons.iter().any(|r| r.contains("uppercase")));
        assert!(reasons.iter().any(|r| r.contains("number")));
        assert!(reasons.iter().any(|r| r.contains("special")));
    }

    #[test]
    fn test_symbol_must_come_from_set() {
        let reasons = password_violations("Aa1aaaaa~");
        assert_eq!(reasons, vec!["Password must contain at least one special character"]);
    }

    #[test]
    fn test_blank_password() {
        assert_eq!(password_violations("   "), vec!["Password is required"]);
    }

    #[test]
    fn test_email_normalization_and_shape() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
        assert!(email_violation("a@x.com").is_none());
        assert!(email_violation("ax.com").is_some());
        assert!(email_violation("@x.com").is_some());
        assert!(email_violation("a@localhost").is_some());
        assert!(email_violation("a@x..com").is_some());
        assert!(email_violation("a@b@x.com").is_some());
    }
}
