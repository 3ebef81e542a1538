//! Identifier case conversion for resource names and paths.

/// Convert a model identifier to snake_case.
/// Every upper-case letter after the first character starts a new segment:
/// "OrderItem" -> "order_item", "HTTPLog" -> "h_t_t_p_log".
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Resource (table/collection) name for a model.
pub fn resource_name(model_name: &str) -> String {
    to_snake_case(model_name)
}

/// True for names usable as a model or field identifier: ASCII letter or underscore first, then
/// letters, digits or underscores.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_are_lower_snake_case() {
        assert_eq!(resource_name("Order"), "order");
        assert_eq!(resource_name("OrderItem"), "order_item");
        assert_eq!(resource_name("userProfile"), "user_profile");
        assert_eq!(resource_name("HTTPLog"), "h_t_t_p_log");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("Order"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("order-item"));
    }
}
