use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PASCAL: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref CAMEL:  Regex = Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap();
}

pub fn is_pascal(name: &str) -> bool {
    PASCAL.is_match(name)
}

pub fn is_camel(name: &str) -> bool {
    CAMEL.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pascal() {
        assert!(is_pascal("User"));
        assert!(is_pascal("HttpStatus2"));
        assert!(!is_pascal("user"));
        assert!(!is_pascal("User_Name"));
        assert!(!is_pascal("_"));
        assert!(!is_pascal(""));
    }

    #[test]
    fn test_is_camel() {
        assert!(is_camel("userId"));
        assert!(is_camel("x"));
        assert!(!is_camel("UserId"));
        assert!(!is_camel("user_id"));
        assert!(!is_camel(""));
    }
}
