/// Decides whether two identifiers name the same thing.
///
/// Sessions pick one of the two resolutions below depending on their
/// case-sensitivity setting.
pub type Resolver = fn(&str, &str) -> bool;

pub fn case_sensitive_resolution(a: &str, b: &str) -> bool {
    a == b
}

pub fn case_insensitive_resolution(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolutions_differ_only_in_case_handling() {
        assert!(case_insensitive_resolution("Name", "nAME"));
        assert!(case_insensitive_resolution("ÉVORA", "évora"));
        assert!(!case_sensitive_resolution("Name", "name"));
        assert!(case_sensitive_resolution("name", "name"));
        assert!(!case_insensitive_resolution("name", "names"));
    }
}
