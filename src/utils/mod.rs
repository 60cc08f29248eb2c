// Sat Oct 17 2026 - Alex

pub mod logging;

pub use logging::LoggingUtils;

pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "type", "types"), "1 type");
        assert_eq!(pluralize(3, "type", "types"), "3 types");
    }
}
