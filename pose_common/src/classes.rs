//! Class-index → name table for the pose detector's output.

/// The pose detector recognizes people only.
pub const NAMES: [&str; 1] = ["person"];

/// Name for a class index, `"unknown"` when out of table range.
pub fn name(cls: usize) -> &'static str {
    NAMES.get(cls).copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_zero_is_person() {
        assert_eq!(name(0), "person");
        assert_eq!(name(7), "unknown");
    }
}
