//! Ownership strategies.

/// Decides whether a mapping owns the lifecycle of its local rows.
///
/// The strategy is fixed when the mapping is built and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Rows are created and cleaned up by this mapping.
    #[default]
    Always,
    /// Rows only exist as a side effect of another mapping's association
    /// build. They are never created or deleted independently.
    Passive,
}

impl Strategy {
    /// Derives the strategy from a mapping's `through` setting.
    pub fn for_through(through: Option<&str>) -> Self {
        match through {
            Some(_) => Strategy::Passive,
            None => Strategy::Always,
        }
    }

    /// Returns true for [`Strategy::Passive`].
    pub fn is_passive(&self) -> bool {
        matches!(self, Strategy::Passive)
    }

    /// Returns true if the mapping may create rows on its own.
    pub fn creates_rows(&self) -> bool {
        !self.is_passive()
    }

    /// Returns true if the cleaner may delete rows of the mapping.
    pub fn cleans_rows(&self) -> bool {
        !self.is_passive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_from_through() {
        assert_eq!(Strategy::for_through(None), Strategy::Always);
        assert_eq!(Strategy::for_through(Some("Friend__c")), Strategy::Passive);
        assert_eq!(Strategy::default(), Strategy::Always);
    }

    #[test]
    fn passive_never_owns_rows() {
        assert!(!Strategy::Passive.creates_rows());
        assert!(!Strategy::Passive.cleans_rows());
        assert!(Strategy::Always.creates_rows());
        assert!(Strategy::Always.cleans_rows());
    }
}
