use std::collections::BTreeSet;

/// The groups a caller asks for on a read or a write.
///
/// A property is admitted when no groups were requested, when the property declares no groups,
/// or when the two sets share at least one group. The same test is applied on both paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups(BTreeSet<String>);

impl Groups {
    /// No filter: every property is admitted.
    pub fn none() -> Self {
        Groups::default()
    }

    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Groups(groups.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn admits(&self, declared: &BTreeSet<String>) -> bool {
        self.0.is_empty() || declared.is_empty() || !self.0.is_disjoint(declared)
    }
}

impl<S: Into<String>> FromIterator<S> for Groups {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Groups::new(iter)
    }
}
