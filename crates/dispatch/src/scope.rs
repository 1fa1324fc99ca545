use std::{collections::BTreeSet, fmt};

/// Where, or by whom, a command may be invoked.
///
/// `Any` is the unrestricted scope. `Only` lists the accepted identifiers;
/// an empty list accepts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    Any,
    Only(BTreeSet<String>),
}

impl Scope {
    pub fn any() -> Self {
        Self::Any
    }

    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(ids.into_iter().map(Into::into).collect())
    }

    /// `None` means unrestricted, mirroring optional config fields.
    pub fn from_option(ids: Option<Vec<String>>) -> Self {
        ids.map_or(Self::Any, Self::only)
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Only(_))
    }

    pub fn permits(&self, id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(ids) => ids.contains(id),
        }
    }

    /// True if at least one of `ids` is accepted.
    pub fn permits_any<'a, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self {
            Self::Any => true,
            Self::Only(_) => ids.into_iter().any(|id| self.permits(id)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Only(ids) => {
                let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(", "))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_permits_everything() {
        assert!(Scope::any().permits("general"));
        assert!(Scope::any().permits_any(std::iter::empty()));
    }

    #[test]
    fn only_requires_membership() {
        let scope = Scope::only(["admin", "mod"]);
        assert!(scope.permits("admin"));
        assert!(!scope.permits("member"));
        assert!(scope.permits_any(["member", "mod"]));
        assert!(!scope.permits_any(["member"]));
    }

    #[test]
    fn empty_only_rejects_all() {
        let scope = Scope::only(Vec::<String>::new());
        assert!(!scope.permits("anything"));
        assert!(scope.is_restricted());
    }

    #[test]
    fn display_lists_members_sorted() {
        assert_eq!(Scope::only(["b", "a"]).to_string(), "a, b");
        assert_eq!(Scope::from_option(None), Scope::Any);
    }
}
