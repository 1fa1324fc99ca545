use {regex::Regex, std::fmt};

use crate::cast::RawArgs;

/// A compiled command pattern.
///
/// Matching is anchored at the start of the payload but not at its end, so
/// `(?P<n>\d+)` accepts `"12 apples"`. A pattern that must consume the whole
/// payload anchors itself with `$`.
#[derive(Clone)]
pub struct CommandPattern {
    source: String,
    regex: Regex,
    groups: Vec<String>,
}

impl CommandPattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(source)?;
        let groups = regex
            .capture_names()
            .flatten()
            .map(str::to_string)
            .collect();
        Ok(Self {
            source: source.to_string(),
            regex,
            groups,
        })
    }

    /// The pattern text as written at registration.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Named groups in order of appearance.
    pub fn group_names(&self) -> &[String] {
        &self.groups
    }

    /// Match `payload`, returning every named group (absent ones as `None`).
    ///
    /// Only a match starting at offset zero counts. Leftmost-first search
    /// returns such a match whenever one exists.
    pub fn captures(&self, payload: &str) -> Option<RawArgs> {
        let caps = self.regex.captures(payload)?;
        if caps.get(0).is_none_or(|m| m.start() != 0) {
            return None;
        }
        Some(
            self.groups
                .iter()
                .map(|name| (name.clone(), caps.name(name).map(|m| m.as_str().to_string())))
                .collect(),
        )
    }
}

impl fmt::Debug for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandPattern").field(&self.source).finish()
    }
}

impl fmt::Display for CommandPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
