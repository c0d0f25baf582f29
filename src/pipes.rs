//! Pipe-separated tag values: `"Shown label|value used in mail"`.

/// One value split at its first `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipe {
    pub before: String,
    pub after: String,
}

impl Pipe {
    pub fn new(raw: &str) -> Self {
        match raw.split_once('|') {
            Some((before, after)) => Self {
                before: before.to_string(),
                after: after.to_string(),
            },
            None => Self {
                before: raw.to_string(),
                after: raw.to_string(),
            },
        }
    }
}

/// The pipes of every value of a tag, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipes(Vec<Pipe>);

impl Pipes {
    pub fn new<S: AsRef<str>>(raw_values: &[S]) -> Self {
        Self(raw_values.iter().map(|v| Pipe::new(v.as_ref())).collect())
    }

    /// The parts shown to the visitor.
    pub fn collect_befores(&self) -> Vec<String> {
        self.0.iter().map(|p| p.before.clone()).collect()
    }

    /// The parts substituted into mail.
    pub fn collect_afters(&self) -> Vec<String> {
        self.0.iter().map(|p| p.after.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
