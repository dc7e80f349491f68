//! Triplet — an unresolved (subject, predicate, object) fact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An extracted fact. Subject and object are raw strings, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triplet {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -[{}]-> ({})", self.subject, self.predicate, self.object)
    }
}

impl<S, P, O> From<(S, P, O)> for Triplet
where
    S: Into<String>,
    P: Into<String>,
    O: Into<String>,
{
    fn from((s, p, o): (S, P, O)) -> Self {
        Triplet::new(s, p, o)
    }
}
