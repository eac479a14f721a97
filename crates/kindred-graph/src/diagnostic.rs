use serde::{Deserialize, Serialize};
use std::fmt;

/// Which relational list a reference was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Parent,
    Child,
    Spouse,
    Sibling,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Parent => "parent",
            LinkKind::Child => "child",
            LinkKind::Spouse => "spouse",
            LinkKind::Sibling => "sibling",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The referenced id does not resolve to a person in the tree.
    DanglingReference,
    /// A person lists themselves as a relative.
    SelfReference,
    /// A sibling link joins two different generations.
    SiblingGenerationMismatch,
    /// Two records share one id; the later record was dropped.
    DuplicatePerson,
}

/// A recovered data-integrity problem. Diagnostics never abort a load or a layout pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The person whose record declared the reference.
    pub person: String,
    /// The referenced id.
    pub other: String,
    pub link: LinkKind,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        person: impl Into<String>,
        other: impl Into<String>,
        link: LinkKind,
    ) -> Self {
        Self {
            kind,
            person: person.into(),
            other: other.into(),
            link,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::DanglingReference => write!(
                f,
                "{} references unknown {} `{}`",
                self.person, self.link, self.other
            ),
            DiagnosticKind::SelfReference => {
                write!(f, "{} lists itself as {}", self.person, self.link)
            }
            DiagnosticKind::SiblingGenerationMismatch => write!(
                f,
                "{} and sibling {} are in different generations",
                self.person, self.other
            ),
            DiagnosticKind::DuplicatePerson => write!(f, "duplicate person id `{}`", self.other),
        }
    }
}
