// src/sema/ids.rs
//
// Synthetic identifiers shared across the whole analysis.

use std::fmt;

/// The kinds of synthetic identifiers the analysis allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Module,
    Function,
    Table,
    Parameter,
    SelfParam,
    Instance,
    Local,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Function => "function",
            Self::Table => "table",
            Self::Parameter => "parameter",
            Self::SelfParam => "self",
            Self::Instance => "instance",
            Self::Local => "local",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "module" => Some(Self::Module),
            "function" => Some(Self::Function),
            "table" => Some(Self::Table),
            "parameter" => Some(Self::Parameter),
            "self" => Some(Self::SelfParam),
            "instance" => Some(Self::Instance),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocates `@kind(n)[name]` identifiers. Serial numbers are monotonic
/// across every kind, so an id is unique for the whole session.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: IdKind, name: &str) -> String {
        let n = self.next;
        self.next += 1;
        format!("@{}({})[{}]", kind, n, name)
    }
}

/// A parsed synthetic identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedId<'a> {
    pub kind: IdKind,
    pub serial: u32,
    pub name: &'a str,
}

/// Parse `@kind(n)[name]`; anything else returns None.
pub fn parse_id(s: &str) -> Option<ParsedId<'_>> {
    let rest = s.strip_prefix('@')?;
    let open = rest.find('(')?;
    let kind = IdKind::from_str(&rest[..open])?;
    let rest = &rest[open + 1..];
    let close = rest.find(')')?;
    let serial: u32 = rest[..close].parse().ok()?;
    let rest = &rest[close + 1..];
    let name = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some(ParsedId { kind, serial, name })
}

/// True when the string is a synthetic identifier of the given kind.
pub fn is_kind(s: &str, kind: IdKind) -> bool {
    parse_id(s).is_some_and(|id| id.kind == kind)
}
