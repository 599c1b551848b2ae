//! The `/raids` verb set and its permission nodes.

use std::fmt;

/// Top-level command label.
pub const RAIDS_LABEL: &str = "raids";

/// A `/raids` sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaidsVerb {
    Reload,
    Start,
    Cancel,
    End,
    Exit,
    Package,
    Help,
}

impl RaidsVerb {
    /// Help listing order.
    pub const HELP_ORDER: [Self; 6] = [
        Self::Start,
        Self::Cancel,
        Self::End,
        Self::Exit,
        Self::Package,
        Self::Reload,
    ];

    /// Completion order for the first argument.
    pub const COMPLETION_ORDER: [Self; 7] = [
        Self::Start,
        Self::Cancel,
        Self::Exit,
        Self::End,
        Self::Reload,
        Self::Help,
        Self::Package,
    ];

    /// Parses a verb as typed by the user.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "reload" => Some(Self::Reload),
            "start" => Some(Self::Start),
            "cancel" => Some(Self::Cancel),
            "end" => Some(Self::End),
            "exit" => Some(Self::Exit),
            "package" => Some(Self::Package),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reload => "reload",
            Self::Start => "start",
            Self::Cancel => "cancel",
            Self::End => "end",
            Self::Exit => "exit",
            Self::Package => "package",
            Self::Help => "help",
        }
    }

    /// Permission node required to run the verb, e.g. `raids.start`.
    #[must_use]
    pub fn permission(self) -> String {
        format!("{RAIDS_LABEL}.{}", self.as_str())
    }

    /// Whether `permissions` grants this verb.
    #[must_use]
    pub fn is_permitted(self, permissions: &[String]) -> bool {
        let node = self.permission();
        permissions.iter().any(|p| *p == node)
    }

    /// One-line usage text; `help` has none.
    #[must_use]
    pub fn help_line(self) -> Option<&'static str> {
        match self {
            Self::Start => Some("/raids start <raid> - Start specified raid"),
            Self::Cancel => Some("/raids cancel - Cancel raid before it starts"),
            Self::End => Some("/raids end - Ends the raid for all members of the party"),
            Self::Exit => Some("/raids exit - Exit the raid (just you)"),
            Self::Package => {
                Some("/raids package <world> <dungeon> [-f] - Package a world as dungeon level")
            }
            Self::Reload => Some("/raids reload - Reload config for plugin"),
            Self::Help => None,
        }
    }
}

impl fmt::Display for RaidsVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_verb() {
        for verb in RaidsVerb::COMPLETION_ORDER {
            assert_eq!(RaidsVerb::parse(verb.as_str()), Some(verb));
        }
        assert_eq!(RaidsVerb::parse("START"), None);
        assert_eq!(RaidsVerb::parse("teleport"), None);
    }

    #[test]
    fn test_permission_nodes() {
        assert_eq!(RaidsVerb::Package.permission(), "raids.package");

        let granted = vec!["raids.start".to_owned()];
        assert!(RaidsVerb::Start.is_permitted(&granted));
        assert!(!RaidsVerb::Cancel.is_permitted(&granted));
    }

    #[test]
    fn test_every_verb_but_help_has_a_help_line() {
        let lines: Vec<_> = RaidsVerb::HELP_ORDER
            .iter()
            .filter_map(|v| v.help_line())
            .collect();

        assert_eq!(lines.len(), 6);
        assert!(RaidsVerb::Help.help_line().is_none());
    }
}
