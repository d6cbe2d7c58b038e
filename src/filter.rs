// Read-side task filtering

use crate::task::Task;

/// Completion filter applied when listing tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    /// Parse a filter name, falling back to `All` for anything unrecognized
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Filter::Active,
            "completed" | "done" => Filter::Completed,
            _ => Filter::All,
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(completed: bool) -> Task {
        Task {
            id: "t".to_string(),
            text: "x".to_string(),
            notes: None,
            tag: None,
            due: None,
            completed,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(Filter::parse("all"), Filter::All);
        assert_eq!(Filter::parse("active"), Filter::Active);
        assert_eq!(Filter::parse("open"), Filter::Active);
        assert_eq!(Filter::parse("completed"), Filter::Completed);
        assert_eq!(Filter::parse("done"), Filter::Completed);
        assert_eq!(Filter::parse(" DONE "), Filter::Completed);
    }

    #[test]
    fn test_filter_parse_unknown_falls_back_to_all() {
        assert_eq!(Filter::parse("archived"), Filter::All);
        assert_eq!(Filter::parse(""), Filter::All);
    }

    #[test]
    fn test_filter_matches() {
        assert!(Filter::All.matches(&task(true)));
        assert!(Filter::All.matches(&task(false)));
        assert!(Filter::Active.matches(&task(false)));
        assert!(!Filter::Active.matches(&task(true)));
        assert!(Filter::Completed.matches(&task(true)));
        assert!(!Filter::Completed.matches(&task(false)));
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(Filter::Active.to_string(), "active");
        assert_eq!(Filter::default().to_string(), "all");
    }
}
