//! Default role prompt templates bundled at compile time.
//!
//! Each template contains an `$ARGUMENTS` placeholder that is replaced with
//! the work unit's rendered argument block before dispatch.

use super::work_unit::WorkRole;

/// Placeholder substituted with the rendered work unit arguments
pub const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Build - implements one quest step
pub const BUILD: &str = include_str!("templates/build.md");

/// Audit - writes tests proving observables hold
pub const AUDIT: &str = include_str!("templates/audit.md");

/// Review - reviews finished files for consistency
pub const REVIEW: &str = include_str!("templates/review.md");

/// Fix - repairs verification check failures
pub const FIX: &str = include_str!("templates/fix.md");

/// Discover - explores the quest and refines its definition
pub const DISCOVER: &str = include_str!("templates/discover.md");

/// Template for a role
pub fn for_role(role: WorkRole) -> &'static str {
    match role {
        WorkRole::Build => BUILD,
        WorkRole::Audit => AUDIT,
        WorkRole::Review => REVIEW,
        WorkRole::Fix => FIX,
        WorkRole::Discover => DISCOVER,
    }
}

/// Substitute the argument block into a template
pub fn render(template: &str, arguments: &str) -> String {
    template.replace(ARGUMENTS_PLACEHOLDER, arguments)
}

/// All default templates with their role slugs
pub fn all_defaults() -> Vec<(WorkRole, &'static str)> {
    vec![
        (WorkRole::Build, BUILD),
        (WorkRole::Audit, AUDIT),
        (WorkRole::Review, REVIEW),
        (WorkRole::Fix, FIX),
        (WorkRole::Discover, DISCOVER),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_carry_placeholder() {
        for (role, content) in all_defaults() {
            assert!(!content.is_empty(), "template for '{role}' should not be empty");
            assert!(
                content.contains(ARGUMENTS_PLACEHOLDER),
                "template for '{role}' is missing the arguments placeholder"
            );
        }
    }

    #[test]
    fn test_render_substitutes_arguments() {
        let rendered = render(BUILD, "Quest ID: quest-1");
        assert!(rendered.contains("Quest ID: quest-1"));
        assert!(!rendered.contains(ARGUMENTS_PLACEHOLDER));
    }
}
