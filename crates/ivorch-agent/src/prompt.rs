//! Deterministic prompt assembly for the structured calls the runtime
//! makes on the conversation loop's behalf (spec.md §4.2).
//!
//! A pure builder, same shape as a context-pack assembler: ordered named
//! sections, each capped individually, then the whole body capped again
//! so a long transcript never silently evicts the instructions.

/// One named chunk of prompt content, already rendered to text.
pub struct PromptSection {
    pub name: String,
    pub content: String,
}

pub struct PromptReport {
    pub sections_included: Vec<String>,
    pub sections_truncated: Vec<String>,
    pub total_chars: usize,
}

pub struct PromptBuilder {
    pub max_per_section: usize,
    pub total_max: usize,
}

impl PromptBuilder {
    pub fn new(max_per_section: usize, total_max: usize) -> Self {
        Self { max_per_section, total_max }
    }

    /// Render `sections` in order, truncating per-section first and then
    /// the concatenated body, and report what happened so callers can log
    /// it (spec.md's ambient observability requirement).
    pub fn build(&self, sections: &[PromptSection]) -> (String, PromptReport) {
        let mut rendered: Vec<(String, String, bool)> = sections
            .iter()
            .map(|s| {
                let (content, truncated) = truncate(&s.content, self.max_per_section);
                (s.name.clone(), content, truncated)
            })
            .collect();

        let mut accumulated = 0usize;
        let mut total_truncated_names = Vec::new();
        for (name, content, truncated) in rendered.iter_mut() {
            let len = content.len();
            if accumulated + len <= self.total_max {
                accumulated += len;
            } else if accumulated < self.total_max {
                let remaining = self.total_max - accumulated;
                let boundary = floor_char_boundary(content, remaining);
                content.truncate(boundary);
                content.push_str("\n[TRUNCATED]");
                *truncated = true;
                total_truncated_names.push(name.clone());
                accumulated = self.total_max;
            } else {
                content.clear();
            }
        }

        let sections_included: Vec<String> =
            rendered.iter().filter(|(_, c, _)| !c.is_empty()).map(|(n, _, _)| n.clone()).collect();
        let sections_truncated: Vec<String> =
            rendered.iter().filter(|(_, _, t)| *t).map(|(n, _, _)| n.clone()).collect();

        let body = rendered
            .iter()
            .filter(|(_, c, _)| !c.is_empty())
            .map(|(name, content, _)| format!("## {name}\n{content}"))
            .collect::<Vec<_>>()
            .join("\n\n");

        let total_chars = body.len();
        (body, PromptReport { sections_included, sections_truncated, total_chars })
    }
}

fn truncate(content: &str, max_chars: usize) -> (String, bool) {
    if content.len() <= max_chars {
        return (content.to_string(), false);
    }
    let boundary = floor_char_boundary(content, max_chars);
    (format!("{}\n[TRUNCATED]", &content[..boundary]), true)
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_render_in_order_under_cap() {
        let builder = PromptBuilder::new(1000, 1000);
        let sections = vec![
            PromptSection { name: "profile".into(), content: "Ada".into() },
            PromptSection { name: "question".into(), content: "Explain X".into() },
        ];
        let (body, report) = builder.build(&sections);
        assert!(body.find("profile").unwrap() < body.find("question").unwrap());
        assert_eq!(report.sections_included, vec!["profile", "question"]);
        assert!(report.sections_truncated.is_empty());
    }

    #[test]
    fn per_section_cap_truncates_long_content() {
        let builder = PromptBuilder::new(5, 1000);
        let sections = vec![PromptSection { name: "transcript".into(), content: "a".repeat(50) }];
        let (body, report) = builder.build(&sections);
        assert!(body.contains("[TRUNCATED]"));
        assert_eq!(report.sections_truncated, vec!["transcript"]);
    }

    #[test]
    fn total_cap_drops_later_sections_entirely() {
        let builder = PromptBuilder::new(1000, 10);
        let sections = vec![
            PromptSection { name: "a".into(), content: "x".repeat(10) },
            PromptSection { name: "b".into(), content: "y".repeat(10) },
        ];
        let (_, report) = builder.build(&sections);
        assert_eq!(report.sections_included, vec!["a"]);
    }
}
