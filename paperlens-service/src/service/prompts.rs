//! Prompt templates and sampling parameters for each pipeline stage.

use strum::{Display, EnumIter, IntoStaticStr};

/// One LLM call in an analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    // Full report
    Abstract,
    Topics,
    Questions,
    KeyFindings,
    ResearchGaps,
    FutureDirections,
    MethodologyCritique,
    ImpactAnalysis,

    // Quick summary
    SummaryAbstract,
    SummaryTopic,
    SummaryQuestions,
}

/// Static parameters of a stage
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub system: &'static str,
    pub template: &'static str,
    /// Leading characters of the paper text substituted for `{excerpt}`
    pub excerpt_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Stage {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn spec(self) -> StageSpec {
        let (system, template, excerpt_chars, temperature, max_tokens) = match self {
            Stage::Abstract => (
                include_str!("../../prompts/report/system/abstract.txt"),
                include_str!("../../prompts/report/abstract.txt"),
                5000,
                0.7,
                400,
            ),
            Stage::Topics => (
                include_str!("../../prompts/report/system/topics.txt"),
                include_str!("../../prompts/report/topics.txt"),
                5000,
                0.5,
                150,
            ),
            Stage::Questions => (
                include_str!("../../prompts/report/system/questions.txt"),
                include_str!("../../prompts/report/questions.txt"),
                4000,
                0.8,
                500,
            ),
            Stage::KeyFindings => (
                include_str!("../../prompts/report/system/key_findings.txt"),
                include_str!("../../prompts/report/key_findings.txt"),
                5000,
                0.5,
                400,
            ),
            Stage::ResearchGaps => (
                include_str!("../../prompts/report/system/research_gaps.txt"),
                include_str!("../../prompts/report/research_gaps.txt"),
                4000,
                0.7,
                350,
            ),
            Stage::FutureDirections => (
                include_str!("../../prompts/report/system/future_directions.txt"),
                include_str!("../../prompts/report/future_directions.txt"),
                4000,
                0.8,
                350,
            ),
            Stage::MethodologyCritique => (
                include_str!("../../prompts/report/system/methodology_critique.txt"),
                include_str!("../../prompts/report/methodology_critique.txt"),
                5000,
                0.6,
                400,
            ),
            Stage::ImpactAnalysis => (
                include_str!("../../prompts/report/system/impact_analysis.txt"),
                include_str!("../../prompts/report/impact_analysis.txt"),
                4000,
                0.7,
                400,
            ),
            Stage::SummaryAbstract => (
                include_str!("../../prompts/summary/system/abstract.txt"),
                include_str!("../../prompts/summary/abstract.txt"),
                4000,
                0.7,
                300,
            ),
            Stage::SummaryTopic => (
                include_str!("../../prompts/summary/system/topic.txt"),
                include_str!("../../prompts/summary/topic.txt"),
                4000,
                0.5,
                100,
            ),
            Stage::SummaryQuestions => (
                include_str!("../../prompts/summary/system/questions.txt"),
                include_str!("../../prompts/summary/questions.txt"),
                3000,
                0.8,
                500,
            ),
        };

        StageSpec {
            system: system.trim_end(),
            template,
            excerpt_chars,
            temperature,
            max_tokens,
        }
    }
}

/// Values available to prompt templates.
///
/// Later pipeline phases see the outputs of earlier ones; fields a stage
/// does not use stay empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptContext<'a> {
    pub text: &'a str,
    pub abstract_text: &'a str,
    pub topics: &'a [String],
    pub gaps: &'a [String],
}

impl<'a> PromptContext<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    /// Render the user prompt for `stage`.
    pub fn render(&self, stage: Stage) -> String {
        let spec = stage.spec();
        let topics = self.topics.join(", ");
        let gaps = self.gaps.join("; ");

        fill_template(
            spec.template,
            &[
                ("excerpt", excerpt(self.text, spec.excerpt_chars)),
                ("abstract", self.abstract_text),
                ("topics", topics.as_str()),
                ("gaps", gaps.as_str()),
            ],
        )
    }
}

/// First `max_chars` characters of `text`
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Substitute `{name}` placeholders in one pass, so braces inside the
/// substituted values are left alone. Unknown placeholders are kept as-is.
fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let found = vars.iter().find(|(name, _)| {
            tail.strip_prefix(*name)
                .is_some_and(|after| after.starts_with('}'))
        });

        match found {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Abstract.name(), "abstract");
        assert_eq!(Stage::KeyFindings.name(), "key_findings");
        assert_eq!(Stage::SummaryQuestions.to_string(), "summary_questions");
    }

    #[test]
    fn test_every_template_takes_an_excerpt() {
        for stage in Stage::iter() {
            assert!(
                stage.spec().template.contains("{excerpt}"),
                "{stage} template has no excerpt placeholder"
            );
        }
    }

    #[test]
    fn test_every_stage_has_its_own_system_prompt() {
        let prompts: HashSet<&str> = Stage::iter().map(|stage| stage.spec().system).collect();
        assert_eq!(prompts.len(), Stage::iter().count());
        assert!(prompts.iter().all(|prompt| !prompt.is_empty() && !prompt.ends_with('\n')));
    }

    #[test]
    fn test_excerpt_counts_characters() {
        assert_eq!(excerpt("hello", 3), "hel");
        assert_eq!(excerpt("hello", 10), "hello");
        assert_eq!(excerpt("héllo wörld", 7), "héllo w");
        assert_eq!(excerpt("", 5), "");
    }

    #[test]
    fn test_fill_template() {
        let out = fill_template("a {x} b {y} c {z}", &[("x", "1"), ("y", "2")]);
        assert_eq!(out, "a 1 b 2 c {z}");
    }

    #[test]
    fn test_fill_template_leaves_substituted_braces() {
        let out = fill_template(
            "{excerpt} / {abstract}",
            &[("excerpt", "see {abstract}"), ("abstract", "A")],
        );
        assert_eq!(out, "see {abstract} / A");
    }

    #[test]
    fn test_render_joins_lists() {
        let topics = vec!["Deep Learning".to_string(), "Graph Theory".to_string()];
        let gaps = vec!["gap one".to_string(), "gap two".to_string()];
        let context = PromptContext {
            text: "paper body",
            abstract_text: "An abstract.",
            topics: &topics,
            gaps: &gaps,
        };

        let prompt = context.render(Stage::FutureDirections);
        assert!(prompt.contains("gap one; gap two"));
        assert!(prompt.contains("Deep Learning, Graph Theory"));
        assert!(prompt.contains("An abstract."));
        assert!(prompt.contains("paper body"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_render_truncates_excerpt() {
        let text = "x".repeat(6000);
        let prompt = PromptContext::new(&text).render(Stage::SummaryQuestions);
        assert!(prompt.contains(&"x".repeat(3000)));
        assert!(!prompt.contains(&"x".repeat(3001)));
    }

    #[test]
    fn test_sampling_parameters() {
        let spec = Stage::Topics.spec();
        assert_eq!(spec.excerpt_chars, 5000);
        assert_eq!(spec.temperature, 0.5);
        assert_eq!(spec.max_tokens, 150);

        let spec = Stage::SummaryTopic.spec();
        assert_eq!(spec.excerpt_chars, 4000);
        assert_eq!(spec.max_tokens, 100);
    }
}
