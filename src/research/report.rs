//! Final report and answer synthesis.

use tracing::info;

use crate::error::Result;

use super::orchestrator::DeepResearch;

impl DeepResearch {
    /// Write a long-form markdown report from the accumulated learnings and
    /// append a `Sources` section listing every visited URL.
    pub async fn synthesize_report(
        &self,
        prompt: &str,
        learnings: &[String],
        visited_urls: &[String],
    ) -> Result<String> {
        let block = self.learnings_block(learnings);
        info!(learnings = learnings.len(), urls = visited_urls.len(), "Writing final report");

        let report = self.model.write_report(prompt, &block).await?;
        Ok(format!("{report}{}", sources_section(visited_urls)))
    }

    /// Write a concise answer to the prompt from the accumulated learnings.
    pub async fn synthesize_answer(&self, prompt: &str, learnings: &[String]) -> Result<String> {
        let block = self.learnings_block(learnings);
        info!(learnings = learnings.len(), "Writing final answer");

        self.model.write_answer(prompt, &block).await
    }

    fn learnings_block(&self, learnings: &[String]) -> String {
        self.trimmer
            .trim_to(&format_learnings(learnings), self.settings.learnings_token_budget)
    }
}

/// Wrap each learning in `<learning>` tags, one per block.
pub fn format_learnings(learnings: &[String]) -> String {
    learnings
        .iter()
        .map(|l| format!("<learning>\n{l}\n</learning>"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sources_section(visited_urls: &[String]) -> String {
    let bullets = visited_urls
        .iter()
        .map(|url| format!("- {url}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n## Sources\n\n{bullets}")
}

/// Combine the initial topic with the user's answers to clarifying questions.
///
/// Questions without an answer are paired with an empty answer.
pub fn combine_feedback(topic: &str, questions: &[String], answers: &[String]) -> String {
    if questions.is_empty() {
        return topic.to_string();
    }

    let pairs = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let answer = answers.get(i).map(String::as_str).unwrap_or("");
            format!("Q: {q}\nA: {answer}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Initial Query: {topic}\nFollow-up Questions and Answers:\n{pairs}")
}
