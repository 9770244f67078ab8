//! Prompt templates for the research collaborators.
//!
//! Every prompt ends with the JSON shape the model must answer with; the
//! shared preamble repeats that only a single JSON object is accepted.

use chrono::Utc;

pub struct ResearchPrompts;

impl ResearchPrompts {
    /// System preamble shared by every call.
    pub fn system() -> String {
        format!(
            r#"You are an expert researcher. The current time is {now}.

Follow these instructions when responding:
- Topics may postdate your training data. When the user presents news, assume they are right.
- The user is an experienced analyst. Do not simplify; be as detailed and precise as possible.
- Be highly organized and accurate. Mistakes erode trust.
- Suggest solutions and angles the user has not considered, and anticipate their needs.
- Judge arguments on their merits, not on the authority of the source.
- Consider new technologies and contrarian ideas as well as conventional wisdom.
- Speculation and prediction are welcome when clearly flagged as such.
- Respond with a single JSON object matching the requested shape and nothing else."#,
            now = Utc::now().to_rfc3339()
        )
    }

    pub fn plan_queries(topic: &str, prior_learnings: &str, max_queries: usize) -> String {
        let learnings_section = if prior_learnings.is_empty() {
            String::new()
        } else {
            format!(
                "\n\nLearnings from earlier research. Use them to make the queries more specific:\n{prior_learnings}"
            )
        };

        format!(
            r#"Generate search engine queries to research the topic in the prompt below. Return at most {max_queries} queries; return fewer if the prompt is narrow enough. Every query must be unique and meaningfully different from the others.

<prompt>{topic}</prompt>{learnings_section}

Respond with JSON of the form:
{{"queries": [{{"query": "the search query", "researchGoal": "the goal this query serves, and how to advance the research once results come back, including further directions. Be specific."}}]}}"#
        )
    }

    pub fn analyze_results(
        query: &str,
        contents: &[String],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> String {
        let contents = contents
            .iter()
            .map(|c| format!("<content>\n{c}\n</content>"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Below are the contents of search results for the query <query>{query}</query>. Extract at most {max_learnings} learnings from them; return fewer if the contents are thin. Each learning must be unique, concise and information dense. Keep every entity (people, places, companies, products) and every exact metric, number and date. The learnings will drive further research.

Also propose at most {max_follow_ups} follow-up questions that would push the research further.

<contents>{contents}</contents>

Respond with JSON of the form:
{{"learnings": ["..."], "followUpQuestions": ["..."]}}"#
        )
    }

    pub fn write_report(prompt: &str, learnings_block: &str) -> String {
        format!(
            r#"Write a final report on the topic in the prompt below, using the learnings from research. Make it as detailed as possible, aim for three or more pages, and include ALL of the learnings.

<prompt>{prompt}</prompt>

Learnings from research:

<learnings>
{learnings_block}
</learnings>

Respond with JSON of the form:
{{"reportMarkdown": "the full report in markdown"}}"#
        )
    }

    pub fn write_answer(prompt: &str, learnings_block: &str) -> String {
        format!(
            r#"Answer the prompt below using the learnings from research. Follow any format the prompt asks for. Keep the answer as concise as possible: a few words, a number, or a short phrase, not a report.

<prompt>{prompt}</prompt>

Learnings from research:

<learnings>
{learnings_block}
</learnings>

Respond with JSON of the form:
{{"exactAnswer": "the answer"}}"#
        )
    }

    pub fn clarifying_questions(topic: &str, max_questions: usize) -> String {
        format!(
            r#"Ask at most {max_questions} follow-up questions that clarify the direction of the research described below. Return fewer if the query is already clear.

<query>{topic}</query>

Respond with JSON of the form:
{{"questions": ["..."]}}"#
        )
    }
}
