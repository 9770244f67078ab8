//! # Agent Module
//!
//! The language-model collaborators of the research engine: query planner,
//! result analyzer, report and answer writers, and the clarifying-question
//! generator used by the CLI.
//!
//! [`ResearchModel`] is the seam the engine depends on; [`ResearchAgent`]
//! implements it with Rig agents talking to Ollama or OpenAI.

pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::{ollama, openai};
use serde::Deserialize;
use tracing::debug;

use crate::config::{Config, LlmProvider};
use crate::error::{ResearchError, Result};
use crate::research::{Analysis, CandidateQuery};
use crate::text::{default_token_counter, TextTrimmer};

use self::parse::parse_json_response;
use self::prompts::ResearchPrompts;

/// Language-model operations the research engine relies on.
#[async_trait]
pub trait ResearchModel: Send + Sync {
    /// Propose at most `max_queries` search queries for `topic`.
    async fn plan_queries(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> Result<Vec<CandidateQuery>>;

    /// Extract learnings and follow-up questions from trimmed page contents.
    async fn analyze_results(
        &self,
        query: &str,
        contents: &[String],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> Result<Analysis>;

    /// Write a markdown report. The learnings block is already trimmed.
    async fn write_report(&self, prompt: &str, learnings_block: &str) -> Result<String>;

    /// Write a short, exact answer. The learnings block is already trimmed.
    async fn write_answer(&self, prompt: &str, learnings_block: &str) -> Result<String>;

    /// Questions that would clarify the direction of the research.
    async fn clarifying_questions(&self, topic: &str, max_questions: usize) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct QueryPlan {
    #[serde(default)]
    queries: Vec<CandidateQuery>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportOutput {
    #[serde(alias = "report_markdown")]
    report_markdown: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerOutput {
    #[serde(alias = "exact_answer")]
    exact_answer: String,
}

#[derive(Debug, Deserialize)]
struct Clarification {
    #[serde(default)]
    questions: Vec<String>,
}

enum Backend {
    Ollama(ollama::Client),
    OpenAI(openai::Client),
}

/// Rig-backed implementation of [`ResearchModel`].
pub struct ResearchAgent {
    backend: Backend,
    model: String,
    temperature: f64,

    /// Bounds prompt sections the engine does not trim itself
    trimmer: TextTrimmer,
}

impl ResearchAgent {
    pub fn new(config: &Config) -> Result<Self> {
        let backend = match config.provider {
            LlmProvider::Ollama => {
                // Rig reads the Ollama host from OLLAMA_API_BASE_URL.
                std::env::set_var("OLLAMA_API_BASE_URL", &config.ollama_host);
                Backend::Ollama(ollama::Client::from_env())
            }
            LlmProvider::OpenAI => {
                let api_key = config
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| ResearchError::Config("OPENAI_API_KEY is not set".to_string()))?;
                Backend::OpenAI(openai::Client::from_val(api_key.into()))
            }
        };

        debug!(provider = %config.provider, model = %config.model(), "LLM client ready");

        Ok(Self {
            backend,
            model: config.model().to_string(),
            temperature: f64::from(config.temperature),
            trimmer: TextTrimmer::new(default_token_counter())
                .with_default_budget(config.context_size),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let preamble = ResearchPrompts::system();

        let response = match &self.backend {
            Backend::Ollama(client) => {
                client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .temperature(self.temperature)
                    .build()
                    .prompt(prompt)
                    .await
            }
            Backend::OpenAI(client) => {
                client
                    .agent(&self.model)
                    .preamble(&preamble)
                    .temperature(self.temperature)
                    .build()
                    .prompt(prompt)
                    .await
            }
        };

        response.map_err(|e| ResearchError::Llm(format!("completion failed: {}", e)))
    }

    async fn complete_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        prompt: &str,
    ) -> Result<T> {
        let text = self.complete(prompt).await?;
        parse_json_response(operation, &text)
    }
}

#[async_trait]
impl ResearchModel for ResearchAgent {
    async fn plan_queries(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> Result<Vec<CandidateQuery>> {
        let learnings = self.trimmer.trim(&prior_learnings.join("\n"));
        let prompt = ResearchPrompts::plan_queries(topic, &learnings, max_queries);

        let plan: QueryPlan = self.complete_json("query plan", &prompt).await?;
        let queries: Vec<CandidateQuery> = plan
            .queries
            .into_iter()
            .filter(|q| !q.query.trim().is_empty())
            .take(max_queries)
            .collect();

        debug!(topic = %topic, count = queries.len(), "Generated search queries");
        Ok(queries)
    }

    async fn analyze_results(
        &self,
        query: &str,
        contents: &[String],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> Result<Analysis> {
        let prompt = ResearchPrompts::analyze_results(query, contents, max_learnings, max_follow_ups);
        self.complete_json("result analysis", &prompt).await
    }

    async fn write_report(&self, prompt: &str, learnings_block: &str) -> Result<String> {
        let prompt = ResearchPrompts::write_report(prompt, learnings_block);
        let output: ReportOutput = self.complete_json("report", &prompt).await?;
        Ok(output.report_markdown)
    }

    async fn write_answer(&self, prompt: &str, learnings_block: &str) -> Result<String> {
        let prompt = ResearchPrompts::write_answer(prompt, learnings_block);
        let output: AnswerOutput = self.complete_json("answer", &prompt).await?;
        Ok(output.exact_answer)
    }

    async fn clarifying_questions(&self, topic: &str, max_questions: usize) -> Result<Vec<String>> {
        let prompt = ResearchPrompts::clarifying_questions(&self.trimmer.trim(topic), max_questions);
        let output: Clarification = self.complete_json("clarifying questions", &prompt).await?;
        Ok(output.questions.into_iter().take(max_questions).collect())
    }
}
