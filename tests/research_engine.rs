//! End-to-end behaviour of the research engine against scripted collaborators.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use deep_research::agent::ResearchModel;
use deep_research::error::{ResearchError, Result, SearchError};
use deep_research::research::{
    Analysis, CandidateQuery, DeepResearch, ProgressSink, ResearchProgress, ResearchSettings,
    ResearchState,
};
use deep_research::text::ApproxTokenCounter;
use deep_research::tools::{SearchHit, SearchOptions, SearchProvider};

const NESTED_PREFIX: &str = "Previous research goal: goal-";

#[derive(Debug, Clone, PartialEq)]
struct PlanCall {
    topic: String,
    prior_learnings: Vec<String>,
    max_queries: usize,
}

/// Planner/analyzer with scripted answers.
///
/// The root level plans `root_queries`; a nested level planned for parent
/// query `p` plans `p.0`, `p.1`, ...
#[derive(Default)]
struct ScriptedModel {
    root_queries: Vec<String>,
    follow_ups: HashMap<String, Vec<String>>,
    extra_queries: usize,
    common_learning: Option<String>,
    extra_learnings: usize,
    slow_analysis: HashSet<String>,
    malformed_analysis: HashSet<String>,
    fail_root_planning: bool,
    fail_nested_planning: bool,
    plans: Mutex<Vec<PlanCall>>,
    report_blocks: Mutex<Vec<String>>,
    analyzed_lengths: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    fn new(root_queries: &[&str]) -> Self {
        Self {
            root_queries: root_queries.iter().map(|q| q.to_string()).collect(),
            ..Self::default()
        }
    }

    fn with_follow_ups(mut self, query: &str, questions: &[&str]) -> Self {
        self.follow_ups.insert(
            query.to_string(),
            questions.iter().map(|q| q.to_string()).collect(),
        );
        self
    }

    fn plans(&self) -> Vec<PlanCall> {
        self.plans.lock().unwrap().clone()
    }
}

fn learning_for(query: &str) -> String {
    format!("learning about {query}")
}

#[async_trait]
impl ResearchModel for ScriptedModel {
    async fn plan_queries(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> Result<Vec<CandidateQuery>> {
        self.plans.lock().unwrap().push(PlanCall {
            topic: topic.to_string(),
            prior_learnings: prior_learnings.to_vec(),
            max_queries,
        });

        let names: Vec<String> = match topic.strip_prefix(NESTED_PREFIX) {
            Some(rest) => {
                if self.fail_nested_planning {
                    return Err(ResearchError::Llm("planner offline".to_string()));
                }
                let parent = rest.lines().next().unwrap_or_default();
                (0..max_queries + self.extra_queries)
                    .map(|i| format!("{parent}.{i}"))
                    .collect()
            }
            None => {
                if self.fail_root_planning {
                    return Err(ResearchError::Llm("planner offline".to_string()));
                }
                let mut names = self.root_queries.clone();
                names.extend((0..self.extra_queries).map(|i| format!("extra-{i}")));
                names
            }
        };

        Ok(names
            .into_iter()
            .map(|q| CandidateQuery::new(q.clone(), format!("goal-{q}")))
            .collect())
    }

    async fn analyze_results(
        &self,
        query: &str,
        contents: &[String],
        _max_learnings: usize,
        _max_follow_ups: usize,
    ) -> Result<Analysis> {
        assert!(contents.iter().all(|c| c.contains(query)));
        self.analyzed_lengths
            .lock()
            .unwrap()
            .extend(contents.iter().map(|c| c.chars().count()));

        if self.slow_analysis.contains(query) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.malformed_analysis.contains(query) {
            return Err(ResearchError::malformed(
                "result analysis",
                "missing field `learnings`",
            ));
        }

        let mut learnings = vec![learning_for(query)];
        learnings.extend(self.common_learning.clone());
        learnings.extend((0..self.extra_learnings).map(|i| format!("{query} detail {i}")));

        Ok(Analysis {
            learnings,
            follow_up_questions: self.follow_ups.get(query).cloned().unwrap_or_default(),
        })
    }

    async fn write_report(&self, _prompt: &str, learnings_block: &str) -> Result<String> {
        self.report_blocks
            .lock()
            .unwrap()
            .push(learnings_block.to_string());
        Ok("# Report\n\nFindings.".to_string())
    }

    async fn write_answer(&self, _prompt: &str, _learnings_block: &str) -> Result<String> {
        Ok("42".to_string())
    }

    async fn clarifying_questions(&self, _topic: &str, _max_questions: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Search provider returning one page per query, with scripted failures.
#[derive(Default)]
struct ScriptedSearch {
    failing: HashSet<String>,
    slow: HashSet<String>,
    shared_url: bool,
    page_body: Option<String>,
    latency: Option<Duration>,
    started: Mutex<Vec<Instant>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedSearch {
    fn failing(queries: &[&str]) -> Self {
        Self {
            failing: queries.iter().map(|q| q.to_string()).collect(),
            ..Self::default()
        }
    }

    fn slow(queries: &[&str]) -> Self {
        Self {
            slow: queries.iter().map(|q| q.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> std::result::Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.slow.contains(query) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(query) {
            return Err(SearchError::Network("connection reset".to_string()));
        }

        let content = match self.page_body {
            Some(ref body) => format!("{query} {body}"),
            None => format!("content for {query}"),
        };
        let mut hits = vec![
            SearchHit::new(format!("https://example.com/{query}"), content),
            // No URL and no content: dropped by the engine
            SearchHit::default(),
        ];
        if self.shared_url {
            hits.push(SearchHit {
                url: Some("https://example.com/shared".to_string()),
                title: None,
                markdown: None,
            });
        }
        assert!(hits.len() <= options.limit);
        Ok(hits)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ResearchProgress>>);

impl ProgressSink for Recorder {
    fn report(&self, progress: &ResearchProgress) {
        self.0.lock().unwrap().push(progress.clone());
    }
}

fn test_settings() -> ResearchSettings {
    ResearchSettings::default()
        .with_rate_limit_delay(Duration::ZERO)
        .with_search_timeout(Duration::from_millis(100))
}

fn engine(model: Arc<ScriptedModel>, search: Arc<ScriptedSearch>, settings: ResearchSettings) -> DeepResearch {
    DeepResearch::new(model, search, settings)
        .with_token_counter(Arc::new(ApproxTokenCounter::default()))
}

#[tokio::test]
async fn test_single_level_collects_every_branch() {
    let model = Arc::new(ScriptedModel::new(&["alpha", "beta"]));
    let search = Arc::new(ScriptedSearch::default());
    let engine = engine(model.clone(), search.clone(), test_settings());

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(
        result.learnings,
        vec![learning_for("alpha"), learning_for("beta")]
    );
    assert_eq!(
        result.visited_urls,
        vec!["https://example.com/alpha", "https://example.com/beta"]
    );
    assert_eq!(result.failed_branches, 0);

    // depth 1 never recurses
    assert_eq!(model.plans().len(), 1);
    assert_eq!(search.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_depth_zero_runs_a_single_level() {
    let model = Arc::new(ScriptedModel::new(&["alpha"]).with_follow_ups("alpha", &["why?"]));
    let engine = engine(model.clone(), Arc::new(ScriptedSearch::default()), test_settings());

    let result = engine.research("topic X", 1, 0).await.unwrap();

    assert_eq!(result.learnings, vec![learning_for("alpha")]);
    assert_eq!(model.plans().len(), 1);
}

#[tokio::test]
async fn test_recursion_halves_breadth_and_is_gated_by_depth() {
    let model = Arc::new(
        ScriptedModel::new(&["alpha", "beta"]).with_follow_ups("alpha", &["Why alpha?"]),
    );
    let engine = engine(model.clone(), Arc::new(ScriptedSearch::default()), test_settings());

    let result = engine.research("topic X", 2, 2).await.unwrap();

    let plans = model.plans();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0].max_queries, 2);

    // Both branches recurse, with or without follow-up questions
    let nested: Vec<&PlanCall> = plans.iter().skip(1).collect();
    assert!(nested.iter().all(|p| p.max_queries == 1));

    let alpha = nested
        .iter()
        .find(|p| p.topic.starts_with("Previous research goal: goal-alpha"))
        .unwrap();
    assert!(alpha.topic.ends_with("Follow-up research directions: \nWhy alpha?"));
    assert_eq!(alpha.prior_learnings, vec![learning_for("alpha")]);

    let beta = nested
        .iter()
        .find(|p| p.topic.starts_with("Previous research goal: goal-beta"))
        .unwrap();
    assert_eq!(beta.topic, "Previous research goal: goal-beta\nFollow-up research directions:");

    assert_eq!(
        result.learnings,
        vec![
            learning_for("alpha"),
            learning_for("alpha.0"),
            learning_for("beta"),
            learning_for("beta.0"),
        ]
    );
    assert_eq!(result.visited_urls.len(), 4);
}

#[tokio::test]
async fn test_failed_search_is_isolated() {
    let model = Arc::new(ScriptedModel::new(&["alpha", "broken", "gamma"]));
    let search = Arc::new(ScriptedSearch::failing(&["broken"]));
    let engine = engine(model, search.clone(), test_settings());

    let result = engine.research("topic X", 3, 1).await.unwrap();

    assert_eq!(
        result.learnings,
        vec![learning_for("alpha"), learning_for("gamma")]
    );
    assert_eq!(
        result.visited_urls,
        vec!["https://example.com/alpha", "https://example.com/gamma"]
    );
    assert_eq!(result.failed_branches, 1);
    assert_eq!(search.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_search_timeout_is_isolated() {
    let model = Arc::new(ScriptedModel::new(&["alpha", "stuck"]));
    let search = Arc::new(ScriptedSearch::slow(&["stuck"]));
    let engine = engine(model, search, test_settings());

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(result.learnings, vec![learning_for("alpha")]);
    assert_eq!(result.failed_branches, 1);
}

#[tokio::test]
async fn test_root_planning_failure_propagates() {
    let model = Arc::new(ScriptedModel {
        fail_root_planning: true,
        ..ScriptedModel::new(&["alpha"])
    });
    let engine = engine(model, Arc::new(ScriptedSearch::default()), test_settings());

    let err = engine.research("topic X", 2, 2).await.unwrap_err();
    assert!(matches!(err, ResearchError::Llm(_)));
}

#[tokio::test]
async fn test_nested_planning_failure_degrades_the_branch() {
    let model = Arc::new(ScriptedModel {
        fail_nested_planning: true,
        ..ScriptedModel::new(&["alpha", "beta"])
    });
    let engine = engine(model, Arc::new(ScriptedSearch::default()), test_settings());

    let result = engine.research("topic X", 2, 2).await.unwrap();

    assert!(result.learnings.is_empty());
    assert!(result.visited_urls.is_empty());
    assert_eq!(result.failed_branches, 2);
}

#[tokio::test]
async fn test_zero_breadth_is_rejected() {
    let engine = engine(
        Arc::new(ScriptedModel::new(&["alpha"])),
        Arc::new(ScriptedSearch::default()),
        test_settings(),
    );

    let err = engine.research("topic X", 0, 2).await.unwrap_err();
    assert!(matches!(err, ResearchError::Config(_)));
}

#[tokio::test]
async fn test_results_are_deduplicated_in_first_seen_order() {
    let model = Arc::new(ScriptedModel {
        common_learning: Some("shared fact".to_string()),
        ..ScriptedModel::new(&["alpha", "beta"])
    });
    let search = Arc::new(ScriptedSearch {
        shared_url: true,
        ..ScriptedSearch::default()
    });
    let engine = engine(model, search, test_settings());

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(
        result.learnings,
        vec![learning_for("alpha"), "shared fact".to_string(), learning_for("beta")]
    );
    assert_eq!(
        result.visited_urls,
        vec![
            "https://example.com/alpha",
            "https://example.com/shared",
            "https://example.com/beta",
        ]
    );
}

#[tokio::test]
async fn test_planner_output_is_truncated_to_breadth() {
    let model = Arc::new(ScriptedModel {
        extra_queries: 3,
        ..ScriptedModel::new(&["alpha", "beta"])
    });
    let search = Arc::new(ScriptedSearch::default());
    let engine = engine(model, search.clone(), test_settings());

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.learnings.len(), 2);
}

#[tokio::test]
async fn test_concurrency_limit_bounds_searches_in_flight() {
    let model = Arc::new(ScriptedModel::new(&["a", "b", "c", "d"]));
    let search = Arc::new(ScriptedSearch {
        latency: Some(Duration::from_millis(20)),
        ..ScriptedSearch::default()
    });
    let engine = engine(model, search.clone(), test_settings().with_concurrency(2));

    let result = engine.research("topic X", 4, 1).await.unwrap();

    assert_eq!(result.learnings.len(), 4);
    assert_eq!(search.peak_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_research_from_snapshot_keeps_prior_knowledge() {
    let model = Arc::new(ScriptedModel::new(&["alpha"]));
    let engine = engine(model.clone(), Arc::new(ScriptedSearch::default()), test_settings());

    let state = ResearchState::new("topic X", 1, 1)
        .with_learnings(vec!["prior fact".to_string()])
        .with_visited_urls(vec!["https://example.com/prior".to_string()]);
    let result = engine.research_with(state).await.unwrap();

    assert_eq!(model.plans()[0].prior_learnings, vec!["prior fact"]);
    assert_eq!(
        result.learnings,
        vec!["prior fact".to_string(), learning_for("alpha")]
    );
    assert_eq!(
        result.visited_urls,
        vec!["https://example.com/prior", "https://example.com/alpha"]
    );
}

#[tokio::test]
async fn test_progress_counts_every_query_in_the_tree() {
    let model = Arc::new(ScriptedModel::new(&["alpha", "beta"]));
    let recorder = Arc::new(Recorder::default());
    let engine = engine(model, Arc::new(ScriptedSearch::default()), test_settings())
        .with_progress(recorder.clone());

    engine.research("topic X", 2, 2).await.unwrap();

    let snapshots = recorder.0.lock().unwrap();
    let last = snapshots.last().unwrap();
    assert_eq!(last.total_depth, 2);
    assert_eq!(last.total_breadth, 2);
    assert_eq!(last.total_queries, 4);
    assert_eq!(last.completed_queries, 4);
    assert_eq!(last.current_depth, 0);
}

#[tokio::test]
async fn test_report_lists_sources_in_order() {
    let model = Arc::new(ScriptedModel::new(&["alpha"]));
    let engine = engine(model.clone(), Arc::new(ScriptedSearch::default()), test_settings());

    let report = engine
        .synthesize_report(
            "topic X",
            &["fact one".to_string(), "fact two".to_string()],
            &["https://a.example".to_string(), "https://b.example".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(
        report,
        "# Report\n\nFindings.\n\n## Sources\n\n- https://a.example\n- https://b.example"
    );
    assert_eq!(
        model.report_blocks.lock().unwrap()[0],
        "<learning>\nfact one\n</learning>\n<learning>\nfact two\n</learning>"
    );
}

#[tokio::test]
async fn test_answer_has_no_sources_section() {
    let engine = engine(
        Arc::new(ScriptedModel::new(&["alpha"])),
        Arc::new(ScriptedSearch::default()),
        test_settings(),
    );

    let answer = engine
        .synthesize_answer("topic X", &["fact".to_string()])
        .await
        .unwrap();
    assert_eq!(answer, "42");
}

#[tokio::test]
async fn test_analysis_timeout_is_isolated() {
    let model = Arc::new(ScriptedModel {
        slow_analysis: ["stuck".to_string()].into_iter().collect(),
        ..ScriptedModel::new(&["alpha", "stuck"])
    });
    let settings = test_settings().with_analysis_timeout(Duration::from_millis(50));
    let engine = engine(model, Arc::new(ScriptedSearch::default()), settings);

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(result.learnings, vec![learning_for("alpha")]);
    // The search itself succeeded; the branch still contributes nothing
    assert_eq!(result.visited_urls, vec!["https://example.com/alpha"]);
    assert_eq!(result.failed_branches, 1);
}

#[tokio::test]
async fn test_malformed_analysis_is_isolated() {
    let model = Arc::new(ScriptedModel {
        malformed_analysis: ["garbled".to_string()].into_iter().collect(),
        ..ScriptedModel::new(&["garbled", "beta"])
    });
    let engine = engine(model, Arc::new(ScriptedSearch::default()), test_settings());

    let result = engine.research("topic X", 2, 1).await.unwrap();

    assert_eq!(result.learnings, vec![learning_for("beta")]);
    assert_eq!(result.visited_urls, vec!["https://example.com/beta"]);
    assert_eq!(result.failed_branches, 1);
}

#[tokio::test]
async fn test_pages_are_trimmed_before_analysis() {
    let model = Arc::new(ScriptedModel::new(&["alpha", "beta"]));
    let search = Arc::new(ScriptedSearch {
        page_body: Some("word ".repeat(200)),
        ..ScriptedSearch::default()
    });
    // Three chars per token: a 100-token budget keeps at most 300 chars
    let engine = DeepResearch::new(model.clone(), search, test_settings().with_page_token_budget(100))
        .with_token_counter(Arc::new(ApproxTokenCounter::new(3.0)));

    engine.research("topic X", 2, 1).await.unwrap();

    let lengths = model.analyzed_lengths.lock().unwrap();
    assert_eq!(lengths.len(), 2);
    assert!(lengths.iter().all(|&len| (140..=300).contains(&len)), "{lengths:?}");
}

#[tokio::test]
async fn test_report_learnings_block_is_trimmed() {
    let model = Arc::new(ScriptedModel::new(&["alpha"]));
    let engine = DeepResearch::new(
        model.clone(),
        Arc::new(ScriptedSearch::default()),
        test_settings().with_learnings_token_budget(100),
    )
    .with_token_counter(Arc::new(ApproxTokenCounter::new(3.0)));

    let learnings: Vec<String> = (0..50)
        .map(|i| format!("fact {i} about the research topic"))
        .collect();
    let report = engine
        .synthesize_report("topic X", &learnings, &["https://a.example".to_string()])
        .await
        .unwrap();

    assert!(report.ends_with("## Sources\n\n- https://a.example"));
    let blocks = model.report_blocks.lock().unwrap();
    let block = &blocks[0];
    assert!(block.chars().count() <= 300, "block has {} chars", block.chars().count());
    assert!(block.starts_with("<learning>\nfact 0 about the research topic\n</learning>"));
    assert!(!block.contains("fact 49"));
}

#[tokio::test]
async fn test_analysis_output_is_truncated() {
    let model = Arc::new(
        ScriptedModel {
            extra_learnings: 4,
            ..ScriptedModel::new(&["alpha"])
        }
        .with_follow_ups("alpha", &["first?", "second?", "third?"]),
    );
    let engine = engine(model.clone(), Arc::new(ScriptedSearch::default()), test_settings());

    let result = engine.research("topic X", 2, 2).await.unwrap();

    // Root branch keeps 3 learnings and ceil(2/2) = 1 follow-up question
    let nested = &model.plans()[1];
    assert!(nested.topic.ends_with("Follow-up research directions: \nfirst?"));
    assert_eq!(nested.prior_learnings.len(), 3);
    assert_eq!(
        &result.learnings[..3],
        &[
            learning_for("alpha"),
            "alpha detail 0".to_string(),
            "alpha detail 1".to_string(),
        ]
    );
    assert_eq!(result.learnings.len(), 6);
}

#[tokio::test]
async fn test_rate_limit_spaces_searches_across_the_tree() {
    let delay = Duration::from_millis(60);
    let model = Arc::new(ScriptedModel::new(&["alpha", "beta"]));
    let search = Arc::new(ScriptedSearch::default());
    let settings = test_settings()
        .with_concurrency(2)
        .with_rate_limit_delay(delay);
    let engine = engine(model, search.clone(), settings);

    let begun = Instant::now();
    let result = engine.research("topic X", 2, 2).await.unwrap();
    assert_eq!(result.failed_branches, 0);

    let mut started = search.started.lock().unwrap().clone();
    started.sort();
    assert_eq!(started.len(), 4);

    // The first search waits one delay too
    assert!(started[0].duration_since(begun) >= delay);
    for pair in started.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(50), "searches only {gap:?} apart");
    }
}
