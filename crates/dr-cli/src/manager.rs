//! Research pipeline orchestration.
//!
//! `ResearchManager` drives the four-stage pipeline: plan searches, execute
//! them concurrently, synthesize a report, and optionally deliver it by
//! email. Progress is reported as a stream of `ResearchEvent`s so the caller
//! can render updates while the pipeline runs.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use dr_agents::{
    EmailAgent, PlannerAgent, ReportData, ResearchAgent, SearchAgent, WebSearchItem,
    WebSearchPlan, WriterAgent,
};
use dr_core::{Agent, Error, Provider, ToolRegistry};

use crate::util::format_duration;

/// Progress and result events emitted by a pipeline run, in order.
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    /// The run has started and been assigned a trace id.
    Started { trace_id: String },
    /// The planner produced a search plan.
    Planned { searches: usize },
    /// One more search finished (successfully or not).
    SearchProgress { completed: usize, total: usize },
    /// All searches are done; `results` counts the successful ones.
    SearchesComplete { results: usize },
    /// The writer produced the report.
    ReportWritten { short_summary: String },
    /// The report was delivered by email.
    EmailSent,
    /// Email delivery was disabled or not configured.
    EmailSkipped,
    /// The pipeline finished; carries the full report.
    Completed { report: ReportData },
    /// The pipeline aborted at `stage`.
    Failed { stage: &'static str, error: String },
}

/// Orchestrates the deep-research pipeline.
#[derive(Clone)]
pub struct ResearchManager {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    max_searches: usize,
    send_email: bool,
}

impl ResearchManager {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            max_searches: dr_agents::DEFAULT_SEARCH_COUNT,
            send_email: true,
        }
    }

    pub fn with_max_searches(mut self, max_searches: usize) -> Self {
        self.max_searches = max_searches;
        self
    }

    pub fn with_email(mut self, send_email: bool) -> Self {
        self.send_email = send_email;
        self
    }

    /// Run the pipeline for `query`, returning a stream of events.
    ///
    /// The stream always terminates with either `Completed` or `Failed`.
    pub fn run(&self, query: String) -> ReceiverStream<ResearchEvent> {
        let (tx, rx) = mpsc::channel(32);
        let manager = self.clone();
        let trace_id = generate_trace_id();
        let span = info_span!("research", trace_id = %trace_id);

        tokio::spawn(
            async move {
                manager.run_pipeline(trace_id, query, tx).await;
            }
            .instrument(span),
        );

        ReceiverStream::new(rx)
    }

    async fn run_pipeline(&self, trace_id: String, query: String, tx: mpsc::Sender<ResearchEvent>) {
        let started = Instant::now();

        info!(query = %query, "Research run starting");
        let _ = tx
            .send(ResearchEvent::Started {
                trace_id: trace_id.clone(),
            })
            .await;

        let plan = match self.plan_searches(&query).await {
            Ok(plan) => plan,
            Err(e) => {
                let _ = tx
                    .send(ResearchEvent::Failed {
                        stage: "plan",
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        };
        let _ = tx
            .send(ResearchEvent::Planned {
                searches: plan.searches.len(),
            })
            .await;

        let results = self.perform_searches(&plan, &tx).await;
        let _ = tx
            .send(ResearchEvent::SearchesComplete {
                results: results.len(),
            })
            .await;

        let report = match self.write_report(&query, &results).await {
            Ok(report) => report,
            Err(e) => {
                let _ = tx
                    .send(ResearchEvent::Failed {
                        stage: "report",
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        };
        let _ = tx
            .send(ResearchEvent::ReportWritten {
                short_summary: report.short_summary.clone(),
            })
            .await;

        if self.send_email {
            if let Err(e) = self.send_email(&report).await {
                let _ = tx
                    .send(ResearchEvent::Failed {
                        stage: "email",
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
            let _ = tx.send(ResearchEvent::EmailSent).await;
        } else {
            let _ = tx.send(ResearchEvent::EmailSkipped).await;
        }

        info!(
            duration = %format_duration(started.elapsed()),
            "Research run complete"
        );
        let _ = tx.send(ResearchEvent::Completed { report }).await;
    }

    /// Ask the planner for a search plan.
    async fn plan_searches(&self, query: &str) -> Result<WebSearchPlan, Error> {
        let planner = PlannerAgent::new(self.max_searches);
        let input = format!("Query: {}", query);

        let mut plan: WebSearchPlan = Agent::run_structured(
            self.provider.clone(),
            self.tools.clone(),
            planner.agent_config(),
            input,
        )
        .await?;

        // The prompt asks for max_searches terms, but the model is not bound
        // to honor it.
        plan.searches.truncate(self.max_searches);

        info!(searches = plan.searches.len(), "Search plan ready");
        Ok(plan)
    }

    /// Run all planned searches concurrently, reporting progress as each one
    /// finishes. Failed searches are dropped from the results but still
    /// counted toward progress.
    async fn perform_searches(
        &self,
        plan: &WebSearchPlan,
        tx: &mpsc::Sender<ResearchEvent>,
    ) -> Vec<String> {
        let total = plan.searches.len();
        let mut pending: FuturesUnordered<_> = plan
            .searches
            .iter()
            .map(|item| self.search(item))
            .collect();

        let mut results = Vec::new();
        let mut completed = 0;

        while let Some(result) = pending.next().await {
            completed += 1;
            if let Some(summary) = result {
                results.push(summary);
            }
            let _ = tx
                .send(ResearchEvent::SearchProgress { completed, total })
                .await;
        }

        results
    }

    /// Run a single search-and-summarize task. Failures are logged and
    /// swallowed so one bad search does not sink the run.
    async fn search(&self, item: &WebSearchItem) -> Option<String> {
        let agent = SearchAgent::new();
        let input = format!("Search term: {}\nReason for searching: {}", item.query, item.reason);

        match Agent::run_once(
            self.provider.clone(),
            self.tools.clone(),
            agent.agent_config(),
            input,
        )
        .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(query = %item.query, error = %e, "Search failed, skipping");
                None
            }
        }
    }

    /// Synthesize the report from the original query and the search
    /// summaries.
    async fn write_report(&self, query: &str, results: &[String]) -> Result<ReportData, Error> {
        let writer = WriterAgent::new();
        let input = format!(
            "Original query: {}\nSummarized search results: {}",
            query,
            results.join("\n\n")
        );

        Agent::run_structured(
            self.provider.clone(),
            self.tools.clone(),
            writer.agent_config(),
            input,
        )
        .await
    }

    /// Hand the report to the email agent for formatting and delivery.
    async fn send_email(&self, report: &ReportData) -> Result<(), Error> {
        let agent = EmailAgent::new();

        Agent::run_once(
            self.provider.clone(),
            self.tools.clone(),
            agent.agent_config(),
            report.markdown_report.clone(),
        )
        .await?;

        Ok(())
    }
}

/// Build a unique, sortable id for one pipeline run.
fn generate_trace_id() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("research_{}_{}", timestamp, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dr_core::testing::MockProvider;
    use dr_core::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};
    use dr_core::{CompletionResponse, FinishReason, Message, ToolCall};

    struct StubTool(&'static str);

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name(), self.description()).with_parameters(
                ToolParameters::new()
                    .add_property("input", PropertySchema::string("input"), false),
            )
        }

        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
            Ok(ToolOutput::success("stub result"))
        }
    }

    fn test_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(StubTool("web_search")));
        registry.register(Box::new(StubTool("send_email")));
        Arc::new(registry)
    }

    fn plan_json(queries: &[&str]) -> String {
        let searches: Vec<_> = queries
            .iter()
            .map(|q| serde_json::json!({"query": q, "reason": "because"}))
            .collect();
        serde_json::json!({ "searches": searches }).to_string()
    }

    fn report_json(summary: &str) -> String {
        serde_json::json!({
            "short_summary": summary,
            "markdown_report": "# Report\n\nBody.",
            "follow_up_questions": ["What next?"]
        })
        .to_string()
    }

    fn tool_call_response(name: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call-1", name, serde_json::json!({}))],
            ),
            usage: Default::default(),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::ToolCalls,
        }
    }

    async fn collect_events(stream: ReceiverStream<ResearchEvent>) -> Vec<ResearchEvent> {
        stream.collect().await
    }

    #[test]
    fn test_generate_trace_id_shape() {
        let id = generate_trace_id();
        assert!(id.starts_with("research_"));
        assert_ne!(generate_trace_id(), id);
    }

    #[tokio::test]
    async fn test_full_pipeline_without_email() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["rust async", "tokio internals"]));
        provider.queue_response("summary one");
        provider.queue_response("summary two");
        provider.queue_response(&report_json("All about async Rust"));

        let manager = ResearchManager::new(provider.clone(), test_registry()).with_email(false);
        let events = collect_events(manager.run("how does tokio work".to_string())).await;

        assert!(matches!(events[0], ResearchEvent::Started { .. }));
        assert!(matches!(events[1], ResearchEvent::Planned { searches: 2 }));
        assert!(matches!(
            events[2],
            ResearchEvent::SearchProgress { completed: 1, total: 2 }
        ));
        assert!(matches!(
            events[3],
            ResearchEvent::SearchProgress { completed: 2, total: 2 }
        ));
        assert!(matches!(events[4], ResearchEvent::SearchesComplete { results: 2 }));
        match &events[5] {
            ResearchEvent::ReportWritten { short_summary } => {
                assert_eq!(short_summary, "All about async Rust");
            }
            other => panic!("Expected ReportWritten, got {:?}", other),
        }
        assert!(matches!(events[6], ResearchEvent::EmailSkipped));
        match &events[7] {
            ResearchEvent::Completed { report } => {
                assert_eq!(report.short_summary, "All about async Rust");
            }
            other => panic!("Expected Completed, got {:?}", other),
        }
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_pipeline_sends_email() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["one query"]));
        provider.queue_response("summary");
        provider.queue_response(&report_json("Summary"));
        // Email agent calls the send_email tool, then acknowledges.
        provider.queue_raw_response(tool_call_response("send_email"));
        provider.queue_response("Email sent.");

        let manager = ResearchManager::new(provider.clone(), test_registry());
        let events = collect_events(manager.run("query".to_string())).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::EmailSent)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_planner_failure_aborts_run() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("this is not a search plan");

        let manager = ResearchManager::new(provider, test_registry()).with_email(false);
        let events = collect_events(manager.run("query".to_string())).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ResearchEvent::Started { .. }));
        match &events[1] {
            ResearchEvent::Failed { stage, .. } => assert_eq!(*stage, "plan"),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_search_is_skipped_but_counted() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["good query", "bad query"]));
        // One search succeeds, one errors out at the provider.
        provider.queue_response("the one good summary");
        provider.queue_error(Error::network("connection reset"));
        provider.queue_response(&report_json("Partial results"));

        let manager = ResearchManager::new(provider, test_registry()).with_email(false);
        let events = collect_events(manager.run("query".to_string())).await;

        let progress: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ResearchEvent::SearchProgress { .. }))
            .collect();
        assert_eq!(progress.len(), 2);

        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::SearchesComplete { results: 1 })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_empty_plan_produces_empty_report_input() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&[]));
        provider.queue_response(&report_json("Nothing to report"));

        let manager = ResearchManager::new(provider.clone(), test_registry()).with_email(false);
        let events = collect_events(manager.run("query".to_string())).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::Planned { searches: 0 })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, ResearchEvent::SearchProgress { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_plan_is_capped_at_max_searches() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["a", "b", "c"]));
        provider.queue_response("summary");
        provider.queue_response(&report_json("Capped"));

        let manager = ResearchManager::new(provider, test_registry())
            .with_max_searches(1)
            .with_email(false);
        let events = collect_events(manager.run("query".to_string())).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, ResearchEvent::Planned { searches: 1 })));
    }

    #[tokio::test]
    async fn test_email_failure_aborts_run() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["query"]));
        provider.queue_response("summary");
        provider.queue_response(&report_json("Summary"));
        // The email agent's completion call fails.
        provider.queue_error(Error::network("mail provider unreachable"));

        let manager = ResearchManager::new(provider, test_registry());
        let events = collect_events(manager.run("query".to_string())).await;

        match events.last().unwrap() {
            ResearchEvent::Failed { stage, error } => {
                assert_eq!(*stage, "email");
                assert!(error.contains("mail provider unreachable"));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(!events.iter().any(|e| matches!(
            e,
            ResearchEvent::EmailSent | ResearchEvent::Completed { .. }
        )));
    }

    #[tokio::test]
    async fn test_report_failure_aborts_run() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(&plan_json(&["query"]));
        provider.queue_response("summary");
        provider.queue_response("not valid report json");

        let manager = ResearchManager::new(provider, test_registry()).with_email(false);
        let events = collect_events(manager.run("query".to_string())).await;

        match events.last().unwrap() {
            ResearchEvent::Failed { stage, .. } => assert_eq!(*stage, "report"),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }
}
