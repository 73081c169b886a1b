//! The four model stages. Each renders one template, makes exactly one
//! client call and returns the accumulated reply text. Client errors are
//! returned as-is.

use tracing::{debug, instrument};

use reviewlens_llm::ChatClient;
use reviewlens_shared::Result;

use crate::prompts::{self, AnalysisMode, COMPARE_TEMPLATE, REPORT_TEMPLATE};

/// Categorize the negative reviews in one batch.
#[instrument(skip_all, fields(mode = mode.as_str(), chars = batch_text.len()))]
pub async fn analyze<C: ChatClient>(
    batch_text: &str,
    client: &C,
    mode: AnalysisMode,
) -> Result<String> {
    let prompt = prompts::render(&mode.analyze_template(), &[("document", batch_text)]);
    call(client, &prompt, "analyze").await
}

/// Combine the issue lists of several batches into one.
#[instrument(skip_all, fields(mode = mode.as_str(), chars = batch_results.len()))]
pub async fn merge<C: ChatClient>(
    batch_results: &str,
    client: &C,
    mode: AnalysisMode,
) -> Result<String> {
    let prompt = prompts::render(&mode.merge_template(), &[("reviews", batch_results)]);
    call(client, &prompt, "merge").await
}

/// Narrate an issue list as a markdown report.
#[instrument(skip_all, fields(chars = issue_text.len()))]
pub async fn report<C: ChatClient>(issue_text: &str, client: &C) -> Result<String> {
    let prompt = prompts::render(REPORT_TEMPLATE, &[("reviews", issue_text)]);
    call(client, &prompt, "report").await
}

/// Contrast a target issue list with the concatenated baseline lists.
///
/// The report header cites `target_id` (and `lang`) exactly as given.
#[instrument(skip_all, fields(target_version = target_id, lang = lang.unwrap_or("-")))]
pub async fn compare<C: ChatClient>(
    target_text: &str,
    baseline_text: &str,
    target_id: &str,
    client: &C,
    lang: Option<&str>,
) -> Result<String> {
    let header = prompts::compare_header(target_id, lang);
    let prompt = prompts::render(
        COMPARE_TEMPLATE,
        &[
            ("target", target_text),
            ("baseline", baseline_text),
            ("header", header.as_str()),
        ],
    );
    call(client, &prompt, "compare").await
}

async fn call<C: ChatClient>(client: &C, prompt: &str, stage: &str) -> Result<String> {
    let response = client.invoke(prompt).await?;
    debug!(
        stage,
        model = client.model_id(),
        prompt_chars = prompt.len(),
        fragments = response.fragments.len(),
        tokens_in = response.tokens_in,
        tokens_out = response.tokens_out,
        latency_ms = response.latency_ms,
        "model call complete"
    );
    Ok(response.text())
}
