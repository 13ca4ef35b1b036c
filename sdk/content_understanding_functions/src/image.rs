//! Image people analysis.
//!
//! Runs the prebuilt image analyzer on an image URL and estimates how many
//! people its description mentions. See
//! [`count_people`](content_understanding_analyzers::people::count_people) for
//! how approximate that estimate is.

use content_understanding_analyzers::analyzer::{self, AnalysisRequest, PollOptions};
use content_understanding_analyzers::models::PREBUILT_IMAGE_ANALYZER;
use content_understanding_analyzers::people::{count_people, describe_image};
use content_understanding_core::client::ContentUnderstandingClient;
use content_understanding_core::error::ContentUnderstandingResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// People estimate for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleAnalysis {
    /// Estimated number of people; 0 when nothing was recognized.
    pub people_count: u32,
    /// Description the estimate was derived from.
    pub description: Option<String>,
    /// The terminal analysis payload.
    pub full_results: Value,
}

/// Analyzes the image at `image_url` and estimates the people in it.
///
/// # Errors
///
/// Propagates submission, polling, and analysis failures. An image with no
/// description is not an error; it yields a count of 0.
///
/// # Tracing
///
/// Emits a span named `content_understanding::functions::analyze_image_for_people`.
#[tracing::instrument(
    name = "content_understanding::functions::analyze_image_for_people",
    skip(client, options)
)]
pub async fn analyze_image_for_people(
    client: &ContentUnderstandingClient,
    image_url: &str,
    options: &PollOptions,
) -> ContentUnderstandingResult<PeopleAnalysis> {
    let request = AnalysisRequest::builder()
        .analyzer_id(PREBUILT_IMAGE_ANALYZER)
        .url(image_url)
        .build()?;

    let result = analyzer::analyze(client, &request, options).await?;
    let description = describe_image(&result);
    let people_count = description.as_deref().map(count_people).unwrap_or(0);

    tracing::info!(people_count, polls = result.polls, "image analyzed");

    Ok(PeopleAnalysis {
        people_count,
        description,
        full_results: result.into_payload(),
    })
}
