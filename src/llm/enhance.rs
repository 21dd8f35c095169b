use anyhow::Result;

use crate::llm::Generator;
use crate::models::EnhancedQuery;

/// Expand a user query into enhanced search variants, arXiv query strings,
/// and keywords using one generator call.
///
/// A transport error from the generator propagates to the caller. A response
/// that fails to parse as the expected JSON object degrades to
/// [`EnhancedQuery::fallback`] — the original query stands in for every
/// variant. Parsing never fails the run.
pub async fn enhance_query(generator: &dyn Generator, query: &str) -> Result<EnhancedQuery> {
    let prompt = format!(
        "You are an expert in scientific literature search. Improve and expand \
         the following search query.\n\n\
         Original query: \"{query}\"\n\n\
         Generate 3-5 enhanced query variants for finding research papers on \
         arXiv. Include synonyms and closely related technical terms.\n\n\
         Respond with ONLY a JSON object in this exact shape:\n\
         {{\n\
           \"enhanced_queries\": [\"variant 1\", \"variant 2\"],\n\
           \"arxiv_queries\": [\"query 1\", \"query 2\"],\n\
           \"keywords\": [\"keyword1\", \"keyword2\"]\n\
         }}"
    );

    let response = generator.complete(&prompt).await?;
    Ok(parse_enhancement(&response, query))
}

/// Parse the model's response, falling back to the degenerate enhancement
/// when no well-formed JSON object can be extracted.
fn parse_enhancement(content: &str, query: &str) -> EnhancedQuery {
    // Extract the outermost JSON object from the response; models often wrap
    // it in prose or a markdown fence.
    let json_str = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };

    match serde_json::from_str::<EnhancedQuery>(json_str) {
        Ok(enhanced) if !enhanced.arxiv_queries.is_empty() => enhanced,
        Ok(_) => {
            tracing::warn!("Query enhancement returned no arXiv queries, using fallback");
            EnhancedQuery::fallback(query)
        }
        Err(e) => {
            tracing::warn!("Failed to parse query enhancement: {e}. Raw: {content}");
            EnhancedQuery::fallback(query)
        }
    }
}
