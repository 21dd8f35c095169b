use anyhow::{Context, Result};

use crate::llm::client::truncate_chars;
use crate::llm::Generator;
use crate::models::{AnalysisPlan, Paper, PlanSection};

const PLAN_PAPER_LIMIT: usize = 10;
const PLAN_SUMMARY_CHARS: usize = 200;
const SECTION_SUMMARY_CHARS: usize = 300;

/// Produce a structured plan for the domain analysis from one generator
/// call. A response that fails to parse as the expected JSON degrades to a
/// fixed three-section plan; only a transport error fails the stage.
pub async fn create_plan(
    papers: &[Paper],
    query: &str,
    generator: &dyn Generator,
) -> Result<AnalysisPlan> {
    let papers_info: Vec<String> = papers
        .iter()
        .take(PLAN_PAPER_LIMIT)
        .enumerate()
        .map(|(i, p)| format!("{}. {} - {}", i + 1, p.title, brief(p, PLAN_SUMMARY_CHARS)))
        .collect();

    let prompt = format!(
        "Create a plan for a domain analysis based on these papers.\n\n\
         User query: {query}\n\n\
         Papers found:\n{}\n\n\
         Respond with ONLY a JSON object in this exact shape:\n\
         {{\n\
           \"title\": \"Analysis title\",\n\
           \"sections\": [\n\
             {{\n\
               \"title\": \"Section title\",\n\
               \"content_plan\": \"What the section covers\",\n\
               \"papers_refs\": [1, 2, 3]\n\
             }}\n\
           ],\n\
           \"conclusion_plan\": \"Plan for the conclusion\"\n\
         }}\n\
         papers_refs are 1-based paper numbers from the list above.",
        papers_info.join("\n")
    );

    let response = generator
        .complete(&prompt)
        .await
        .context("Analysis planning call failed")?;

    Ok(parse_plan(&response).unwrap_or_else(|| {
        tracing::warn!("Failed to parse analysis plan, using fallback plan");
        fallback_plan(query, papers.len())
    }))
}

fn parse_plan(content: &str) -> Option<AnalysisPlan> {
    let json_str = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };
    serde_json::from_str(json_str).ok()
}

/// The plan used when the model's output is unusable: a generic
/// introduction / approaches / results outline over the available papers.
fn fallback_plan(query: &str, paper_count: usize) -> AnalysisPlan {
    let refs_up_to = |n: usize| -> Vec<usize> { (1..=n.min(paper_count)).collect() };

    AnalysisPlan {
        title: format!("Domain analysis: {query}"),
        sections: vec![
            PlanSection {
                title: "Introduction".to_string(),
                content_plan: "General overview of the topic".to_string(),
                papers_refs: refs_up_to(3),
            },
            PlanSection {
                title: "Main approaches".to_string(),
                content_plan: "Description of methods and approaches".to_string(),
                papers_refs: refs_up_to(6),
            },
            PlanSection {
                title: "Results and applications".to_string(),
                content_plan: "Practical results".to_string(),
                papers_refs: refs_up_to(5),
            },
        ],
        conclusion_plan: "Conclusions and perspectives".to_string(),
    }
}

/// Write the full analysis text from the plan: one generator call per
/// section plus one for the conclusion, assembled as markdown.
pub async fn write_analysis(
    plan: &AnalysisPlan,
    papers: &[Paper],
    generator: &dyn Generator,
) -> Result<String> {
    let mut parts = vec![format!("# {}\n\n", plan.title)];

    for section in &plan.sections {
        let section_papers: Vec<&Paper> = section
            .papers_refs
            .iter()
            .filter(|&&r| r >= 1 && r <= papers.len())
            .map(|&r| &papers[r - 1])
            .collect();

        let papers_context: Vec<String> = section_papers
            .iter()
            .map(|p| format!("- {}: {}", p.title, brief(p, SECTION_SUMMARY_CHARS)))
            .collect();

        let prompt = format!(
            "Write one section of a scientific domain analysis.\n\n\
             Section title: {}\n\
             Section plan: {}\n\n\
             Use the information from these papers:\n{}\n\n\
             Write coherent prose of 200-300 words.",
            section.title,
            section.content_plan,
            papers_context.join("\n")
        );

        let text = generator
            .complete(&prompt)
            .await
            .with_context(|| format!("Analysis section '{}' failed", section.title))?;
        parts.push(format!("## {}\n\n{}\n\n", section.title, text));
    }

    let conclusion_prompt = format!(
        "Write the conclusion of a domain analysis.\n\n\
         Conclusion plan: {}\n\n\
         Briefly summarize the main findings in 100-150 words.",
        plan.conclusion_plan
    );
    let conclusion = generator
        .complete(&conclusion_prompt)
        .await
        .context("Analysis conclusion failed")?;
    parts.push(format!("## Conclusion\n\n{conclusion}\n\n"));

    Ok(parts.concat())
}

/// The paper's generated summary when present, else an abstract prefix.
fn brief(paper: &Paper, max_chars: usize) -> &str {
    paper
        .summary
        .as_deref()
        .unwrap_or_else(|| truncate_chars(&paper.abstract_text, max_chars))
}
