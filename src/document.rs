//! Citation and final-document formatting in the GOST bibliographic style.

use chrono::{Datelike, Utc};

use crate::models::Paper;

/// Format one paper as a GOST-style citation line.
pub fn format_citation(paper: &Paper) -> String {
    let authors = if paper.authors.len() > 3 {
        format!("{} et al.", paper.authors[0])
    } else {
        paper.authors.join(", ")
    };

    let title = paper.title.replace('\n', " ");

    let year = paper
        .published
        .map(|d| d.year())
        .unwrap_or_else(|| Utc::now().year());

    let journal = paper.journal_ref.as_deref().unwrap_or("arXiv preprint");

    let mut citation = format!("{authors} {title} // {journal}. — {year}.");

    if let Some(doi) = &paper.doi {
        citation.push_str(&format!(" — DOI: {doi}."));
    }
    if let Some(url) = &paper.pdf_url {
        citation.push_str(&format!(" — URL: {url}"));
    }

    citation
}

/// Numbered bibliography over all papers.
pub fn format_bibliography(papers: &[Paper]) -> String {
    let mut bibliography = String::from("## References\n\n");

    for (i, paper) in papers.iter().enumerate() {
        bibliography.push_str(&format!("{}. {}\n\n", i + 1, format_citation(paper)));
    }

    bibliography
}

/// Assemble the final document: metadata header, analysis body,
/// bibliography.
pub fn format_document(analysis: &str, papers: &[Paper]) -> String {
    let metadata = format!(
        "---\nCreated: {}\nSources: {}\n---\n",
        Utc::now().format("%Y-%m-%d"),
        papers.len()
    );

    format!("{metadata}\n\n{analysis}\n\n{}", format_bibliography(papers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, title: &str, authors: &[&str]) -> Paper {
        let mut p = Paper::new(id, title, "abstract");
        p.authors = authors.iter().map(|a| a.to_string()).collect();
        p
    }

    #[test]
    fn test_citation_few_authors_listed_in_full() {
        let mut p = paper("a", "A Study", &["Smith A.", "Jones B."]);
        p.published = Some("2023-06-01T00:00:00Z".parse().unwrap());
        let citation = format_citation(&p);
        assert!(citation.starts_with("Smith A., Jones B. A Study // arXiv preprint. — 2023."));
    }

    #[test]
    fn test_citation_many_authors_abbreviated() {
        let p = paper("a", "T", &["First A.", "Second B.", "Third C.", "Fourth D."]);
        let citation = format_citation(&p);
        assert!(citation.starts_with("First A. et al."));
        assert!(!citation.contains("Second B."));
    }

    #[test]
    fn test_citation_includes_doi_and_url() {
        let mut p = paper("a", "T", &["A."]);
        p.doi = Some("10.1/x".to_string());
        p.pdf_url = Some("http://arxiv.org/pdf/1".to_string());
        let citation = format_citation(&p);
        assert!(citation.contains("DOI: 10.1/x."));
        assert!(citation.contains("URL: http://arxiv.org/pdf/1"));
    }

    #[test]
    fn test_citation_journal_ref_replaces_default() {
        let mut p = paper("a", "T", &["A."]);
        p.journal_ref = Some("Nature 123".to_string());
        assert!(format_citation(&p).contains("// Nature 123."));
    }

    #[test]
    fn test_citation_flattens_title_newlines() {
        let p = paper("a", "Line one\nline two", &["A."]);
        assert!(format_citation(&p).contains("Line one line two"));
    }

    #[test]
    fn test_bibliography_numbering() {
        let papers = vec![paper("a", "One", &["A."]), paper("b", "Two", &["B."])];
        let bib = format_bibliography(&papers);
        assert!(bib.starts_with("## References\n\n"));
        assert!(bib.contains("1. A. One"));
        assert!(bib.contains("2. B. Two"));
    }

    #[test]
    fn test_document_assembly() {
        let papers = vec![paper("a", "One", &["A."])];
        let doc = format_document("# Analysis\n\nBody.", &papers);
        assert!(doc.starts_with("---\nCreated: "));
        assert!(doc.contains("Sources: 1\n"));
        assert!(doc.contains("# Analysis"));
        assert!(doc.contains("## References"));
    }

    #[test]
    fn test_document_with_no_papers() {
        let doc = format_document("# Empty", &[]);
        assert!(doc.contains("Sources: 0"));
        assert!(doc.contains("## References"));
    }
}
