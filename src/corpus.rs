//! Reading a harvested corpus back into documents
//!
//! The parser accepts the block layout written by
//! [`CorpusWriter`](crate::formatter::CorpusWriter), including the lone blank
//! lines left by skipped messages. Everything after `.M` up to the next `.I`
//! line is body text, with surrounding blank lines trimmed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::BufRead;

use crate::error::{CorpusError, Result};
use crate::models::CategoryCode;

/// One document parsed from a corpus file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusDocument {
    pub sequence_id: u64,
    pub categories: Vec<CategoryCode>,
    pub date: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

/// Parse every document in a corpus stream
pub fn read_corpus<R: BufRead>(reader: R) -> Result<Vec<CorpusDocument>> {
    let mut documents = Vec::new();
    let mut current: Option<CorpusDocument> = None;
    let mut in_body = false;
    let mut body_lines: Vec<String> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;

        if let Some(id) = line.strip_prefix(".I ") {
            let parsed = id.trim().parse::<u64>();
            // Inside a body only a well-formed `.I <id>` starts the next record
            if in_body && parsed.is_err() {
                body_lines.push(line);
                continue;
            }
            let sequence_id = parsed.map_err(|_| {
                CorpusError::CorpusFormat(format!("line {}: invalid sequence id '{}'", line_no, id))
            })?;
            if let Some(mut doc) = current.take() {
                doc.body = join_body(&body_lines);
                documents.push(doc);
            }
            current = Some(CorpusDocument {
                sequence_id,
                ..Default::default()
            });
            in_body = false;
            body_lines.clear();
            continue;
        }

        let doc = match current.as_mut() {
            Some(doc) => doc,
            None if line.trim().is_empty() => continue,
            None => {
                return Err(CorpusError::CorpusFormat(format!(
                    "line {}: content before the first .I line",
                    line_no
                )))
            }
        };

        if in_body {
            body_lines.push(line);
            continue;
        }

        if line == ".M" {
            in_body = true;
        } else if let Some(code) = line.strip_prefix(".L ") {
            let category = code
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(CategoryCode::from_code)
                .ok_or_else(|| {
                    CorpusError::CorpusFormat(format!("line {}: unknown category '{}'", line_no, code))
                })?;
            doc.categories.push(category);
        } else if let Some(date) = line.strip_prefix(".D ") {
            doc.date = Some(date.to_string());
        } else if let Some(from) = line.strip_prefix(".F ") {
            doc.from = Some(from.to_string());
        } else if let Some(subject) = line.strip_prefix(".S ") {
            doc.subject = Some(subject.to_string());
        } else if !line.trim().is_empty() {
            return Err(CorpusError::CorpusFormat(format!(
                "line {}: unexpected line before .M",
                line_no
            )));
        }
    }

    if let Some(mut doc) = current {
        doc.body = join_body(&body_lines);
        documents.push(doc);
    }

    Ok(documents)
}

fn join_body(lines: &[String]) -> String {
    lines.join("\n").trim_matches('\n').to_string()
}

/// Per-category document counts for a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub documents: usize,
    /// Documents without any `.L` line
    pub unlabeled: usize,
    pub per_category: BTreeMap<String, usize>,
    pub first_sequence_id: Option<u64>,
    pub last_sequence_id: Option<u64>,
}

impl CorpusStats {
    pub fn from_documents(documents: &[CorpusDocument]) -> Self {
        let mut stats = CorpusStats {
            documents: documents.len(),
            first_sequence_id: documents.first().map(|d| d.sequence_id),
            last_sequence_id: documents.last().map(|d| d.sequence_id),
            ..Default::default()
        };

        for category in CategoryCode::ALL {
            stats.per_category.insert(category.name().to_string(), 0);
        }

        for doc in documents {
            if doc.categories.is_empty() {
                stats.unlabeled += 1;
            }
            for category in &doc.categories {
                *stats.per_category.entry(category.name().to_string()).or_insert(0) += 1;
            }
        }

        stats
    }
}
