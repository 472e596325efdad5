//! Corpus record formatting
//!
//! Each record is a block of prefixed lines:
//!
//! ```text
//! .I <sequence id>
//! .L <category code>      one per category
//! .D <date>               only if present
//! .F <from>               only if present
//! .S <subject>            only if present
//! .M
//! <body>
//! <blank line>
//! ```

use std::io::{self, Write};

use crate::models::OutputRecord;

/// Render a record as its output lines, trailing blank line included
pub fn format_record(record: &OutputRecord) -> Vec<String> {
    let mut lines = Vec::with_capacity(record.categories.len() + 7);

    lines.push(format!(".I {}", record.sequence_id));
    lines.extend(record.categories.iter().map(|c| format!(".L {}", c)));

    let headers = &record.headers;
    for (marker, value) in [(".D", &headers.date), (".F", &headers.from), (".S", &headers.subject)] {
        if let Some(value) = value {
            lines.push(format!("{} {}", marker, value));
        }
    }

    lines.push(".M".to_string());
    lines.push(record.body.clone());
    lines.push(String::new());
    lines
}

/// Streams corpus blocks to an output, flushing after each one
pub struct CorpusWriter<W: Write> {
    inner: W,
    separator_for_skipped: bool,
    records_written: usize,
}

impl<W: Write> CorpusWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            separator_for_skipped: true,
            records_written: 0,
        }
    }

    /// Whether skipped messages still leave a blank separator line
    pub fn with_separator_for_skipped(mut self, enabled: bool) -> Self {
        self.separator_for_skipped = enabled;
        self
    }

    pub fn write_record(&mut self, record: &OutputRecord) -> io::Result<()> {
        for line in format_record(record) {
            writeln!(self.inner, "{}", line)?;
        }
        self.inner.flush()?;
        self.records_written += 1;
        Ok(())
    }

    /// Emit the lone blank line left by a message that produced no record
    pub fn write_skip_separator(&mut self) -> io::Result<()> {
        if self.separator_for_skipped {
            writeln!(self.inner)?;
            self.inner.flush()?;
        }
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
