//! Run report -> typed outcome.
//!
//! Priority: non-zero exit, then timeout, then unparseable output, else success.
//! An empty page list is a valid success; callers decide whether that means "not found".

use crate::runner::{RunExit, RunReport};
use crawlpipe_core::{Error, Execution, ExecutionOutcome, PageRecord, Result};

pub fn interpret(report: RunReport) -> ExecutionOutcome {
    match report.exit {
        RunExit::Exited { code: Some(0) } => {}
        RunExit::Exited { .. } => {
            let message = if report.diagnostics.is_empty() {
                "unknown error".to_string()
            } else {
                report.diagnostics
            };
            return Err(Error::Executor(message));
        }
        RunExit::TimedOut(budget) => return Err(Error::Timeout(budget)),
    }
    let pages = parse_pages(&report.contents)?;
    Ok(Execution {
        pages,
        elapsed: report.elapsed,
    })
}

/// Parse the crawler's JSON array. A literal `null` is read as "no pages".
pub fn parse_pages(bytes: &[u8]) -> Result<Vec<PageRecord>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedOutput(format!("output is not UTF-8: {e}")))?
        .trim();
    if text.is_empty() {
        return Err(Error::MalformedOutput("crawler wrote no output".to_string()));
    }
    let pages: Option<Vec<PageRecord>> =
        serde_json::from_str(text).map_err(|e| Error::MalformedOutput(e.to_string()))?;
    Ok(pages.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawlpipe_core::ErrorKind;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report(exit: RunExit, diagnostics: &str, contents: &str) -> RunReport {
        RunReport {
            exit,
            diagnostics: diagnostics.to_string(),
            contents: contents.as_bytes().to_vec(),
            elapsed: Duration::from_millis(42),
            channel: PathBuf::from("/tmp/crawlpipe-test.json"),
        }
    }

    const OK: RunExit = RunExit::Exited { code: Some(0) };

    #[test]
    fn nonzero_exit_carries_diagnostic_text() {
        let err = interpret(report(
            RunExit::Exited { code: Some(1) },
            "connection refused",
            "",
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Executor);
        assert_eq!(err.message(), "connection refused");
    }

    #[test]
    fn nonzero_exit_without_diagnostics_is_unknown_error() {
        let err = interpret(report(RunExit::Exited { code: None }, "", "[]")).unwrap_err();
        assert_eq!(err.message(), "unknown error");
    }

    #[test]
    fn timeout_reports_the_budget() {
        let err = interpret(report(
            RunExit::TimedOut(Duration::from_secs(230)),
            "",
            "",
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "execution exceeded 230s");
    }

    #[test]
    fn empty_array_is_success_with_zero_pages() {
        let ex = interpret(report(OK, "", "[]\n")).expect("success");
        assert!(ex.pages.is_empty());
        assert_eq!(ex.elapsed, Duration::from_millis(42));
    }

    #[test]
    fn null_is_read_as_no_pages() {
        let ex = interpret(report(OK, "", "null")).expect("success");
        assert!(ex.pages.is_empty());
    }

    #[test]
    fn malformed_output_never_panics() {
        for bad in ["", "   ", "not json", "{\"url\":1}", "[{\"title\":\"no url\"}]", "[1,2"] {
            let err = interpret(report(OK, "", bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedOutput, "{bad:?}");
        }
        let err = interpret(RunReport {
            contents: vec![0xff, 0xfe],
            ..report(OK, "", "")
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    }

    #[test]
    fn diagnostics_on_success_are_ignored() {
        let ex = interpret(report(
            OK,
            "warning: robots.txt unreachable",
            r#"[{"url":"https://e.com","title":"E","description":"","crawled_at":"2024-01-01T00:00:00Z","depth":0}]"#,
        ))
        .expect("success");
        assert_eq!(ex.pages.len(), 1);
        assert_eq!(ex.pages[0].title, "E");
        assert_eq!(ex.pages[0].content, None);
    }
}
