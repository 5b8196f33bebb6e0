//! Helpers for turning captured bytes into text the workflows can act on.

use crate::command::Execution;
use std::string::FromUtf8Error;

/// Lossy UTF-8 view of captured bytes.
pub(crate) fn decode(bytes: Option<&[u8]>) -> Option<String> {
    bytes.map(|raw| String::from_utf8_lossy(raw).into_owned())
}

/// Exact UTF-8 view of captured bytes, for text that is passed back to a tool.
pub(crate) fn decode_exact(bytes: Option<Vec<u8>>) -> Result<Option<String>, FromUtf8Error> {
    bytes.map(String::from_utf8).transpose()
}

/// Strip the trailing line terminator of a single-record answer.
pub(crate) fn single_line(text: String) -> String {
    match text.strip_suffix('\n') {
        Some(stripped) => stripped.strip_suffix('\r').unwrap_or(stripped).to_string(),
        None => text,
    }
}

/// Best diagnostic text for a failed run: the stderr capture if any, else the merged output.
pub(crate) fn diagnostic(execution: &Execution) -> String {
    let stderr = decode(execution.diagnostics.as_deref()).unwrap_or_default();
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    decode(execution.output.as_deref())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// True when the tool complained that the dataset it was pointed at is missing.
pub(crate) fn reports_missing_dataset(diagnostic: &str) -> bool {
    diagnostic
        .to_ascii_lowercase()
        .contains("dataset does not exist")
}

#[cfg(test)]
mod tests {
    use super::*;
    use zfsutil_core::ToolStatus;

    fn execution(output: Option<&str>, diagnostics: Option<&str>) -> Execution {
        Execution {
            output: output.map(|s| s.as_bytes().to_vec()),
            diagnostics: diagnostics.map(|s| s.as_bytes().to_vec()),
            status: ToolStatus::from_code(1),
        }
    }

    #[test]
    fn single_line_strips_one_terminator() {
        assert_eq!(single_line("rpool/ROOT/default\n".into()), "rpool/ROOT/default");
        assert_eq!(single_line("-\r\n".into()), "-");
        assert_eq!(single_line("a\nb\n".into()), "a\nb");
        assert_eq!(single_line("bare".into()), "bare");
    }

    #[test]
    fn diagnostic_prefers_stderr_capture() {
        let exec = execution(Some("partial\n"), Some("cannot open 'x': permission denied\n"));
        assert_eq!(diagnostic(&exec), "cannot open 'x': permission denied");

        let merged = execution(Some("cannot open 'x': dataset does not exist\n"), None);
        assert_eq!(diagnostic(&merged), "cannot open 'x': dataset does not exist");
        assert!(reports_missing_dataset(&diagnostic(&merged)));

        assert_eq!(diagnostic(&execution(None, Some("  \n"))), "");
    }

    #[test]
    fn decode_replaces_invalid_utf8() {
        assert_eq!(decode(Some(&[b'o', 0xff, b'k'])), Some("o\u{fffd}k".to_string()));
        assert_eq!(decode(None), None);
    }

    #[test]
    fn decode_exact_rejects_invalid_utf8() {
        assert_eq!(
            decode_exact(Some(b"tank/a\n".to_vec())),
            Ok(Some("tank/a\n".to_string()))
        );
        assert_eq!(decode_exact(None), Ok(None));
        assert!(decode_exact(Some(vec![b'o', 0xff, b'k'])).is_err());
    }

    #[test]
    fn missing_dataset_detection_ignores_other_failures() {
        assert!(reports_missing_dataset(
            "cannot open 'tank/gone': dataset does not exist"
        ));
        assert!(!reports_missing_dataset(
            "cannot destroy 'tank/busy': dataset is busy"
        ));
        assert!(!reports_missing_dataset("permission denied"));
    }
}
