//! Feedback classification.
//!
//! The delivery channel surfaces free-text notices (modal dialogs, toasts)
//! after each submission. Classification is substring matching over
//! whitespace-normalized text against fixed phrase tables, behind a trait so
//! the tables can be swapped or the whole strategy replaced by a structured
//! adapter if the service ever exposes one.

/// Ternary verdict for one submission's feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
    /// No recognizable signal observed. The dispatch loop treats this as a
    /// failure rather than guessing at success.
    Undetermined,
}

/// Strategy interface over `feedback texts -> Verdict`.
pub trait FeedbackClassifier: Send + Sync {
    fn classify(&self, texts: &[String]) -> Verdict;
}

/// Confirmation phrases observed on the destination service.
const SUCCESS_PHRASES: &[&str] = &[
    "전송되었습니다",
    "쪽지가 전송",
    "메시지가 전송",
    "성공적으로 전송",
    "완료",
];

/// Rejection phrases: blocked, rate-limited, recipient refuses messages,
/// no permission.
const FAILURE_PHRASES: &[&str] = &[
    "차단",
    "제한",
    "수신 거부",
    "쪽지를 받지",
    "보낼 수 없습니다",
    "권한이 없습니다",
];

/// Phrase-table classifier.
///
/// Success phrases take priority and short-circuit: a notice that contains
/// both a success and a failure phrase is a success. This ordering is a
/// deliberate tie-break, not incidental.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    success: Vec<String>,
    failure: Vec<String>,
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self {
            success: SUCCESS_PHRASES.iter().map(|s| s.to_string()).collect(),
            failure: FAILURE_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PhraseClassifier {
    /// Classifier with custom phrase tables.
    pub fn new(success: Vec<String>, failure: Vec<String>) -> Self {
        Self { success, failure }
    }
}

impl FeedbackClassifier for PhraseClassifier {
    fn classify(&self, texts: &[String]) -> Verdict {
        for text in texts {
            let normalized = normalize_whitespace(text);
            if self.success.iter().any(|p| normalized.contains(p.as_str())) {
                return Verdict::Success;
            }
        }

        for text in texts {
            let normalized = normalize_whitespace(text);
            if self.failure.iter().any(|p| normalized.contains(p.as_str())) {
                return Verdict::Failure;
            }
        }

        Verdict::Undetermined
    }
}

/// Collapse runs of whitespace (including newlines) to single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
