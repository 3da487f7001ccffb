//! Response classification.
//!
//! Providers disagree on wording, casing, accents, and namespaces, so the
//! rule is kept here as data plus one function:
//!
//! 1. If a numeric `cStat` is present, the endpoint is available iff it
//!    equals [`IN_OPERATION_CODE`].
//! 2. Otherwise, if `xMotivo` is present, the endpoint is available iff the
//!    folded text contains one of [`AVAILABLE_KEYWORDS`].
//! 3. Otherwise the reply is unrecognized and unavailable.

use tracing::debug;

/// Bumped whenever the rule or the keyword table changes.
pub const CLASSIFIER_VERSION: u32 = 1;

/// `cStat` meaning "Servico em Operacao".
pub const IN_OPERATION_CODE: &str = "107";

/// Keywords (lower-case, accents folded) that mark a reason text as available.
pub const AVAILABLE_KEYWORDS: &[&str] = &["disponivel", "em operacao", "available", "operational"];

const STATUS_CODE_ELEMENT: &str = "cStat";
const REASON_ELEMENT: &str = "xMotivo";

pub const UNRECOGNIZED: &str = "unrecognized response";

/// Fields extracted from a reply and the verdict derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub available: bool,
    pub reason_code: Option<String>,
    pub reason_text: String,
    /// False when neither field was found.
    pub recognized: bool,
}

impl Classification {
    /// Apply the rule to already extracted fields.
    pub fn from_fields(reason_code: Option<String>, reason_text: Option<String>) -> Self {
        let reason_code = reason_code.filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()));

        match (reason_code, reason_text) {
            (Some(code), text) => Self {
                available: code == IN_OPERATION_CODE,
                reason_text: text.unwrap_or_else(|| format!("status code {code}")),
                reason_code: Some(code),
                recognized: true,
            },
            (None, Some(text)) => Self {
                available: mentions_available(&text),
                reason_code: None,
                reason_text: text,
                recognized: true,
            },
            (None, None) => Self::unrecognized(UNRECOGNIZED.to_string()),
        }
    }

    fn unrecognized(reason_text: String) -> Self {
        Self {
            available: false,
            reason_code: None,
            reason_text,
            recognized: false,
        }
    }
}

/// Classify a raw response body.
pub fn classify(body: &[u8]) -> Classification {
    let text = String::from_utf8_lossy(body);
    let doc = match roxmltree::Document::parse(&text) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, "status reply is not a well-formed document");
            return Classification::unrecognized(format!("{UNRECOGNIZED}: {e}"));
        }
    };

    Classification::from_fields(
        element_text(&doc, STATUS_CODE_ELEMENT),
        element_text(&doc, REASON_ELEMENT),
    )
}

/// Text of the first element with the given local name, in any namespace.
fn element_text(doc: &roxmltree::Document<'_>, local_name: &str) -> Option<String> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == local_name)
        .find_map(|n| n.text().map(str::trim).filter(|t| !t.is_empty()))
        .map(str::to_string)
}

fn mentions_available(reason: &str) -> bool {
    let folded = fold(reason);
    AVAILABLE_KEYWORDS.iter().any(|k| folded.contains(k))
}

/// Lower-case and strip the Portuguese diacritics providers use inconsistently.
fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
