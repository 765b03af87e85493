//! Brazilian document identifiers (CPF / CNPJ)
//!
//! Check-digit validation and the punctuation mask applied while the user
//! types. Everything here works on ASCII digits only: any other character
//! is discarded before arithmetic or formatting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const CPF_FIRST_WEIGHTS: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_SECOND_WEIGHTS: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Separator inserted before the digit at the given index
const CPF_MASK: [(usize, char); 3] = [(3, '.'), (6, '.'), (9, '-')];
const CNPJ_MASK: [(usize, char); 4] = [(2, '.'), (5, '.'), (8, '/'), (12, '-')];

/// Which taxpayer registry a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Individual taxpayer, 11 digits
    Cpf,
    /// Company taxpayer, 14 digits
    Cnpj,
}

impl DocumentKind {
    /// Number of digits in a complete document, check digits included
    pub fn digit_count(self) -> usize {
        match self {
            DocumentKind::Cpf => 11,
            DocumentKind::Cnpj => 14,
        }
    }

    /// Length of the fully punctuated form
    pub fn formatted_len(self) -> usize {
        self.digit_count() + self.mask().len()
    }

    /// Lowercase key used for persistence
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Cpf => "cpf",
            DocumentKind::Cnpj => "cnpj",
        }
    }

    fn weights(self) -> (&'static [u32], &'static [u32]) {
        match self {
            DocumentKind::Cpf => (&CPF_FIRST_WEIGHTS, &CPF_SECOND_WEIGHTS),
            DocumentKind::Cnpj => (&CNPJ_FIRST_WEIGHTS, &CNPJ_SECOND_WEIGHTS),
        }
    }

    fn mask(self) -> &'static [(usize, char)] {
        match self {
            DocumentKind::Cpf => &CPF_MASK,
            DocumentKind::Cnpj => &CNPJ_MASK,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Cpf => write!(f, "CPF"),
            DocumentKind::Cnpj => write!(f, "CNPJ"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpf" => Ok(DocumentKind::Cpf),
            "cnpj" => Ok(DocumentKind::Cnpj),
            other => Err(AppError::InvalidCommand(format!(
                "unknown document type '{}' (expected cpf or cnpj)",
                other
            ))),
        }
    }
}

/// Remove every character that is not an ASCII digit
pub fn strip_non_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Validate a CPF, ignoring punctuation and any other non-digit
pub fn validate_cpf(raw: &str) -> bool {
    validate_document(raw, DocumentKind::Cpf)
}

/// Validate a CNPJ, ignoring punctuation and any other non-digit
pub fn validate_cnpj(raw: &str) -> bool {
    validate_document(raw, DocumentKind::Cnpj)
}

/// Validate `raw` as a document of the given kind
///
/// Returns false for wrong length, uniform repeated digits (e.g.
/// `00000000000`), or a check-digit mismatch.
pub fn validate_document(raw: &str, kind: DocumentKind) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    let n = kind.digit_count();

    // to_digit(10) accepts only ASCII 0-9, same set as strip_non_digits
    if digits.len() != n || digits.windows(2).all(|w| w[0] == w[1]) {
        return false;
    }

    let (first, second) = kind.weights();
    check_digit(&digits[..n - 2], first) == digits[n - 2]
        && check_digit(&digits[..n - 1], second) == digits[n - 1]
}

/// Weighted sum modulo 11: remainder below 2 maps to 0, otherwise 11 - r
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

/// Apply the document mask to whatever digits `raw` contains
///
/// Digits beyond the kind's length are dropped, so the output never
/// exceeds 14 (CPF) or 18 (CNPJ) characters. No validation happens here;
/// partial input yields a partial mask.
pub fn format_document(raw: &str, kind: DocumentKind) -> String {
    let mask = kind.mask();
    let mut out = String::with_capacity(kind.formatted_len());

    for (i, c) in raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(kind.digit_count())
        .enumerate()
    {
        if let Some(&(_, sep)) = mask.iter().find(|(pos, _)| *pos == i) {
            out.push(sep);
        }
        out.push(c);
    }

    out
}

/// A document that passed check-digit validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    kind: DocumentKind,
    digits: String,
}

impl Document {
    /// Parse and validate user input
    pub fn parse(raw: &str, kind: DocumentKind) -> Result<Self, AppError> {
        if !validate_document(raw, kind) {
            return Err(AppError::InvalidDocument(kind));
        }
        Ok(Self {
            kind,
            digits: strip_non_digits(raw),
        })
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Clean digit string
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Punctuated form, e.g. `529.982.247-25`
    pub fn formatted(&self) -> String {
        format_document(&self.digits, self.kind)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.formatted())
    }
}
