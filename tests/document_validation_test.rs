//! Integration tests for CPF/CNPJ validation and masking
//!
//! These tests exercise the public document API the way the login screen
//! uses it: raw user input in, verdict or masked text out.

use credit_chat::document::{
    format_document, strip_non_digits, validate_cnpj, validate_cpf, validate_document, Document,
    DocumentKind,
};
use credit_chat::AppError;

#[test]
fn test_repeated_digits_are_rejected() {
    for d in '0'..='9' {
        let cpf: String = std::iter::repeat(d).take(11).collect();
        let cnpj: String = std::iter::repeat(d).take(14).collect();
        assert!(!validate_cpf(&cpf), "Repeated CPF accepted: {}", cpf);
        assert!(!validate_cnpj(&cnpj), "Repeated CNPJ accepted: {}", cnpj);
    }
}

#[test]
fn test_known_documents() {
    assert!(validate_cpf("52998224725"));
    assert!(!validate_cpf("52998224724"));
    assert!(validate_cnpj("11222333000181"));
    assert!(!validate_cnpj("11222333000182"));
}

#[test]
fn test_cnpj_single_digit_mutations_fail() {
    let valid = "11222333000181";
    for i in 0..valid.len() {
        let mut digits: Vec<u32> = valid.chars().filter_map(|c| c.to_digit(10)).collect();
        digits[i] = (digits[i] + 1) % 10;
        let mutated: String = digits.iter().map(|d| d.to_string()).collect();
        assert!(!validate_cnpj(&mutated), "Mutation at {} accepted: {}", i, mutated);
    }
}

#[test]
fn test_wrong_lengths_are_rejected() {
    assert!(!validate_cpf(""));
    assert!(!validate_cpf("5299822472"));
    assert!(!validate_cpf("529982247250"));
    assert!(!validate_cnpj("1122233300018"));
    assert!(!validate_cnpj("112223330001810"));
    // A valid CPF is not a valid CNPJ and vice versa
    assert!(!validate_document("52998224725", DocumentKind::Cnpj));
    assert!(!validate_document("11222333000181", DocumentKind::Cpf));
}

#[test]
fn test_canonical_masks() {
    assert_eq!(format_document("12345678901", DocumentKind::Cpf), "123.456.789-01");
    assert_eq!(
        format_document("11222333000181", DocumentKind::Cnpj),
        "11.222.333/0001-81"
    );
}

#[test]
fn test_partial_masks() {
    let cpf_steps = vec![
        ("", ""),
        ("1", "1"),
        ("123", "123"),
        ("1234", "123.4"),
        ("1234567", "123.456.7"),
        ("1234567890", "123.456.789-0"),
    ];
    for (input, expected) in cpf_steps {
        assert_eq!(format_document(input, DocumentKind::Cpf), expected, "CPF input {}", input);
    }

    let cnpj_steps = vec![
        ("11", "11"),
        ("112", "11.2"),
        ("112223", "11.222.3"),
        ("112223330", "11.222.333/0"),
        ("1122233300018", "11.222.333/0001-8"),
    ];
    for (input, expected) in cnpj_steps {
        assert_eq!(format_document(input, DocumentKind::Cnpj), expected, "CNPJ input {}", input);
    }
}

#[test]
fn test_mask_is_idempotent_and_bounded() {
    let inputs = vec![
        "",
        "5",
        "529.982",
        "52998224725",
        "529982247251234",
        "11.222.333/0001-81",
        "11222333000181999999",
        "abc 123 def 456 ghi 789 jkl 012 mno 345",
    ];

    for input in inputs {
        for kind in [DocumentKind::Cpf, DocumentKind::Cnpj] {
            let once = format_document(input, kind);
            let twice = format_document(&strip_non_digits(&once), kind);
            assert_eq!(once, twice, "Not idempotent for {:?} {}", kind, input);
            assert!(
                once.len() <= kind.formatted_len(),
                "Mask too long for {:?} {}: {}",
                kind,
                input,
                once
            );
        }
    }
}

#[test]
fn test_non_digits_are_ignored_everywhere() {
    let noisy_cpf = "cpf: 529 982-247/25 !";
    assert!(validate_cpf(noisy_cpf));
    assert_eq!(format_document(noisy_cpf, DocumentKind::Cpf), "529.982.247-25");

    let noisy_cnpj = "x11y222z333 0001#81";
    assert!(validate_cnpj(noisy_cnpj));
    assert_eq!(
        format_document(noisy_cnpj, DocumentKind::Cnpj),
        "11.222.333/0001-81"
    );
}

#[test]
fn test_document_parse() {
    let doc = Document::parse("529.982.247-25", DocumentKind::Cpf).unwrap();
    assert_eq!(doc.digits(), "52998224725");
    assert_eq!(doc.formatted(), "529.982.247-25");
    assert_eq!(doc.to_string(), "CPF 529.982.247-25");

    let err = Document::parse("52998224724", DocumentKind::Cpf).unwrap_err();
    assert!(matches!(err, AppError::InvalidDocument(DocumentKind::Cpf)));
    assert_eq!(err.to_string(), "Invalid CPF");
}
