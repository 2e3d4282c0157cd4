//! Disclosure guardrail tests.

use llm_phraser::guardrail::{is_clean, scan, DISCLOSURE_TERMS};

#[test]
fn scan_matches_each_term_case_insensitively() {
    for term in DISCLOSURE_TERMS {
        let text = format!("Well, {} is what it is.", term.to_uppercase());
        let hits = scan(&text);
        assert_eq!(hits.len(), 1, "expected one hit for {term}");
        assert_eq!(hits[0].term, *term);
    }
}

#[test]
fn scan_reports_every_distinct_term() {
    let hits = scan("Our margin is thin and the floor price is firm.");
    let terms: Vec<&str> = hits.iter().map(|h| h.term).collect();
    assert_eq!(terms, ["floor price", "our margin"]);
}

#[test]
fn ordinary_negotiation_text_is_clean() {
    for text in [
        "We can't meet you there, but my best price is $48,000.",
        "That's our final offer.",
        "I can't accept that, it's too far from our valuation.",
        "",
    ] {
        assert!(is_clean(text), "should be clean: {text}");
    }
}

#[test]
fn terms_only_match_whole_words() {
    for text in [
        "At $48,000 this keeps your costs down and your margin healthy.",
        "Shipping is at economy cost.",
        "The subfloor prices are listed separately.",
    ] {
        assert!(is_clean(text), "should be clean: {text}");
    }

    let terms = |text: &str| scan(text).into_iter().map(|h| h.term).collect::<Vec<_>>();
    assert_eq!(terms("That is my cost."), ["my cost"]);
    assert_eq!(terms("Those are my costs, honestly."), ["my cost"]);
    assert_eq!(terms("Below our\nmargin."), ["our margin"]);
}
