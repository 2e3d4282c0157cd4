//! Template catalog lookup and validation tests.

use std::collections::BTreeMap;

use llm_phraser::catalog::{keys, Catalog, CatalogError, DecisionKey, FALLBACK_KEY};
use llm_phraser::prompt::PromptMode;

const MODES: [PromptMode; 2] = [PromptMode::Paraphrase, PromptMode::Instruction];

#[test]
fn builtin_catalogs_pass_validation() {
    for mode in MODES {
        let catalog = Catalog::builtin(mode);
        assert!(
            catalog.validate().is_ok(),
            "builtin {mode} catalog should validate: {:?}",
            catalog.validate()
        );
    }
}

#[test]
fn every_builtin_key_has_a_non_empty_family() {
    for mode in MODES {
        let catalog = Catalog::builtin(mode);
        for key in keys::ALL {
            let key = DecisionKey::from(*key);
            assert!(catalog.contains(&key), "{mode} catalog should contain {key}");
            assert!(!catalog.lookup(&key).is_empty());
        }
        assert_eq!(catalog.keys().count(), keys::ALL.len());
    }
}

#[test]
fn unknown_keys_resolve_to_fallback_family() {
    let catalog = Catalog::builtin(PromptMode::Paraphrase);
    let fallback = catalog.lookup(&DecisionKey::fallback());

    for raw in ["FOO_BAR", "", "standard_counter", "ACCEPT_FINAL ", "🤝"] {
        let key = DecisionKey::from(raw);
        assert!(!catalog.contains(&key));
        assert_eq!(catalog.lookup(&key), fallback, "key {raw:?} should fall back");
    }
}

#[test]
fn default_decision_key_is_fallback() {
    assert_eq!(DecisionKey::default().as_str(), FALLBACK_KEY);
    assert_eq!(DecisionKey::fallback().to_string(), "DEFAULT");
}

#[test]
fn paraphrase_catalog_keeps_template_prefix() {
    let catalog = Catalog::builtin(PromptMode::Paraphrase);
    for (key, family) in catalog.families() {
        for template in family.members() {
            assert!(
                template.starts_with("Template: "),
                "{key} template should be prefixed: {template}"
            );
        }
    }
}

#[test]
fn price_families_mention_price_and_reject_does_not() {
    for mode in MODES {
        let catalog = Catalog::builtin(mode);
        for key in [
            keys::ACCEPT_FINAL,
            keys::ACCEPT_CONCILIATORY,
            keys::STANDARD_COUNTER,
            keys::FINAL_OFFER,
        ] {
            for template in catalog.lookup(&DecisionKey::from(key)).members() {
                assert!(template.contains("{price}"), "{key}: {template}");
            }
        }
        for key in [keys::REJECT_LOWBALL, keys::DEFAULT] {
            for template in catalog.lookup(&DecisionKey::from(key)).members() {
                assert!(!template.contains("{price}"), "{key}: {template}");
            }
        }
    }
}

#[test]
fn from_toml_loads_families_and_default_fallback() {
    let catalog = Catalog::from_toml(
        r#"
version = "2024.1"

[families]
ACCEPT_FINAL = ["Template: Deal at {price}."]
DEFAULT = ["Template: Hello."]
"#,
    )
    .expect("should parse");

    assert_eq!(catalog.version(), "2024.1");
    assert_eq!(catalog.fallback_key(), "DEFAULT");
    assert_eq!(
        catalog.lookup(&DecisionKey::from("ACCEPT_FINAL")).members(),
        ["Template: Deal at {price}."]
    );
    assert_eq!(
        catalog.lookup(&DecisionKey::from("NOPE")).members(),
        ["Template: Hello."]
    );
}

#[test]
fn from_toml_adds_new_keys_without_code_changes() {
    let catalog = Catalog::from_toml(
        r#"
version = "2"
fallback = "GENERIC"

[families]
BUNDLE_DISCOUNT = ["Template: Take both for {price}.", "Template: Both items, {price} total."]
GENERIC = ["Template: Thanks for your message."]
"#,
    )
    .expect("should parse");

    let family = catalog.lookup(&DecisionKey::from("BUNDLE_DISCOUNT"));
    assert_eq!(family.len(), 2);
    assert_eq!(
        catalog.lookup(&DecisionKey::from("DEFAULT")).members(),
        ["Template: Thanks for your message."]
    );
}

#[test]
fn from_toml_requires_fallback_family() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
ACCEPT_FINAL = ["Template: Deal at {price}."]
"#,
    );
    assert!(matches!(result, Err(CatalogError::MissingFallback(key)) if key == "DEFAULT"));
}

#[test]
fn from_toml_rejects_empty_family() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
ACCEPT_FINAL = []
DEFAULT = ["Template: Hi."]
"#,
    );
    assert!(matches!(result, Err(CatalogError::EmptyFamily(key)) if key == "ACCEPT_FINAL"));
}

#[test]
fn from_toml_rejects_unknown_placeholder() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
ACCEPT_FINAL = ["Template: Deal at {amount}."]
DEFAULT = ["Template: Hi."]
"#,
    );
    assert!(matches!(
        result,
        Err(CatalogError::UnsupportedPlaceholder { name, .. }) if name == "amount"
    ));
}

#[test]
fn from_toml_rejects_repeated_price_placeholder() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
ACCEPT_FINAL = ["Template: {price}, yes, {price}."]
DEFAULT = ["Template: Hi."]
"#,
    );
    assert!(matches!(result, Err(CatalogError::RepeatedPlaceholder { .. })));
}

#[test]
fn from_toml_rejects_malformed_template() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
DEFAULT = ["Template: broken {price"]
"#,
    );
    assert!(matches!(result, Err(CatalogError::Template { .. })));
}

#[test]
fn from_toml_rejects_disclosure_terms() {
    let result = Catalog::from_toml(
        r#"
version = "1"
[families]
REJECT_LOWBALL = ["Template: That is below our Floor Price."]
DEFAULT = ["Template: Hi."]
"#,
    );
    assert!(matches!(
        result,
        Err(CatalogError::Disclosure { term, .. }) if term == "floor price"
    ));
}

#[test]
fn from_toml_accepts_words_containing_disclosure_terms() {
    let catalog = Catalog::from_toml(
        r#"
version = "1"
[families]
DEFAULT = ["Template: This keeps your costs low and your margin for error small."]
"#,
    );
    assert!(catalog.is_ok(), "got {:?}", catalog.err());
}

#[test]
fn from_toml_rejects_invalid_toml() {
    assert!(matches!(
        Catalog::from_toml("version = "),
        Err(CatalogError::Parse(_))
    ));
}

#[test]
fn new_validates_raw_families() {
    let mut families = BTreeMap::new();
    families.insert("DEFAULT".to_owned(), vec!["Template: Hi {{there}}.".to_owned()]);
    let catalog = Catalog::new("test", "DEFAULT", families).expect("escaped braces are fine");
    assert_eq!(catalog.keys().collect::<Vec<_>>(), ["DEFAULT"]);
}

#[test]
fn load_reads_catalog_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("catalog.toml");
    std::fs::write(
        &path,
        "version = \"file\"\n[families]\nDEFAULT = [\"Template: From a file.\"]\n",
    )
    .expect("should write catalog");

    let catalog = Catalog::load(&path).expect("should load");
    assert_eq!(catalog.version(), "file");

    let missing = Catalog::load(&dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(CatalogError::Io { .. })));
}

#[test]
fn demo_catalog_file_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/catalog.toml");
    let catalog = Catalog::load(&path).expect("demo catalog should load");
    assert_eq!(catalog.version(), "demo-1");
    assert!(catalog.contains(&DecisionKey::from("BUNDLE_DISCOUNT")));
    for key in keys::ALL {
        assert!(catalog.contains(&DecisionKey::from(*key)), "demo catalog lacks {key}");
    }
}
