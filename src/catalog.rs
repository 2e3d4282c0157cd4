//! Template catalog: decision keys and their phrasing families.
//!
//! The catalog is versioned data. Each decision key maps to a non-empty
//! family of interchangeable templates; keys the catalog does not know
//! resolve to the fallback family. Content is either the built-in set for a
//! [`PromptMode`] or a TOML file loaded at startup:
//!
//! ```toml
//! version = "2024.1"
//! fallback = "DEFAULT"
//!
//! [families]
//! ACCEPT_FINAL = ["Template: We can accept {price}. It's a deal."]
//! DEFAULT = ["Template: I'm here to help."]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guardrail;
use crate::prompt::PromptMode;
use crate::render::{self, RenderError, PRICE_PLACEHOLDER};

/// Version of the built-in catalog content.
pub const CATALOG_VERSION: &str = "1.2.0";

/// Key of the generic acknowledgment family used for unknown keys.
pub const FALLBACK_KEY: &str = "DEFAULT";

/// Decision keys known to the built-in catalog.
pub mod keys {
    /// Accept the offer at the final price.
    pub const ACCEPT_FINAL: &str = "ACCEPT_FINAL";
    /// Accept the offer in a conciliatory tone.
    pub const ACCEPT_CONCILIATORY: &str = "ACCEPT_CONCILIATORY";
    /// Reject an offer that is too low.
    pub const REJECT_LOWBALL: &str = "REJECT_LOWBALL";
    /// Counter with a firm new price.
    pub const STANDARD_COUNTER: &str = "STANDARD_COUNTER";
    /// Counter with a final, non-negotiable price.
    pub const FINAL_OFFER: &str = "FINAL_OFFER";
    /// Generic acknowledgment.
    pub const DEFAULT: &str = super::FALLBACK_KEY;

    /// Every built-in key, fallback included.
    pub const ALL: &[&str] = &[
        ACCEPT_FINAL,
        ACCEPT_CONCILIATORY,
        REJECT_LOWBALL,
        STANDARD_COUNTER,
        FINAL_OFFER,
        DEFAULT,
    ];
}

type StaticFamilies = &'static [(&'static str, &'static [&'static str])];

const PARAPHRASE_FAMILIES: StaticFamilies = &[
    (
        keys::ACCEPT_FINAL,
        &[
            "Template: We can accept {price}. It's a deal.",
            "Template: That works for us. We can agree to {price}.",
            "Template: You've got it. We accept {price}.",
        ],
    ),
    (
        keys::ACCEPT_CONCILIATORY,
        &[
            "Template: You drive a hard bargain, but we can accept {price}. Let's make it happen.",
            "Template: We appreciate your patience. We're happy to accept {price}.",
            "Template: Fair enough, we'll meet you there. {price} it is.",
        ],
    ),
    (
        keys::REJECT_LOWBALL,
        &[
            "Template: I'm sorry, but that offer is too low for us to consider.",
            "Template: Unfortunately, that price is not workable for us.",
            "Template: I can't accept that, it's too far from our valuation.",
        ],
    ),
    (
        keys::STANDARD_COUNTER,
        &[
            "Template: We can't meet you there, but my best price is {price}.",
            "Template: We're getting close! The best I can do for you right now is {price}.",
            "Template: I can't accept your last offer, but I *can* meet you at {price}. Does that work?",
        ],
    ),
    (
        keys::FINAL_OFFER,
        &[
            "Template: {price} is our final offer, and we can't go any further.",
            "Template: This is the best we can do: {price}. That's our final offer.",
            "Template: Our final price is {price}. We won't be able to move from there.",
        ],
    ),
];

const PARAPHRASE_DEFAULT: &[&str] = &[
    "Template: Thanks for reaching out. How can I help?",
    "Template: I'm here to help.",
];

const INSTRUCTION_FAMILIES: StaticFamilies = &[
    (
        keys::ACCEPT_FINAL,
        &[
            "Tell the buyer we accept their offer of {price} and that we have a deal. Keep it upbeat and brief.",
            "Confirm in one or two sentences that {price} works for us and the deal is agreed.",
        ],
    ),
    (
        keys::ACCEPT_CONCILIATORY,
        &[
            "Warmly thank the buyer for their patience and accept {price}. Sound gracious, not reluctant.",
            "Acknowledge the buyer's effort in this negotiation and agree to {price} in a friendly tone.",
        ],
    ),
    (
        keys::REJECT_LOWBALL,
        &[
            "Politely tell the buyer their offer is too low for us to consider. Do not name any price.",
            "Decline the buyer's offer because it is too far from our valuation. Stay courteous and do not name a number.",
        ],
    ),
    (
        keys::STANDARD_COUNTER,
        &[
            "Tell the buyer we can't accept their offer and counter firmly at {price}. Invite them to agree.",
            "Let the buyer know we're getting close and that the best we can do right now is {price}.",
        ],
    ),
    (
        keys::FINAL_OFFER,
        &[
            "State firmly but politely that {price} is our final offer and that we cannot move further.",
            "Make clear that {price} is the last price we can offer and that it is not negotiable.",
        ],
    ),
];

const INSTRUCTION_DEFAULT: &[&str] = &[
    "Thank the buyer for reaching out and ask how you can help.",
    "Offer to help the buyer in one short, friendly sentence.",
];

/// Errors raised while loading or validating catalog content.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read a catalog file.
    #[error("failed to read catalog file {}: {source}", path.display())]
    Io {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Catalog file is not valid TOML or has the wrong shape.
    #[error("failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// The declared fallback key has no family.
    #[error("fallback key '{0}' has no template family")]
    MissingFallback(String),
    /// A family has no templates.
    #[error("template family '{0}' is empty")]
    EmptyFamily(String),
    /// A template does not parse.
    #[error("malformed template in family '{key}': {source}")]
    Template {
        /// Family the template belongs to.
        key: String,
        /// Parse failure.
        source: RenderError,
    },
    /// A template uses a placeholder other than `{price}`.
    #[error("unsupported placeholder '{name}' in family '{key}'")]
    UnsupportedPlaceholder {
        /// Family the template belongs to.
        key: String,
        /// Placeholder name.
        name: String,
    },
    /// A template uses `{price}` more than once.
    #[error("placeholder 'price' repeated in family '{key}'")]
    RepeatedPlaceholder {
        /// Family the template belongs to.
        key: String,
    },
    /// A template contains a disclosure term.
    #[error("template in family '{key}' contains disclosure term '{term}'")]
    Disclosure {
        /// Family the template belongs to.
        key: String,
        /// Matched term.
        term: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Decision key
// ---------------------------------------------------------------------------

/// Identifier naming the negotiation outcome to communicate.
///
/// Any string is accepted; keys the catalog does not know resolve to the
/// fallback family at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionKey(String);

impl DecisionKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The fallback key.
    pub fn fallback() -> Self {
        Self(FALLBACK_KEY.to_owned())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DecisionKey {
    fn default() -> Self {
        Self::fallback()
    }
}

impl From<&str> for DecisionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for DecisionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Template family
// ---------------------------------------------------------------------------

/// Non-empty set of interchangeable templates for one decision key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFamily {
    templates: Vec<String>,
}

impl TemplateFamily {
    fn from_static(templates: &[&str]) -> Self {
        Self {
            templates: templates.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    /// All templates of the family, in catalog order.
    pub fn members(&self) -> &[String] {
        &self.templates
    }

    /// Number of templates in the family.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Always false for families held by a [`Catalog`].
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Pick one template uniformly at random.
    ///
    /// Returns `None` only for an empty family, which a validated catalog
    /// never holds.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.templates.choose(rng).map(String::as_str)
    }

    fn validate(&self, key: &str) -> Result<(), CatalogError> {
        if self.templates.is_empty() {
            return Err(CatalogError::EmptyFamily(key.to_owned()));
        }
        for template in &self.templates {
            let names = render::placeholders(template).map_err(|source| CatalogError::Template {
                key: key.to_owned(),
                source,
            })?;
            if let Some(name) = names.iter().find(|n| n.as_str() != PRICE_PLACEHOLDER) {
                return Err(CatalogError::UnsupportedPlaceholder {
                    key: key.to_owned(),
                    name: name.clone(),
                });
            }
            if names.len() > 1 {
                return Err(CatalogError::RepeatedPlaceholder {
                    key: key.to_owned(),
                });
            }
            if let Some(hit) = guardrail::scan(template).into_iter().next() {
                return Err(CatalogError::Disclosure {
                    key: key.to_owned(),
                    term: hit.term,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    #[serde(default = "default_fallback")]
    fallback: String,
    families: BTreeMap<String, Vec<String>>,
}

fn default_fallback() -> String {
    FALLBACK_KEY.to_owned()
}

/// Immutable mapping from decision key to template family.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    fallback_key: String,
    fallback: TemplateFamily,
    families: BTreeMap<String, TemplateFamily>,
}

impl Catalog {
    /// Built-in catalog content for a prompt mode.
    pub fn builtin(mode: PromptMode) -> Self {
        let (families, fallback) = match mode {
            PromptMode::Paraphrase => (PARAPHRASE_FAMILIES, PARAPHRASE_DEFAULT),
            PromptMode::Instruction => (INSTRUCTION_FAMILIES, INSTRUCTION_DEFAULT),
        };
        Self {
            version: CATALOG_VERSION.to_owned(),
            fallback_key: FALLBACK_KEY.to_owned(),
            fallback: TemplateFamily::from_static(fallback),
            families: families
                .iter()
                .map(|(key, templates)| ((*key).to_owned(), TemplateFamily::from_static(templates)))
                .collect(),
        }
    }

    /// Build a catalog from raw families and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the fallback family is missing or any
    /// family fails validation.
    pub fn new(
        version: impl Into<String>,
        fallback_key: impl Into<String>,
        mut families: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, CatalogError> {
        let fallback_key = fallback_key.into();
        let fallback = families
            .remove(&fallback_key)
            .map(|templates| TemplateFamily { templates })
            .ok_or_else(|| CatalogError::MissingFallback(fallback_key.clone()))?;

        let catalog = Self {
            version: version.into(),
            fallback_key,
            fallback,
            families: families
                .into_iter()
                .map(|(key, templates)| (key, TemplateFamily { templates }))
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate catalog content from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed TOML, or a validation
    /// error as for [`Catalog::new`].
    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_str)?;
        Self::new(file.version, file.fallback, file.families)
    }

    /// Load and validate catalog content from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// for [`Catalog::from_toml`].
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Check every family: non-empty, well-formed, only `{price}` at most
    /// once, and free of disclosure terms.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        self.fallback.validate(&self.fallback_key)?;
        for (key, family) in &self.families {
            family.validate(key)?;
        }
        Ok(())
    }

    /// Family registered for `key`, or the fallback family.
    pub fn lookup(&self, key: &DecisionKey) -> &TemplateFamily {
        self.families.get(key.as_str()).unwrap_or(&self.fallback)
    }

    /// Whether `key` has its own family (the fallback key counts).
    pub fn contains(&self, key: &DecisionKey) -> bool {
        key.as_str() == self.fallback_key || self.families.contains_key(key.as_str())
    }

    /// Content version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Key of the fallback family.
    pub fn fallback_key(&self) -> &str {
        &self.fallback_key
    }

    /// Every family with its key, fallback last.
    pub fn families(&self) -> impl Iterator<Item = (&str, &TemplateFamily)> {
        self.families
            .iter()
            .map(|(key, family)| (key.as_str(), family))
            .chain(std::iter::once((
                self.fallback_key.as_str(),
                &self.fallback,
            )))
    }

    /// Every registered key, fallback last.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.families().map(|(key, _)| key)
    }
}
