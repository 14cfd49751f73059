//! Static message templates and placeholder substitution.
//!
//! A template directory holds `catalog.json` plus one HTML file per
//! template:
//!
//! ```json
//! [
//!   {
//!     "id": "welcome",
//!     "name": "Welcome",
//!     "subject": "Welcome aboard",
//!     "file": "welcome.html",
//!     "placeholders": ["EMAIL", "FIRSTNAME"]
//!   }
//! ]
//! ```
//!
//! Placeholders are uppercase tokens replaced verbatim. Tokens without a
//! binding are left in the text untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Catalog file name inside a template directory.
pub const CATALOG_FILE: &str = "catalog.json";

/// Placeholder filled with today's date by [`computed_bindings`].
pub const DATE_PLACEHOLDER: &str = "DATE";

/// Long date format, e.g. `Monday, October 19, 2026`.
const DATE_FORMAT: &str = "%A, %B %d, %Y";

/// Placeholder token → replacement text.
pub type Bindings = BTreeMap<String, String>;

/// Errors from loading or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The catalog is missing or not valid JSON.
    #[error("Template catalog {path} unusable: {reason}")]
    Catalog {
        /// Catalog path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// No template with this id.
    #[error("Template not found: {0}")]
    NotFound(String),

    /// The template's HTML file could not be read.
    #[error("Template source file {path} could not be read: {source}")]
    MissingSourceFile {
        /// File that was expected.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier used on the command line.
    pub id: String,
    /// Menu label.
    pub name: String,
    /// Subject line; may contain placeholders.
    pub subject: String,
    /// HTML file relative to the template directory.
    pub file: PathBuf,
    /// Tokens this template expects to be bound.
    #[serde(default)]
    pub placeholders: BTreeSet<String>,
}

/// Result of rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Subject after substitution.
    pub subject: String,
    /// HTML body after substitution.
    pub body: String,
}

/// A directory of templates described by its catalog.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Opens a template directory and reads its catalog.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Catalog`] if the catalog cannot be read or
    /// parsed, or lists the same id twice.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        let root = root.into();
        let path = root.join(CATALOG_FILE);

        let contents = std::fs::read_to_string(&path).map_err(|e| TemplateError::Catalog {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let templates: Vec<Template> =
            serde_json::from_str(&contents).map_err(|e| TemplateError::Catalog {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let mut seen = BTreeSet::new();
        if let Some(dup) = templates.iter().find(|t| !seen.insert(t.id.as_str())) {
            return Err(TemplateError::Catalog {
                path,
                reason: format!("duplicate template id {:?}", dup.id),
            });
        }

        debug!(count = templates.len(), root = %root.display(), "template catalog loaded");
        Ok(Self { root, templates })
    }

    /// Directory the template files are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All catalog entries, in catalog order.
    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Loads the template's HTML and substitutes `bindings` into both the
    /// subject and the body.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] for an unknown id and
    /// [`TemplateError::MissingSourceFile`] if the HTML cannot be read.
    pub fn render(&self, id: &str, bindings: &Bindings) -> Result<Rendered, TemplateError> {
        let template = self
            .get(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;

        let path = self.root.join(&template.file);
        let source = std::fs::read_to_string(&path)
            .map_err(|source| TemplateError::MissingSourceFile { path, source })?;

        let unbound: Vec<&str> = template
            .placeholders
            .iter()
            .filter(|p| !bindings.contains_key(p.as_str()))
            .map(String::as_str)
            .collect();
        if !unbound.is_empty() {
            debug!(template = id, ?unbound, "placeholders left unbound");
        }

        Ok(Rendered {
            subject: substitute(&template.subject, bindings),
            body: substitute(&source, bindings),
        })
    }
}

/// Replaces every occurrence of each bound token in `text`.
///
/// The text is scanned once from left to right; at each position the
/// earliest (then longest) matching token wins and its replacement is not
/// rescanned. Tokens with no binding, and empty tokens, are left alone.
#[must_use]
pub fn substitute(text: &str, bindings: &Bindings) -> String {
    let tokens: Vec<(&str, &str)> = bindings
        .iter()
        .filter(|(token, _)| !token.is_empty())
        .map(|(token, value)| (token.as_str(), value.as_str()))
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        let next = tokens
            .iter()
            .filter_map(|&(token, value)| rest.find(token).map(|at| (at, token, value)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

        match next {
            Some((at, token, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Values computed rather than asked for: currently `DATE`.
#[must_use]
pub fn computed_bindings(today: NaiveDate) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(
        DATE_PLACEHOLDER.to_string(),
        today.format(DATE_FORMAT).to_string(),
    );
    bindings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn store_with(files: &[(&str, &str)], catalog: &str) -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CATALOG_FILE), catalog).unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let store = TemplateStore::open(dir.path()).unwrap();
        (dir, store)
    }

    const CATALOG: &str = r#"[
        {"id": "welcome", "name": "Welcome", "subject": "Welcome aboard",
         "file": "welcome.html", "placeholders": ["EMAIL", "FIRSTNAME"]},
        {"id": "reminder", "name": "Reminder", "subject": "See you DATE",
         "file": "reminder.html", "placeholders": ["DATE"]},
        {"id": "ghost", "name": "Ghost", "subject": "x", "file": "ghost.html"}
    ]"#;

    #[test]
    fn substitutes_every_occurrence() {
        let out = substitute("EMAIL and EMAIL again", &bindings(&[("EMAIL", "b@y.com")]));
        assert_eq!(out, "b@y.com and b@y.com again");
    }

    #[test]
    fn unbound_tokens_stay_verbatim() {
        let out = substitute(
            "Hi FIRSTNAME, see you DATE",
            &bindings(&[("FIRSTNAME", "Ada")]),
        );
        assert_eq!(out, "Hi Ada, see you DATE");
    }

    #[test]
    fn replacement_is_not_rescanned() {
        let out = substitute(
            "FIRSTNAME / DATE",
            &bindings(&[("FIRSTNAME", "DATE"), ("DATE", "today")]),
        );
        assert_eq!(out, "DATE / today");
    }

    #[test]
    fn longest_token_wins_at_same_position() {
        let out = substitute("NAME FIRSTNAME", &bindings(&[("NAME", "n"), ("FIRSTNAME", "f")]));
        assert_eq!(out, "n f");
        let out = substitute("FULLNAME", &bindings(&[("FULL", "x"), ("FULLNAME", "y")]));
        assert_eq!(out, "y");
    }

    #[test]
    fn computed_date_is_long_form() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            computed_bindings(today).get(DATE_PLACEHOLDER).map(String::as_str),
            Some("Monday, October 19, 2026")
        );
    }

    #[test]
    fn renders_subject_and_body() {
        let (_dir, store) = store_with(
            &[("welcome.html", "<p>Your account EMAIL is ready, FIRSTNAME.</p>")],
            CATALOG,
        );
        let rendered = store
            .render(
                "welcome",
                &bindings(&[("EMAIL", "b@y.com"), ("FIRSTNAME", "Bea")]),
            )
            .unwrap();
        assert_eq!(rendered.subject, "Welcome aboard");
        assert_eq!(rendered.body, "<p>Your account b@y.com is ready, Bea.</p>");
    }

    #[test]
    fn placeholders_in_subject_are_substituted() {
        let (_dir, store) = store_with(&[("reminder.html", "<p>On DATE</p>")], CATALOG);
        let rendered = store
            .render("reminder", &bindings(&[("DATE", "Friday")]))
            .unwrap();
        assert_eq!(rendered.subject, "See you Friday");
        assert_eq!(rendered.body, "<p>On Friday</p>");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_dir, store) = store_with(&[], CATALOG);
        assert!(matches!(
            store.render("nope", &Bindings::new()),
            Err(TemplateError::NotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let (_dir, store) = store_with(&[], CATALOG);
        let err = store.render("ghost", &Bindings::new()).unwrap_err();
        match err {
            TemplateError::MissingSourceFile { path, .. } => {
                assert!(path.ends_with("ghost.html"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn catalog_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TemplateStore::open(dir.path()),
            Err(TemplateError::Catalog { .. })
        ));

        fs::write(dir.path().join(CATALOG_FILE), "{not json").unwrap();
        assert!(matches!(
            TemplateStore::open(dir.path()),
            Err(TemplateError::Catalog { .. })
        ));

        fs::write(
            dir.path().join(CATALOG_FILE),
            r#"[{"id":"a","name":"A","subject":"s","file":"a.html"},
                {"id":"a","name":"B","subject":"s","file":"b.html"}]"#,
        )
        .unwrap();
        let err = TemplateStore::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    const TOKENS: [&str; 3] = ["EMAIL", "FIRSTNAME", "DATE"];

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{0,8}",
            proptest::sample::select(TOKENS.to_vec()).prop_map(str::to_string),
        ]
    }

    proptest! {
        #[test]
        fn bound_tokens_vanish_and_length_adds_up(
            segments in proptest::collection::vec(segment(), 0..24),
            values in proptest::collection::vec("[a-z@.]{0,12}", 3),
        ) {
            let text = segments.join(" ");
            let map: Bindings = TOKENS
                .iter()
                .zip(&values)
                .map(|(t, v)| ((*t).to_string(), v.clone()))
                .collect();

            let out = substitute(&text, &map);

            let mut expected = text.len();
            for (token, value) in TOKENS.iter().zip(&values) {
                let count = text.matches(token).count();
                expected = expected + count * value.len() - count * token.len();
                prop_assert!(!out.contains(token));
            }
            prop_assert_eq!(out.len(), expected);
        }
    }
}
