//! Rewriting absolute source paths relative to a base directory.

use ledger_model::{Meta, MetaValue, OptionValue, FILENAME_KEY};
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A path that does not live under the configured base directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Path {} is not under base path {}", path.display(), base.display())]
pub struct PathError {
    pub path: PathBuf,
    pub base: PathBuf,
}

/// Strips a base directory from source paths.
///
/// A disabled normalizer returns every path unchanged.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    base: PathBuf,
    enabled: bool,
}

impl PathNormalizer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            base: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Path of `path` relative to the base. Matching is per component, so
    /// `/data/ledger2` is not under `/data/ledger`. The remainder must name
    /// something below the base: the base itself and remainders climbing
    /// out through `..` are rejected.
    pub fn strip(&self, path: &str) -> Result<String, PathError> {
        if !self.enabled {
            return Ok(path.to_string());
        }
        let outside = || PathError {
            path: PathBuf::from(path),
            base: self.base.clone(),
        };
        let relative = Path::new(path).strip_prefix(&self.base).map_err(|_| outside())?;
        let mut components = relative.components().peekable();
        if components.peek().is_none()
            || components.any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(outside());
        }
        Ok(relative.to_string_lossy().into_owned())
    }

    pub fn strip_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<String>, PathError> {
        paths.iter().map(|p| self.strip(p.as_ref())).collect()
    }

    /// Copy of `meta` with a text `filename` stripped. Borrows when there is
    /// nothing to rewrite.
    pub fn strip_meta<'a>(&self, meta: &'a Meta) -> Result<Cow<'a, Meta>, PathError> {
        if !self.enabled {
            return Ok(Cow::Borrowed(meta));
        }
        let Some(MetaValue::Text(filename)) = meta.get(FILENAME_KEY) else {
            return Ok(Cow::Borrowed(meta));
        };
        let stripped = self.strip(filename)?;
        let mut owned = meta.clone();
        owned.insert(FILENAME_KEY.to_string(), MetaValue::Text(stripped));
        Ok(Cow::Owned(owned))
    }

    /// Strip a path-valued option, keeping its shape (single path or list).
    pub fn strip_option(&self, value: &OptionValue) -> Result<OptionValue, PathError> {
        match value {
            OptionValue::Text(path) => self.strip(path).map(OptionValue::Text),
            OptionValue::List(items) => items
                .iter()
                .map(|item| self.strip_option(item))
                .collect::<Result<Vec<_>, _>>()
                .map(OptionValue::List),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_descendant() {
        let paths = PathNormalizer::new("/abs/base");
        assert_eq!(paths.strip("/abs/base/sub/main.bean").unwrap(), "sub/main.bean");
        assert_eq!(paths.strip("/abs/base/main.bean").unwrap(), "main.bean");
    }

    #[test]
    fn test_strip_outside_base_fails() {
        let paths = PathNormalizer::new("/abs/base");
        let err = paths.strip("/elsewhere/main.bean").unwrap_err();
        assert_eq!(err.path, PathBuf::from("/elsewhere/main.bean"));
        assert_eq!(err.base, PathBuf::from("/abs/base"));
        assert!(err.to_string().contains("/elsewhere/main.bean"));

        assert!(paths.strip("/abs/basement/main.bean").is_err());
    }

    #[test]
    fn test_strip_parent_escape_fails() {
        let paths = PathNormalizer::new("/l");
        let err = paths.strip("/l/../etc/x").unwrap_err();
        assert_eq!(err.path, PathBuf::from("/l/../etc/x"));
        assert!(paths.strip("/l/sub/../../etc/x").is_err());
    }

    #[test]
    fn test_strip_base_itself_fails() {
        let paths = PathNormalizer::new("/l");
        assert!(paths.strip("/l").is_err());
        assert!(paths.strip("/l/").is_err());
    }

    #[test]
    fn test_disabled_is_identity() {
        let paths = PathNormalizer::disabled();
        assert_eq!(paths.strip("/anywhere/x.bean").unwrap(), "/anywhere/x.bean");
    }

    #[test]
    fn test_strip_meta_does_not_touch_input() {
        let paths = PathNormalizer::new("/abs/base");
        let mut meta = Meta::new();
        meta.insert("filename".into(), MetaValue::from("/abs/base/a.bean"));
        meta.insert("lineno".into(), MetaValue::from(4));

        let stripped = paths.strip_meta(&meta).unwrap();
        assert_eq!(stripped["filename"], MetaValue::from("a.bean"));
        assert_eq!(stripped["lineno"], MetaValue::from(4));
        assert_eq!(meta["filename"], MetaValue::from("/abs/base/a.bean"));

        let keys: Vec<&String> = stripped.keys().collect();
        assert_eq!(keys, ["filename", "lineno"]);
    }

    #[test]
    fn test_strip_meta_without_filename_borrows() {
        let paths = PathNormalizer::new("/abs/base");
        let meta = Meta::new();
        assert!(matches!(paths.strip_meta(&meta).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_option_keeps_shape() {
        let paths = PathNormalizer::new("/l");
        let list = OptionValue::List(vec!["/l/a.bean".into(), "/l/b/c.bean".into()]);
        assert_eq!(
            paths.strip_option(&list).unwrap(),
            OptionValue::List(vec!["a.bean".into(), "b/c.bean".into()])
        );
        assert_eq!(
            paths.strip_option(&"/l/main.bean".into()).unwrap(),
            OptionValue::from("main.bean")
        );
        assert_eq!(
            paths.strip_option(&OptionValue::Bool(true)).unwrap(),
            OptionValue::Bool(true)
        );
    }

    #[test]
    fn test_strip_all() {
        let paths = PathNormalizer::new("/l");
        assert_eq!(paths.strip_all(&["/l/a", "/l/b"]).unwrap(), ["a", "b"]);
        assert!(paths.strip_all(&["/l/a", "/x/b"]).is_err());
    }
}
