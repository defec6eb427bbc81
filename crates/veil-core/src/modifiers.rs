//! Field key parsing
//!
//! A field key in a class body is the field name optionally prefixed with
//! whitespace-separated modifiers, e.g. `"protected static count"`.

use crate::error::{VeilError, VeilResult};

/// Visibility level of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Ordinary field, visible to every caller
    Public,
    /// Visible only to methods declared on the declaring class
    Private,
    /// Visible to methods of the declaring class and its descendants
    Protected,
}

/// Parsed field key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (last word of the key)
    pub name: String,
    /// Visibility level
    pub visibility: Visibility,
    /// Declared on the class (static side) rather than instances
    pub is_static: bool,
    /// `const` / `final`: the slot rejects writes after initialization
    pub read_only: bool,
}

impl FieldSpec {
    /// Parse a field key
    ///
    /// With `strict` set, unknown modifier words are rejected; otherwise they
    /// are skipped.
    pub fn parse(raw: &str, strict: bool) -> VeilResult<Self> {
        let mut words: Vec<&str> = raw.split_whitespace().collect();
        let name = words.pop().ok_or_else(|| VeilError::InvalidFieldSpec {
            spec: raw.to_string(),
            reason: "missing field name".to_string(),
        })?;

        let mut spec = FieldSpec {
            name: name.to_string(),
            visibility: Visibility::Public,
            is_static: false,
            read_only: false,
        };

        for word in words {
            match word {
                "private" => {
                    if spec.visibility == Visibility::Public {
                        spec.visibility = Visibility::Private;
                    }
                }
                "protected" => spec.visibility = Visibility::Protected,
                "static" => spec.is_static = true,
                "const" | "final" => spec.read_only = true,
                other if strict => {
                    return Err(VeilError::InvalidFieldSpec {
                        spec: raw.to_string(),
                        reason: format!("unknown modifier '{}'", other),
                    });
                }
                other => {
                    tracing::debug!(modifier = other, field = name, "ignoring unknown modifier");
                }
            }
        }

        Ok(spec)
    }

    /// Field is routed through the declaration registry
    pub fn is_managed(&self) -> bool {
        self.visibility != Visibility::Public
    }

    /// Field is recorded in the shared-field index
    pub fn is_shared(&self) -> bool {
        self.visibility == Visibility::Protected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let spec = FieldSpec::parse("yes", true).unwrap();
        assert_eq!(spec.name, "yes");
        assert_eq!(spec.visibility, Visibility::Public);
        assert!(!spec.is_managed());
        assert!(!spec.is_static);
    }

    #[test]
    fn test_private_static() {
        let spec = FieldSpec::parse("static private field2", true).unwrap();
        assert_eq!(spec.name, "field2");
        assert_eq!(spec.visibility, Visibility::Private);
        assert!(spec.is_static);
        assert!(spec.is_managed());
        assert!(!spec.is_shared());
    }

    #[test]
    fn test_protected_wins_over_private() {
        let spec = FieldSpec::parse("protected private x", true).unwrap();
        assert_eq!(spec.visibility, Visibility::Protected);
        let spec = FieldSpec::parse("private protected x", true).unwrap();
        assert_eq!(spec.visibility, Visibility::Protected);
        assert!(spec.is_shared());
    }

    #[test]
    fn test_read_only_modifiers() {
        assert!(FieldSpec::parse("private const limit", true).unwrap().read_only);
        assert!(FieldSpec::parse("final tag", true).unwrap().read_only);
    }

    #[test]
    fn test_extra_whitespace() {
        let spec = FieldSpec::parse("  protected\tstatic   field4 ", true).unwrap();
        assert_eq!(spec.name, "field4");
        assert!(spec.is_static);
        assert!(spec.is_shared());
    }

    #[test]
    fn test_empty_key() {
        assert!(matches!(
            FieldSpec::parse("   ", true),
            Err(VeilError::InvalidFieldSpec { .. })
        ));
    }

    #[test]
    fn test_unknown_modifier() {
        assert!(matches!(
            FieldSpec::parse("pirvate secret", true),
            Err(VeilError::InvalidFieldSpec { .. })
        ));

        let spec = FieldSpec::parse("pirvate secret", false).unwrap();
        assert_eq!(spec.name, "secret");
        assert_eq!(spec.visibility, Visibility::Public);
    }
}
