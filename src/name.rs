//! Principal name parsing and canonicalization

use std::{fmt, str::FromStr};

use crate::{
    backend::{KRB5_CONFIG_NODEFREALM, KRB5_PARSE_MALFORMED},
    error::{Error, Result},
};

/// A parsed principal name: one or more components and a realm
///
/// The canonical textual form is `component[/component...]@REALM`, with `\`, `/` and `@`
/// escaped by a backslash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrincipalName {
    components: Vec<String>,
    realm: String,
}

impl PrincipalName {
    /// Parse `name`, using `default_realm` when `name` carries none
    ///
    /// ```
    /// use kadmin_session::PrincipalName;
    ///
    /// let princ = PrincipalName::parse("user/admin", Some("EXAMPLE.ORG")).unwrap();
    /// assert_eq!(princ.to_string(), "user/admin@EXAMPLE.ORG");
    /// assert_eq!(princ.components(), ["user", "admin"]);
    /// ```
    pub fn parse(name: &str, default_realm: Option<&str>) -> Result<Self> {
        let malformed = |reason| Error::NameParse {
            name: name.to_owned(),
            code: KRB5_PARSE_MALFORMED,
            reason,
        };

        let mut components = vec![String::new()];
        let mut realm: Option<String> = None;
        let mut chars = name.chars();

        while let Some(c) = chars.next() {
            let (c, escaped) = if c == '\\' {
                let escaped = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('b') => '\u{8}',
                    Some('0') => '\0',
                    Some(other) => other,
                    None => return Err(malformed("trailing escape character")),
                };
                (escaped, true)
            } else {
                (c, false)
            };

            match (c, escaped, realm.as_mut()) {
                ('/', false, None) => components.push(String::new()),
                ('/', false, Some(_)) => return Err(malformed("separator in realm")),
                ('@', false, None) => realm = Some(String::new()),
                ('@', false, Some(_)) => return Err(malformed("more than one realm separator")),
                (c, _, Some(realm)) => realm.push(c),
                (c, _, None) => {
                    if let Some(last) = components.last_mut() {
                        last.push(c);
                    }
                }
            }
        }

        if components.first().map_or(true, String::is_empty) {
            return Err(malformed("empty principal name"));
        }

        let realm = match realm {
            Some(realm) if realm.is_empty() => return Err(malformed("empty realm")),
            Some(realm) => realm,
            None => match default_realm {
                Some(realm) => realm.to_owned(),
                None => {
                    return Err(Error::NameParse {
                        name: name.to_owned(),
                        code: KRB5_CONFIG_NODEFREALM,
                        reason: "no realm and no default realm",
                    })
                }
            },
        };

        Ok(Self { components, realm })
    }

    /// Name components, without the realm
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Realm
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        match c {
            '\\' | '/' | '@' => write!(f, "\\{c}")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\0' => f.write_str("\\0")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write_escaped(f, component)?;
        }
        f.write_str("@")?;
        write_escaped(f, &self.realm)
    }
}

impl FromStr for PrincipalName {
    type Err = Error;

    /// Parse a fully qualified principal name. A missing realm is an error.
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_realm_is_appended() -> Result<()> {
        let princ = PrincipalName::parse("alice", Some("TEST.LOCAL"))?;
        assert_eq!(princ.to_string(), "alice@TEST.LOCAL");
        assert_eq!(princ.realm(), "TEST.LOCAL");
        Ok(())
    }

    #[test]
    fn explicit_realm_wins() -> Result<()> {
        let princ = PrincipalName::parse("alice@OTHER.LOCAL", Some("TEST.LOCAL"))?;
        assert_eq!(princ.realm(), "OTHER.LOCAL");
        Ok(())
    }

    #[test]
    fn components() -> Result<()> {
        let princ: PrincipalName = "HTTP/www.example.org@EXAMPLE.ORG".parse()?;
        assert_eq!(princ.components(), ["HTTP", "www.example.org"]);
        assert_eq!(princ.to_string(), "HTTP/www.example.org@EXAMPLE.ORG");
        Ok(())
    }

    #[test]
    fn escapes_are_kept_in_canonical_form() -> Result<()> {
        let princ = PrincipalName::parse(r"odd\/name\@x", Some("TEST.LOCAL"))?;
        assert_eq!(princ.components(), ["odd/name@x"]);
        assert_eq!(princ.to_string(), r"odd\/name\@x@TEST.LOCAL");
        assert_eq!(PrincipalName::from_str(&princ.to_string())?, princ);
        Ok(())
    }

    #[test]
    fn malformed_names() {
        for name in ["", "@TEST.LOCAL", "/admin@TEST.LOCAL", "alice@", "a@B@C", "alice\\"] {
            let err = PrincipalName::parse(name, Some("TEST.LOCAL")).unwrap_err();
            assert!(
                matches!(err, Error::NameParse { code: KRB5_PARSE_MALFORMED, .. }),
                "{name:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn no_realm_at_all() {
        let err = PrincipalName::parse("alice", None).unwrap_err();
        assert!(matches!(
            err,
            Error::NameParse {
                code: KRB5_CONFIG_NODEFREALM,
                ..
            }
        ));
    }
}
