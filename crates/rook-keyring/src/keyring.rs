//! Rendering of Ceph keyring files.
//!
//! A keyring is a single ini-like section:
//!
//! ```text
//! [client.admin]
//! 	key = AQBbz...==
//! 	caps mds = "allow *"
//! 	caps mon = "allow *"
//! ```
//!
//! The output for a given identity and secret is byte-for-byte stable, so the
//! stored text can be compared against a fresh render to detect no-op updates.
use snafu::{ensure, Snafu};

use crate::role::RoleIdentity;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("refusing to render the {identity} keyring with an empty secret"))]
    EmptySecret { identity: String },

    #[snafu(display(
        "the secret for the {identity} keyring must not contain whitespace or section brackets"
    ))]
    MalformedSecret { identity: String },
}

/// Renders the keyring of `identity` carrying `secret` as its key.
///
/// The secret is opaque here, it is only checked for characters that would
/// break the file layout.
pub fn render(identity: &RoleIdentity, secret: &str) -> Result<String> {
    ensure!(
        !secret.trim().is_empty(),
        EmptySecretSnafu {
            identity: identity.to_string()
        }
    );
    ensure!(
        !secret
            .chars()
            .any(|c| c.is_whitespace() || c == '[' || c == ']'),
        MalformedSecretSnafu {
            identity: identity.to_string()
        }
    );

    let caps: String = identity
        .role()
        .spec()
        .caps
        .iter()
        .map(|(daemon, grant)| format!("\tcaps {daemon} = \"{grant}\"\n"))
        .collect();

    Ok(format!(
        "[{principal}]\n\tkey = {secret}\n{caps}",
        principal = identity.principal()
    ))
}

/// Returns the value of the `key = ...` line of a rendered keyring.
pub fn parse_key(keyring: &str) -> Option<&str> {
    keyring.lines().find_map(|line| {
        let (name, value) = line.split_once('=')?;
        (name.trim() == "key").then(|| value.trim())
    })
}

/// Returns the principal of the first section of a rendered keyring.
pub fn parse_principal(keyring: &str) -> Option<&str> {
    keyring.lines().find_map(|line| {
        line.trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
    })
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::role::{Role, Scope};

    #[test]
    fn admin_keyring() {
        let keyring = render(&RoleIdentity::admin(), "adminsecretkey").unwrap();

        assert_eq!(
            keyring,
            indoc! {r#"
                [client.admin]
                	key = adminsecretkey
                	caps mds = "allow *"
                	caps mon = "allow *"
                	caps osd = "allow *"
                	caps mgr = "allow *"
            "#}
        );
    }

    #[test]
    fn osd_keyring() {
        let osd = RoleIdentity::instance(Role::Osd, "0").unwrap();
        let keyring = render(&osd, "osdkey").unwrap();

        assert_eq!(
            keyring,
            indoc! {r#"
                [osd.0]
                	key = osdkey
                	caps mgr = "allow profile osd"
                	caps mon = "allow profile osd"
                	caps osd = "allow *"
            "#}
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        for role in Role::iter() {
            let identity = match role.scope() {
                Scope::ClusterWide => RoleIdentity::cluster_wide(role),
                Scope::Instance => RoleIdentity::instance(role, "a"),
            }
            .unwrap();

            let first = render(&identity, "AQBbz0ZeAAAAABAAqlv/5ZMwWt3Rgdd+mAwZxw==").unwrap();
            let second = render(&identity, "AQBbz0ZeAAAAABAAqlv/5ZMwWt3Rgdd+mAwZxw==").unwrap();
            assert_eq!(first.as_bytes(), second.as_bytes(), "{role} renders differ");
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn empty_secret(#[case] secret: &str) {
        assert_eq!(
            render(&RoleIdentity::admin(), secret),
            Err(Error::EmptySecret {
                identity: "admin".to_owned()
            })
        );
    }

    #[rstest]
    #[case("two words")]
    #[case("line\nbreak")]
    #[case("[client.evil]")]
    fn malformed_secret(#[case] secret: &str) {
        assert!(matches!(
            render(&RoleIdentity::admin(), secret),
            Err(Error::MalformedSecret { .. })
        ));
    }

    #[test]
    fn parse_rendered_keyring() {
        let mgr = RoleIdentity::instance(Role::Mgr, "b").unwrap();
        let keyring = render(&mgr, "AQBbz0Ze==").unwrap();

        assert_eq!(parse_key(&keyring), Some("AQBbz0Ze=="));
        assert_eq!(parse_principal(&keyring), Some("mgr.b"));
        assert_eq!(parse_key("[client.admin]\n"), None);
    }
}
