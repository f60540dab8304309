//! WebID-TLS client certificate authentication
//!
//! The TLS listener (out of scope here) stores the peer's certificate chain
//! in the request extensions as `PeerCertificates`. Authentication
//! dereferences each `subjectAltName` URI and succeeds when the profile
//! declares a key whose modulus and exponent match the certificate's.

use common::ns::cert;
use common::prelude::Graph;
use oxrdf::{NamedNode, Subject, Term};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use super::webid_rsa::key_parameters;
use crate::service_state::State;

/// Peer certificate chain in DER form, leaf first. Installed into request
/// extensions by the TLS front.
#[derive(Debug, Clone, Default)]
pub struct PeerCertificates(pub Vec<Vec<u8>>);

/// WebID proven by the peer certificate, if any.
pub async fn authenticate(state: &State, peer: &PeerCertificates) -> Option<String> {
    let der = peer.0.first()?;
    let (_, certificate) = parse_x509_certificate(der).ok()?;
    let san = certificate.subject_alternative_name().ok().flatten()?;

    let (modulus, exponent) = match certificate.public_key().parsed().ok()? {
        PublicKey::RSA(key) => (
            trim_leading_zeros(key.modulus).to_vec(),
            exponent_u64(key.exponent)?,
        ),
        _ => return None,
    };

    for name in &san.value.general_names {
        let GeneralName::URI(webid) = name else {
            continue;
        };
        let profile = state.profiles().load(webid).await;
        if profile_matches_key(&profile, webid, &modulus, exponent) {
            tracing::debug!(webid, "WebID-TLS key match");
            return Some(webid.to_string());
        }
    }
    None
}

/// Does `webid`'s profile declare exactly this public key?
fn profile_matches_key(profile: &Graph, webid: &str, modulus: &[u8], exponent: u64) -> bool {
    let Ok(agent) = NamedNode::new(webid) else {
        return false;
    };
    for t in profile.all(Some(agent.as_ref().into()), Some(cert::KEY), None) {
        let key_node: Subject = match t.object {
            Term::NamedNode(n) => n.into(),
            Term::BlankNode(b) => b.into(),
            _ => continue,
        };
        let Some((declared_modulus, declared_exponent)) = key_parameters(profile, &key_node)
        else {
            continue;
        };
        if trim_leading_zeros(&declared_modulus) == modulus && declared_exponent == exponent {
            return true;
        }
    }
    false
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn exponent_u64(bytes: &[u8]) -> Option<u64> {
    let bytes = trim_leading_zeros(bytes);
    if bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trim_leading_zeros() {
        assert_eq!(trim_leading_zeros(&[0, 0, 1, 2]), &[1, 2]);
        assert_eq!(trim_leading_zeros(&[1, 0]), &[1, 0]);
        assert_eq!(trim_leading_zeros(&[0, 0]), &[] as &[u8]);
    }

    #[test]
    fn test_exponent_decoding() {
        assert_eq!(exponent_u64(&[0x01, 0x00, 0x01]), Some(65537));
        assert_eq!(exponent_u64(&[0x00, 0x03]), Some(3));
        assert_eq!(exponent_u64(&[1; 9]), None);
    }

    #[test]
    fn test_profile_key_match() {
        let webid = "https://example.org/u#me";
        let mut profile = Graph::new("https://example.org/u");
        profile
            .parse(
                concat!(
                    "@prefix cert: <http://www.w3.org/ns/auth/cert#> .\n",
                    "<https://example.org/u#me> cert:key [\n",
                    "  a cert:RSAPublicKey ;\n",
                    "  cert:modulus \"00C0FFEE\" ;\n",
                    "  cert:exponent 65537\n",
                    "] .\n",
                )
                .as_bytes(),
                "text/turtle",
            )
            .unwrap();

        assert!(profile_matches_key(
            &profile,
            webid,
            &[0xc0, 0xff, 0xee],
            65537
        ));
        assert!(!profile_matches_key(
            &profile,
            webid,
            &[0xc0, 0xff, 0xef],
            65537
        ));
        assert!(!profile_matches_key(
            &profile,
            webid,
            &[0xc0, 0xff, 0xee],
            3
        ));
    }
}
