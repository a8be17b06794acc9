//! SNI extraction from PEM certificates

use apisix_core::{Error, Result};
use std::net::IpAddr;
use x509_parser::extensions::GeneralName;
use x509_parser::pem::Pem;

/// Server names a certificate is valid for.
///
/// DNS subject alternative names win; without them the IP address SANs are
/// used, and without either the subject common name. A PEM document that
/// holds no certificate yields an empty list.
pub fn cert_snis(certificate: &str) -> Result<Vec<String>> {
    let Some(pem) = first_certificate(certificate)? else {
        return Ok(Vec::new());
    };
    let cert = pem
        .parse_x509()
        .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;

    let mut dns = Vec::new();
    let mut ips = Vec::new();
    let san = cert
        .subject_alternative_name()
        .map_err(|e| Error::Certificate(format!("invalid subject alternative names: {e}")))?;
    if let Some(san) = san {
        for name in &san.value.general_names {
            match name {
                GeneralName::DNSName(dns_name) => dns.push(dns_name.to_string()),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_bytes(bytes) {
                        ips.push(ip.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    if !dns.is_empty() {
        return Ok(dns);
    }
    if !ips.is_empty() {
        return Ok(ips);
    }
    Ok(cert
        .subject()
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .map(str::to_string)
        .collect())
}

/// Check that `key` holds a PEM encoded private key
pub fn check_private_key(key: &str) -> Result<()> {
    let mut reader = key.as_bytes();
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Certificate(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| Error::Certificate("no private key found in PEM data".to_string()))?;
    Ok(())
}

fn first_certificate(data: &str) -> Result<Option<Pem>> {
    for pem in Pem::iter_from_buffer(data.as_bytes()) {
        let pem = match pem {
            Ok(pem) => pem,
            Err(_) => return Ok(None),
        };
        if pem.label == "CERTIFICATE" {
            return Ok(Some(pem));
        }
    }
    Ok(None)
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, KeyPair};

    pub(crate) fn self_signed(names: &[&str], common_name: &str) -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        let cert = params.self_signed(&key).unwrap();
        (cert.pem(), key.serialize_pem())
    }

    #[test]
    fn test_dns_names_first() {
        let (cert, _) = self_signed(&["example.com", "www.example.com", "10.0.0.1"], "ignored");
        assert_eq!(
            cert_snis(&cert).unwrap(),
            vec!["example.com".to_string(), "www.example.com".to_string()]
        );
    }

    #[test]
    fn test_ip_addresses_without_dns() {
        let (cert, _) = self_signed(&["10.0.0.1", "::1"], "ignored");
        assert_eq!(
            cert_snis(&cert).unwrap(),
            vec!["10.0.0.1".to_string(), "::1".to_string()]
        );
    }

    #[test]
    fn test_common_name_fallback() {
        let (cert, _) = self_signed(&[], "api.internal");
        assert_eq!(cert_snis(&cert).unwrap(), vec!["api.internal".to_string()]);
    }

    #[test]
    fn test_no_certificate_is_empty() {
        assert!(cert_snis("").unwrap().is_empty());
        assert!(cert_snis("not a pem document").unwrap().is_empty());
    }

    #[test]
    fn test_private_key() {
        let (_, key) = self_signed(&["example.com"], "example.com");
        assert!(check_private_key(&key).is_ok());
        assert!(matches!(
            check_private_key("garbage"),
            Err(Error::Certificate(_))
        ));
    }
}
