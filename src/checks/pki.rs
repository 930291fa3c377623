//! Shared PKI resource helpers
//!
//! Certificate checks all start from the same two fetches: the issuer listing
//! and one JSON read per issuer. These helpers go through the fetcher and
//! memoize the parsed forms in each fetch's parsed cache, so the listing and
//! every certificate are decoded once per run no matter how many checks ask.

use crate::core::cache::Operation;
use crate::core::error::{HealthError, HealthResult};
use crate::core::fetch::ResourceFetcher;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

pub const ISSUERS_PATH: &str = "/{{mount}}/issuers";

const ISSUERS_KEY: &str = "issuers";
const CERTIFICATE_KEY: &str = "certificate";

/// Path of an issuer's JSON representation
pub fn issuer_json_path(issuer: &str) -> String {
  format!("/{{{{mount}}}}/issuer/{}/json", issuer)
}

/// Endpoint reported in results about an issuer
pub fn issuer_endpoint(issuer: &str) -> String {
  format!("/{{{{mount}}}}/issuer/{}", issuer)
}

/// Parsed issuer certificate
#[derive(Debug, Clone)]
pub struct IssuerCertificate {
  issuer_id: String,
  subject: String,
  issuer: String,
  subject_matches_issuer: bool,
  self_signature_valid: bool,
  not_after: DateTime<Utc>,
}

impl IssuerCertificate {
  /// Parse a PEM-encoded certificate belonging to `issuer_id`
  pub fn from_pem(issuer_id: &str, pem: &str) -> HealthResult<Self> {
    let resource = format!("issuer {}", issuer_id);
    let (_, pem) = parse_x509_pem(pem.as_bytes())
      .map_err(|e| HealthError::resource(&resource, format!("failed to decode issuer's PEM: {}", e)))?;
    if pem.label != "CERTIFICATE" {
      return Err(HealthError::resource(
        &resource,
        format!("expected a CERTIFICATE PEM block, found '{}'", pem.label),
      ));
    }
    Self::from_der(issuer_id, &pem.contents)
  }

  fn from_der(issuer_id: &str, der: &[u8]) -> HealthResult<Self> {
    let resource = format!("issuer {}", issuer_id);
    let (_, cert) = X509Certificate::from_der(der)
      .map_err(|e| HealthError::resource(&resource, format!("failed to parse certificate: {}", e)))?;
    let subject_matches_issuer = cert.subject().as_raw() == cert.issuer().as_raw();
    let self_signature_valid = cert.verify_signature(Some(cert.public_key())).is_ok();
    let not_after_ts = cert.validity().not_after.timestamp();

    let not_after = DateTime::<Utc>::from_timestamp(not_after_ts, 0)
      .ok_or_else(|| HealthError::resource(&resource, format!("expiry {} is out of range", not_after_ts)))?;

    let parsed = Self {
      issuer_id: issuer_id.to_string(),
      subject: cert.subject().to_string(),
      issuer: cert.issuer().to_string(),
      subject_matches_issuer,
      self_signature_valid,
      not_after,
    };
    debug!(
      issuer = issuer_id,
      subject = %parsed.subject,
      issued_by = %parsed.issuer,
      root = parsed.is_self_signed_root(),
      "parsed issuer certificate"
    );
    Ok(parsed)
  }

  pub fn issuer_id(&self) -> &str {
    &self.issuer_id
  }

  pub fn subject(&self) -> &str {
    &self.subject
  }

  pub fn issuer(&self) -> &str {
    &self.issuer
  }

  pub fn not_after(&self) -> DateTime<Utc> {
    self.not_after
  }

  /// Root iff the raw subject and issuer names are identical and the
  /// signature verifies against the certificate's own public key
  pub fn is_self_signed_root(&self) -> bool {
    self.subject_matches_issuer && self.self_signature_valid
  }
}

/// Issuer ids on the mount, in listing order without duplicates
pub fn fetch_issuer_ids(fetcher: &mut ResourceFetcher) -> HealthResult<Arc<Vec<String>>> {
  let listing = fetcher.fetch_if_not_fetched(Operation::List, ISSUERS_PATH)?;
  let path = listing.path().to_string();
  listing.parsed_or_try_insert(ISSUERS_KEY, |response| parse_issuer_listing(&path, response))
}

/// Certificate of one issuer, parsed once per run
pub fn fetch_issuer_certificate(fetcher: &mut ResourceFetcher, issuer: &str) -> HealthResult<Arc<IssuerCertificate>> {
  let entry = fetcher.fetch_if_not_fetched(Operation::Read, &issuer_json_path(issuer))?;
  entry.parsed_or_try_insert(CERTIFICATE_KEY, |response| {
    let pem = response
      .and_then(|data| data.get("certificate"))
      .and_then(Value::as_str)
      .ok_or_else(|| HealthError::resource(format!("issuer {}", issuer), "response has no certificate"))?;
    IssuerCertificate::from_pem(issuer, pem)
  })
}

/// Every issuer with its certificate, in listing order
pub fn fetch_issuer_certificates(
  fetcher: &mut ResourceFetcher,
) -> HealthResult<Vec<(String, Arc<IssuerCertificate>)>> {
  let issuers = fetch_issuer_ids(fetcher)?;
  issuers
    .iter()
    .map(|issuer| fetch_issuer_certificate(fetcher, issuer).map(|cert| (issuer.clone(), cert)))
    .collect()
}

fn parse_issuer_listing(path: &str, response: Option<&Value>) -> HealthResult<Vec<String>> {
  // An empty mount lists nothing at all.
  let Some(data) = response else {
    return Ok(Vec::new());
  };

  let keys = match data.get("keys") {
    Some(Value::Array(keys)) => keys,
    Some(_) => return Err(HealthError::resource(path, "'keys' is not a list")),
    None => return Ok(Vec::new()),
  };

  let mut seen = HashSet::new();
  let mut issuers = Vec::with_capacity(keys.len());
  for key in keys {
    let id = key
      .as_str()
      .ok_or_else(|| HealthError::resource(path, format!("issuer id {} is not a string", key)))?;
    if seen.insert(id) {
      issuers.push(id.to_string());
    } else {
      warn!(issuer = id, %path, "duplicate issuer in listing");
    }
  }
  Ok(issuers)
}
