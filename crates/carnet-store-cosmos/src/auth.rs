//! Master-key request signing.
//!
//! Every REST call carries an `Authorization` header computed as
//! `HMAC-SHA256(key, "{verb}\n{resource type}\n{resource link}\n{date}\n\n")`,
//! base64 encoded and wrapped in `type=master&ver=1.0&sig=…`, the whole
//! string url-encoded. Verb, resource type and date are lowercased; the
//! resource link is used verbatim.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::Result;

type HmacSha256 = Hmac<Sha256>;

/// A decoded account master key.
#[derive(Clone)]
pub(crate) struct MasterKey(Vec<u8>);

impl MasterKey {
  pub(crate) fn from_base64(encoded: &str) -> Result<Self> {
    Ok(Self(B64.decode(encoded.trim())?))
  }

  /// Build the `Authorization` header value for one request.
  pub(crate) fn authorization(
    &self,
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
  ) -> String {
    let payload = format!(
      "{}\n{}\n{}\n{}\n\n",
      verb.to_lowercase(),
      resource_type.to_lowercase(),
      resource_link,
      date.to_lowercase(),
    );

    let mut mac = HmacSha256::new_from_slice(&self.0)
      .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    let signature = B64.encode(mac.finalize().into_bytes());

    urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}"))
      .into_owned()
  }
}

/// RFC 1123 date as expected in `x-ms-date`.
pub(crate) fn http_date(now: DateTime<Utc>) -> String {
  now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
