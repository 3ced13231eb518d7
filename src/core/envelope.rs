//! Envelope format.
//!
//! A vault is persisted as pretty-printed JSON. Binary fields are standard
//! base64; wrapped keys are flattened into `meta` as `<method>_cipher`:
//!
//! ```text
//! {
//!     "data": "<base64 ciphertext>",
//!     "owners": [ { "gpg": "ABCDEF..." }, { "age": "age1..." } ],
//!     "meta": {
//!         "owners_checksum": "<base64 sha-256>",
//!         "gpg_cipher": "<base64 wrapped key>",
//!         "age_cipher": "<base64 wrapped key>"
//!     }
//! }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::trace;

use crate::core::constants::{CIPHER_FIELD_SUFFIX, OWNERS_CHECKSUM_FIELD};
use crate::core::ordered::OrderedMap;
use crate::core::owners::Owner;
use crate::error::EnvelopeError;

/// The persisted secret unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vault {
    /// Encrypted payload; empty if never encrypted.
    pub data: Vec<u8>,
    /// Owners the payload is (or should be) encrypted for.
    pub owners: Vec<Owner>,
    /// Checksum of the owners current when `data` was last produced.
    pub owners_checksum: Vec<u8>,
    /// Wrapped data key per method, in the order they were produced.
    pub ciphers: OrderedMap<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
struct Schema {
    #[serde(default)]
    data: String,
    #[serde(default)]
    owners: Vec<Owner>,
    #[serde(default)]
    meta: OrderedMap<String>,
}

/// Serialize a vault to its envelope text.
///
/// # Errors
///
/// Returns `EnvelopeError::Json` if serialization fails.
pub fn marshal(vault: &Vault) -> Result<Vec<u8>, EnvelopeError> {
    let mut meta = OrderedMap::new();
    meta.insert(OWNERS_CHECKSUM_FIELD, STANDARD.encode(&vault.owners_checksum));
    for (method, blob) in vault.ciphers.iter() {
        meta.insert(
            format!("{}{}", method, CIPHER_FIELD_SUFFIX),
            STANDARD.encode(blob),
        );
    }

    let schema = Schema {
        data: STANDARD.encode(&vault.data),
        owners: vault.owners.clone(),
        meta,
    };

    let mut out = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    schema.serialize(&mut ser)?;
    out.push(b'\n');

    trace!(bytes = out.len(), ciphers = vault.ciphers.len(), "marshalled envelope");
    Ok(out)
}

/// Parse envelope text into a vault.
///
/// Missing fields default to empty. Meta entries that are neither the
/// checksum nor a `<method>_cipher` field are ignored.
///
/// # Errors
///
/// Returns `EnvelopeError::Json` for malformed JSON (including duplicate
/// keys) and `EnvelopeError::Field` naming the field whose base64 is invalid.
pub fn unmarshal(bytes: &[u8]) -> Result<Vault, EnvelopeError> {
    let schema: Schema = serde_json::from_slice(bytes)?;

    let data = decode_field("data", &schema.data)?;
    let owners_checksum = match schema.meta.get(OWNERS_CHECKSUM_FIELD) {
        Some(value) => decode_field(OWNERS_CHECKSUM_FIELD, value)?,
        None => Vec::new(),
    };

    let mut ciphers = OrderedMap::new();
    for (key, value) in schema.meta.iter() {
        let Some(method) = key.strip_suffix(CIPHER_FIELD_SUFFIX) else {
            continue;
        };
        if method.is_empty() {
            continue;
        }
        ciphers.insert(method, decode_field(key, value)?);
    }

    trace!(
        data_len = data.len(),
        owners = schema.owners.len(),
        ciphers = ciphers.len(),
        "unmarshalled envelope"
    );

    Ok(Vault {
        data,
        owners: schema.owners,
        owners_checksum,
        ciphers,
    })
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(value)
        .map_err(|source| EnvelopeError::Field {
            field: field.to_string(),
            source,
        })
}
