//! AES-256-GCM field encryption primitives.
//!
//! This module has no knowledge of where keys come from beyond the
//! [`KeyRingProvider`](crate::keyring::KeyRingProvider) it is given.
//!
//! # Ciphertext format
//!
//! ```text
//! v1:<hex(nonce)>:<hex(ciphertext)>:<hex(tag)>
//! ```
//!
//! The version prefix names the key used, enabling rotation without breaking
//! existing ciphertext.

pub mod cipher;
pub mod codec;

pub use cipher::FieldCipher;
pub use codec::{is_encrypted, version_of, EncryptedField, NONCE_LEN, TAG_LEN};
