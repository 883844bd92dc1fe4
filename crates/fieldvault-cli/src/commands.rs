//! Subcommand definitions and their execution against a settings source.

use std::io::{Read, Write};

use anyhow::{Context, Result};
use clap::Subcommand;
use fieldvault::{ConfiguredKeyRing, FieldVault, SettingsSource};
use serde::Serialize;
use serde_json::Value;

use crate::output::{InspectOutput, KeyRingSummary};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Encrypt a value under the current (or given) key version
    Encrypt {
        /// Plaintext to encrypt
        value: String,

        /// Key version to encrypt under (defaults to the current key id)
        #[arg(short, long)]
        key_version: Option<String>,
    },

    /// Decrypt a stored value
    Decrypt {
        /// Value in `{version}:{nonce}:{ciphertext}:{tag}` form
        value: String,
    },

    /// Re-encrypt a stored value under another key version
    Rotate {
        /// Value to rotate
        value: String,

        /// Target key version
        #[arg(long)]
        to: String,
    },

    /// Compute the search token for a value
    Token {
        /// Value to tokenise
        value: String,
    },

    /// Encrypt a value and compute its search token (JSON output)
    Protect {
        /// Plaintext to protect
        value: String,
    },

    /// Report whether a value is encrypted and under which version (JSON output)
    Inspect {
        /// Stored value
        value: String,
    },

    /// Rotate fields of a JSON array of records read from stdin
    RotateRecords {
        /// Target key version
        #[arg(long)]
        to: String,

        /// Field path to rotate; repeatable (`email`, `contact.phone`, `phones[].number`)
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
    },

    /// Summarise the configured key ring without revealing key material (JSON output)
    Keys,
}

/// Execute `command`, reading keys and salt from `source`.
///
/// `input` is only read by `rotate-records`.
pub fn run<S, R, W>(command: Command, source: S, input: R, output: &mut W) -> Result<()>
where
    S: SettingsSource + Clone,
    R: Read,
    W: Write,
{
    let vault = FieldVault::from_settings(source.clone());
    let cipher = vault.cipher();

    match command {
        Command::Encrypt { value, key_version } => {
            let encrypted = match key_version {
                Some(version) => cipher.encrypt_with_version(&value, &version),
                None => cipher.encrypt(&value),
            }
            .context("failed to encrypt value")?;
            writeln!(output, "{encrypted}")?;
        }
        Command::Decrypt { value } => {
            let plaintext = cipher.decrypt(&value).context("failed to decrypt value")?;
            writeln!(output, "{plaintext}")?;
        }
        Command::Rotate { value, to } => {
            let rotated = cipher.rotate(&value, &to).context("failed to rotate value")?;
            writeln!(output, "{rotated}")?;
        }
        Command::Token { value } => {
            let token = vault
                .search_token(&value)
                .context("failed to compute search token")?;
            writeln!(output, "{token}")?;
        }
        Command::Protect { value } => {
            let protected = vault.protect(&value).context("failed to protect value")?;
            write_json(output, &protected)?;
        }
        Command::Inspect { value } => {
            write_json(output, &InspectOutput::of(&value))?;
        }
        Command::RotateRecords { to, fields } => {
            let records: Vec<Value> = serde_json::from_reader(input)
                .context("stdin must contain a JSON array of records")?;
            let batch = cipher
                .batch_rotate(&records, fields.as_slice(), &to)
                .context("batch rotation failed")?;
            write_json(output, &batch.records)?;
        }
        Command::Keys => {
            let resolution = ConfiguredKeyRing::new(source)
                .resolve()
                .context("failed to resolve key ring")?;
            write_json(output, &KeyRingSummary::from(&resolution))?;
        }
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(output: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, value).context("failed to write JSON output")?;
    writeln!(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use fieldvault::config::{Settings, KEYS, SEARCH_SALT};
    use fieldvault::{version_of, ProtectedValue};
    use serde_json::json;

    use super::*;

    fn settings() -> Settings {
        Settings::new()
            .with(KEYS, format!("v1:{},v2:{}", "11".repeat(32), "22".repeat(32)))
            .with(SEARCH_SALT, "pepper")
    }

    fn exec(command: Command, input: &str) -> Result<String> {
        let mut out = Vec::new();
        run(command, settings(), input.as_bytes(), &mut out)?;
        Ok(String::from_utf8(out).unwrap().trim_end().to_owned())
    }

    fn encrypt(value: &str, version: Option<&str>) -> String {
        exec(
            Command::Encrypt {
                value: value.into(),
                key_version: version.map(str::to_owned),
            },
            "",
        )
        .unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let encrypted = encrypt("hello", None);
        assert_eq!(version_of(&encrypted), Some("v1"));
        let plaintext = exec(Command::Decrypt { value: encrypted }, "").unwrap();
        assert_eq!(plaintext, "hello");
    }

    #[test]
    fn encrypt_with_explicit_version() {
        assert_eq!(version_of(&encrypt("x", Some("v2"))), Some("v2"));
    }

    #[test]
    fn rotate_command() {
        let encrypted = encrypt("moving", None);
        let rotated = exec(
            Command::Rotate {
                value: encrypted,
                to: "v2".into(),
            },
            "",
        )
        .unwrap();
        assert_eq!(version_of(&rotated), Some("v2"));
    }

    #[test]
    fn decrypt_garbage_fails() {
        let err = exec(
            Command::Decrypt {
                value: "garbage".into(),
            },
            "",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("failed to decrypt value"));
    }

    #[test]
    fn token_and_protect_agree() {
        let token = exec(
            Command::Token {
                value: "A@B.COM".into(),
            },
            "",
        )
        .unwrap();
        let protected: ProtectedValue = serde_json::from_str(
            &exec(
                Command::Protect {
                    value: "a@b.com".into(),
                },
                "",
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(token.len(), 64);
        assert_eq!(protected.search_token, token);
    }

    #[test]
    fn inspect_outputs_json() {
        let out = exec(
            Command::Inspect {
                value: "plain".into(),
            },
            "",
        )
        .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!({"encrypted": false, "version": null}));
    }

    #[test]
    fn rotate_records_from_stdin() {
        let records = json!([
            {"email": encrypt("a@b.c", Some("v1")), "name": "A"},
            {"email": "legacy"}
        ]);
        let out = exec(
            Command::RotateRecords {
                to: "v2".into(),
                fields: vec!["email".into()],
            },
            &records.to_string(),
        )
        .unwrap();
        let rotated: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(version_of(rotated[0]["email"].as_str().unwrap()), Some("v2"));
        assert_eq!(rotated[0]["name"], "A");
        assert_eq!(rotated[1]["email"], "legacy");
    }

    #[test]
    fn rotate_records_rejects_non_array() {
        let err = exec(
            Command::RotateRecords {
                to: "v2".into(),
                fields: vec!["email".into()],
            },
            "{\"email\": 1}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn keys_summary() {
        let out = exec(Command::Keys, "").unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["default_version"], "v1");
        assert_eq!(v["default_usable"], true);
        assert_eq!(v["keys"].as_array().unwrap().len(), 2);
        assert!(!out.contains(&"11".repeat(32)));
    }
}
