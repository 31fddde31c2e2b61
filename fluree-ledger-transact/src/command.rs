//! Signed command parsing and verification
//!
//! A command travels as `{cmd, sig}` where `cmd` is the canonical JSON
//! command string (the exact bytes that were signed) and `sig` is the
//! recoverable secp256k1 signature. The transaction id is the SHA3-256 of
//! the command bytes; the authority account is recovered from the
//! signature, never looked up.

use crate::error::{Result, TransactError};
use fluree_ledger_crypto::{recover_auth_id, tx_id};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A signed command as received from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedCommand {
    /// Canonical command JSON string (the signed bytes)
    pub cmd: String,
    /// Hex recoverable signature over the command bytes
    pub sig: String,
}

impl SignedCommand {
    pub fn new(cmd: impl Into<String>, sig: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            sig: sig.into(),
        }
    }
}

/// Command kind, from the command's `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandType {
    /// Create a new ledger (genesis bootstrap)
    NewDb,
    /// Transact statements against an existing ledger
    Tx,
}

/// A parsed, signature-verified command.
#[derive(Clone, Debug)]
pub struct VerifiedCommand {
    pub cmd_type: CommandType,
    /// `network/dbid`
    pub db: String,
    /// Transaction statements (`tx` commands only)
    pub statements: Vec<JsonValue>,
    pub nonce: i64,
    pub expire: Option<i64>,
    /// SHA3-256 of the command bytes
    pub tx_id: String,
    /// Recovered authority account id
    pub auth_id: String,
    /// The raw signed command
    pub signed: SignedCommand,
}

/// Parse and signature-check a command.
pub fn verify(signed: &SignedCommand) -> Result<VerifiedCommand> {
    let auth_id = recover_auth_id(signed.cmd.as_bytes(), &signed.sig)
        .map_err(|e| TransactError::InvalidSignature(e.to_string()))?;

    let json: JsonValue = serde_json::from_str(&signed.cmd)
        .map_err(|e| TransactError::invalid_command(format!("command is not JSON: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| TransactError::invalid_command("command must be a JSON object"))?;

    let cmd_type = match obj.get("type").and_then(JsonValue::as_str) {
        Some("new-db") => CommandType::NewDb,
        Some("tx") => CommandType::Tx,
        Some(other) => {
            return Err(TransactError::invalid_command(format!(
                "unknown command type: {}",
                other
            )))
        }
        None => return Err(TransactError::invalid_command("command missing type")),
    };

    let db = obj
        .get("db")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| TransactError::invalid_command("command missing db"))?
        .to_string();
    if db.split('/').count() != 2 {
        return Err(TransactError::invalid_command(format!(
            "db must be network/dbid, got {:?}",
            db
        )));
    }

    let statements = match cmd_type {
        CommandType::Tx => obj
            .get("tx")
            .and_then(JsonValue::as_array)
            .cloned()
            .ok_or_else(|| TransactError::invalid_command("tx command missing tx statements"))?,
        CommandType::NewDb => Vec::new(),
    };

    let nonce = obj.get("nonce").and_then(JsonValue::as_i64).unwrap_or(0);
    let expire = obj.get("expire").and_then(JsonValue::as_i64);

    Ok(VerifiedCommand {
        cmd_type,
        db,
        statements,
        nonce,
        expire,
        tx_id: tx_id(&signed.cmd),
        auth_id,
        signed: signed.clone(),
    })
}

impl VerifiedCommand {
    /// `(network, dbid)` split of the db field.
    pub fn network_dbid(&self) -> (&str, &str) {
        self.db.split_once('/').expect("db validated at parse")
    }

    /// Whether the command expired relative to `now` (wall-clock ms).
    pub fn expired(&self, now: i64) -> bool {
        self.expire.map(|e| now > e).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluree_ledger_crypto::{sign_command, SigningKey};

    fn sign(cmd: &str) -> SignedCommand {
        let key = SigningKey::from_slice(&[3u8; 32]).unwrap();
        SignedCommand::new(cmd, sign_command(cmd.as_bytes(), &key).unwrap())
    }

    #[test]
    fn test_verify_tx_command() {
        let cmd = r#"{"type":"tx","db":"net/db","tx":[{"_id":"person","person/name":"a"}],"nonce":7}"#;
        let verified = verify(&sign(cmd)).unwrap();
        assert_eq!(verified.cmd_type, CommandType::Tx);
        assert_eq!(verified.db, "net/db");
        assert_eq!(verified.network_dbid(), ("net", "db"));
        assert_eq!(verified.statements.len(), 1);
        assert_eq!(verified.nonce, 7);
        assert!(verified.auth_id.starts_with("0x"));
    }

    #[test]
    fn test_verify_new_db_command() {
        let cmd = r#"{"type":"new-db","db":"net/db","nonce":1000,"expire":1000300000}"#;
        let verified = verify(&sign(cmd)).unwrap();
        assert_eq!(verified.cmd_type, CommandType::NewDb);
        assert!(verified.statements.is_empty());
        assert!(!verified.expired(1000));
        assert!(verified.expired(1000300001));
    }

    #[test]
    fn test_bad_signature_rejected() {
        let cmd = r#"{"type":"tx","db":"net/db","tx":[]}"#;
        let signed = SignedCommand::new(cmd, "deadbeef");
        assert!(matches!(
            verify(&signed),
            Err(TransactError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_malformed_commands_rejected() {
        for cmd in [
            "not json",
            r#"{"db":"net/db"}"#,
            r#"{"type":"zap","db":"net/db"}"#,
            r#"{"type":"tx","db":"nodbid","tx":[]}"#,
            r#"{"type":"tx","db":"net/db"}"#,
        ] {
            assert!(verify(&sign(cmd)).is_err(), "accepted: {}", cmd);
        }
    }
}
