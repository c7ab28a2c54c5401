//! Provider call audit log
//!
//! Every outbound provider call emits exactly one structured record to the
//! dedicated `curio_audit` tracing target, on every code path: success,
//! transport failure, empty result, and timeout alike. Operators route the
//! target to its own sink via the subscriber's `EnvFilter`.

use uuid::Uuid;

/// Maximum length of an error message carried in an audit record
const ERROR_MESSAGE_LIMIT: usize = 200;

/// Outcome classification for one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// Call succeeded and returned usable data
    Ok,
    /// Call succeeded but carried nothing usable
    Partial,
    /// Call failed (transport, HTTP, parse, or timeout)
    Error,
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Ok => write!(f, "ok"),
            AuditStatus::Partial => write!(f, "partial"),
            AuditStatus::Error => write!(f, "error"),
        }
    }
}

/// One audit record, emitted per provider call regardless of outcome
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub request_id: Uuid,
    pub provider: &'static str,
    /// The calling operation, e.g. "fan_out" or "tiered_resolve"
    pub function: &'static str,
    pub status: AuditStatus,
    pub latency_ms: u64,
    pub http_status: Option<u16>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub inputs_summary: String,
    pub outputs_summary: String,
}

impl AuditRecord {
    /// Emit this record to the audit sink
    pub fn emit(&self) {
        tracing::info!(
            target: "curio_audit",
            request_id = %self.request_id,
            provider = self.provider,
            function = self.function,
            status = %self.status,
            latency_ms = self.latency_ms,
            http_status = self.http_status,
            error_code = self.error_code.as_deref(),
            error_message = self.error_message.as_deref(),
            inputs = %self.inputs_summary,
            outputs = %self.outputs_summary,
            "provider call"
        );
    }
}

/// Truncate an upstream error message to audit-record size
pub fn truncate_error(message: &str) -> String {
    if message.len() <= ERROR_MESSAGE_LIMIT {
        return message.to_string();
    }
    let mut cut = ERROR_MESSAGE_LIMIT;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &message[..cut])
}
