//! ASCII status codes carried on outgoing rejection and finalization
//! messages. Every constant is at most
//! [`accounts_constants::STATUS_CODE_MAX_LEN`] bytes, enforced by the test
//! at the bottom of this file: the wire format has no room for anything
//! longer.

/// `FinalizedTransfer.status_code` meaning the commit succeeded.
pub const OK: &str = "OK";

// --- Configuration rejections (RejectedConfig.status_code) ----------------

pub const INVALID_CONFIG: &str = "INVALID_CONFIG";

pub const INVALID_NEGLIGIBLE_AMOUNT: &str = "INVALID_NEGLIGIBLE_AMOUNT";

pub const INVALID_RATE: &str = "INVALID_RATE";

// --- Transfer preparation rejections (RejectedTransfer.status_code) -------

pub const NO_SENDER: &str = "NO_SENDER";

pub const SENDER_SCHEDULED_FOR_DELETION: &str = "SENDER_SCHEDULED_FOR_DELETION";

pub const RECIPIENT_UNREACHABLE: &str = "RECIPIENT_UNREACHABLE";

pub const RECIPIENT_SAME_AS_SENDER: &str = "RECIPIENT_SAME_AS_SENDER";

pub const INSUFFICIENT_AVAILABLE_AMOUNT: &str = "INSUFFICIENT_AVAILABLE_AMOUNT";

pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

// --- Transfer commit failures (FinalizedTransfer.status_code) -------------

pub const TIMEOUT: &str = "TIMEOUT";

pub const NEWER_INTEREST_RATE: &str = "NEWER_INTEREST_RATE";

#[cfg(test)]
mod tests {
    use super::*;
    use accounts_constants::STATUS_CODE_MAX_LEN;

    const ALL: &[&str] = &[
        OK,
        INVALID_CONFIG,
        INVALID_NEGLIGIBLE_AMOUNT,
        INVALID_RATE,
        NO_SENDER,
        SENDER_SCHEDULED_FOR_DELETION,
        RECIPIENT_UNREACHABLE,
        RECIPIENT_SAME_AS_SENDER,
        INSUFFICIENT_AVAILABLE_AMOUNT,
        INVALID_REQUEST,
        TIMEOUT,
        NEWER_INTEREST_RATE,
    ];

    #[test]
    fn status_codes_fit_wire_budget() {
        for code in ALL {
            assert!(code.len() <= STATUS_CODE_MAX_LEN, "{code} too long");
            assert!(code.is_ascii(), "{code} not ASCII");
        }
    }
}
