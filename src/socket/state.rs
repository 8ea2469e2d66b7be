use std::fmt;

/// TCP connection state as reported by the kernel socket table.
///
/// Discriminants match the kernel's `TCP_*` constants in `include/net/tcp_states.h`.
/// Any code outside the mapped range collapses into [`TcpState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TcpState {
    Unknown = 0,
    Established = 1,
    SynSent = 2,
    SynRecv = 3,
    FinWait1 = 4,
    FinWait2 = 5,
    TimeWait = 6,
    Close = 7,
    CloseWait = 8,
    LastAck = 9,
    Listen = 10,
    Closing = 11,
}

impl TcpState {
    /// Maps a raw kernel state code to a state. Never fails.
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Established,
            2 => Self::SynSent,
            3 => Self::SynRecv,
            4 => Self::FinWait1,
            5 => Self::FinWait2,
            6 => Self::TimeWait,
            7 => Self::Close,
            8 => Self::CloseWait,
            9 => Self::LastAck,
            10 => Self::Listen,
            11 => Self::Closing,
            _ => Self::Unknown,
        }
    }

    /// Returns the label value used in exported metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
        }
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_mapped_range() {
        let expected = [
            "ESTABLISHED",
            "SYN_SENT",
            "SYN_RECV",
            "FIN_WAIT1",
            "FIN_WAIT2",
            "TIME_WAIT",
            "CLOSE",
            "CLOSE_WAIT",
            "LAST_ACK",
            "LISTEN",
            "CLOSING",
        ];

        for (code, name) in (1..=11i64).zip(expected) {
            let state = TcpState::from_code(code);
            assert_eq!(state.as_str(), name, "code {code}");
            assert_eq!(state as i64, code);
        }
    }

    #[test]
    fn test_from_code_unmapped_is_unknown() {
        for code in [0, -1, 12, 13, 255, i64::MIN, i64::MAX] {
            assert_eq!(TcpState::from_code(code), TcpState::Unknown, "code {code}");
        }
    }

    #[test]
    fn test_from_code_is_deterministic() {
        for code in -5..20 {
            assert_eq!(TcpState::from_code(code), TcpState::from_code(code));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TcpState::TimeWait), "TIME_WAIT");
        assert_eq!(TcpState::Unknown.to_string(), "UNKNOWN");
    }
}
