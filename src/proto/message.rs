use std::fmt;

pub const LED_STATUS: &str = "LED_STATUS";
pub const DATA: &str = "DATA";
pub const ACK: &str = "ACK";
pub const SYSTEM: &str = "SYSTEM";

/// One line from the board, classified by the `TAG:` it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    LedStatus(String),
    Data(String),
    Ack(String),
    SystemNote(String),
    /// No known tag; carries the whole line.
    Unrecognized(String),
}

impl InboundMessage {
    /// Looks for `LED_STATUS:`, `DATA:`, `ACK:`, `SYSTEM:` anywhere in the
    /// line, in that order; the first one found decides the kind. Tags are
    /// case-sensitive. The value is everything after the line's first colon.
    pub fn classify(line: &str) -> Self {
        let line = line.trim();
        let kinds: [(&str, fn(String) -> Self); 4] = [
            (LED_STATUS, InboundMessage::LedStatus),
            (DATA, InboundMessage::Data),
            (ACK, InboundMessage::Ack),
            (SYSTEM, InboundMessage::SystemNote),
        ];
        let matched = kinds
            .iter()
            .find(|(tag, _)| line.contains(&format!("{tag}:")));
        match (matched, line.split_once(':')) {
            (Some((_, make)), Some((_, value))) => make(value.to_string()),
            _ => InboundMessage::Unrecognized(line.to_string()),
        }
    }

    pub fn tag(&self) -> Option<&'static str> {
        match self {
            InboundMessage::LedStatus(_) => Some(LED_STATUS),
            InboundMessage::Data(_) => Some(DATA),
            InboundMessage::Ack(_) => Some(ACK),
            InboundMessage::SystemNote(_) => Some(SYSTEM),
            InboundMessage::Unrecognized(_) => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            InboundMessage::LedStatus(v)
            | InboundMessage::Data(v)
            | InboundMessage::Ack(v)
            | InboundMessage::SystemNote(v)
            | InboundMessage::Unrecognized(v) => v,
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "{}:{}", tag, self.value()),
            None => f.write_str(self.value()),
        }
    }
}

/// Commands we send to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    Data(String),
}

impl OutboundCommand {
    pub fn data(payload: impl Into<String>) -> Self {
        OutboundCommand::Data(payload.into())
    }

    /// A random byte as an 8-digit binary string, e.g. `DATA:01101001`.
    pub fn random_data() -> Self {
        OutboundCommand::Data(format!("{:08b}", rand::random::<u8>()))
    }

    pub fn payload(&self) -> &str {
        match self {
            OutboundCommand::Data(p) => p,
        }
    }

    /// Wire form, newline included.
    pub fn encode(&self) -> String {
        match self {
            OutboundCommand::Data(p) => format!("{DATA}:{p}\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_tags() {
        assert_eq!(
            InboundMessage::classify("DATA:xyz"),
            InboundMessage::Data("xyz".into())
        );
        assert_eq!(
            InboundMessage::classify("SYSTEM:ready"),
            InboundMessage::SystemNote("ready".into())
        );
        assert_eq!(
            InboundMessage::classify("LED_STATUS:green\r"),
            InboundMessage::LedStatus("green".into())
        );
        assert_eq!(
            InboundMessage::classify("ACK:11010010"),
            InboundMessage::Ack("11010010".into())
        );
    }

    #[test]
    fn value_keeps_later_colons() {
        assert_eq!(
            InboundMessage::classify("SYSTEM:wifi:up:ch6"),
            InboundMessage::SystemNote("wifi:up:ch6".into())
        );
        assert_eq!(
            InboundMessage::classify("DATA:"),
            InboundMessage::Data(String::new())
        );
    }

    #[test]
    fn unknown_or_mistyped_tags_are_unrecognized() {
        for line in ["hello world", "data:1", "BOOT:ok", " DATA 1", "Ack:1"] {
            assert_eq!(
                InboundMessage::classify(line),
                InboundMessage::Unrecognized(line.trim().to_string()),
                "line {line:?}"
            );
        }
    }

    #[test]
    fn tag_after_a_prefix_still_counts() {
        assert_eq!(
            InboundMessage::classify("[boot] SYSTEM:ready"),
            InboundMessage::SystemNote("ready".into())
        );
        assert_eq!(
            InboundMessage::classify("I (312) LED_STATUS:green"),
            InboundMessage::LedStatus("green".into())
        );
    }

    #[test]
    fn earlier_tag_in_the_list_wins() {
        assert_eq!(
            InboundMessage::classify("ACK:DATA:1"),
            InboundMessage::Data("DATA:1".into())
        );
        assert_eq!(
            InboundMessage::classify("SYSTEM:LED_STATUS:red"),
            InboundMessage::LedStatus("LED_STATUS:red".into())
        );
    }

    #[test]
    fn display_restores_line() {
        let msg = InboundMessage::classify("LED_STATUS:red");
        assert_eq!(msg.to_string(), "LED_STATUS:red");
        let raw = InboundMessage::classify("rst:0x1 (POWERON_RESET)");
        assert_eq!(raw.to_string(), "rst:0x1 (POWERON_RESET)");
        assert_eq!(raw.tag(), None);
    }

    #[test]
    fn encode_data_command() {
        assert_eq!(OutboundCommand::data("11010010").encode(), "DATA:11010010\n");
    }

    #[test]
    fn random_payload_is_eight_bits() {
        for _ in 0..32 {
            let cmd = OutboundCommand::random_data();
            let p = cmd.payload();
            assert_eq!(p.len(), 8);
            assert!(p.chars().all(|c| c == '0' || c == '1'));
        }
    }
}
