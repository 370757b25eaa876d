use std::fmt;

use serde_json::{Map, Value};

use super::schema::{FieldSpec, CC_FIELDS, FM_FIELDS, HC_FIELDS, SM_FIELDS};

type Body = Map<String, Value>;

/// Telemetry message types the decoder knows how to lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Fm,
    Cc,
    Hc,
    Sm,
}

impl MessageType {
    /// Detection order used when a payload carries several type keys.
    pub const PRIORITY: [MessageType; 4] = [
        MessageType::Fm,
        MessageType::Cc,
        MessageType::Hc,
        MessageType::Sm,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MessageType::Fm => "fm",
            MessageType::Cc => "cc",
            MessageType::Hc => "hc",
            MessageType::Sm => "sm",
        }
    }

    /// Known type for a query tag, matched case-sensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|t| t.tag() == tag)
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            MessageType::Fm => FM_FIELDS,
            MessageType::Cc => CC_FIELDS,
            MessageType::Hc => HC_FIELDS,
            MessageType::Sm => SM_FIELDS,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A decoded payload classified by its message type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryPayload<'a> {
    Fm(&'a Body),
    Cc(&'a Body),
    Hc(&'a Body),
    Sm(&'a Body),
    Unknown,
}

impl<'a> TelemetryPayload<'a> {
    /// Picks the first known type, in [`MessageType::PRIORITY`] order, whose
    /// key holds an object.
    pub fn classify(payload: Option<&'a Body>) -> Self {
        let Some(payload) = payload else {
            return TelemetryPayload::Unknown;
        };

        MessageType::PRIORITY
            .into_iter()
            .find_map(|ty| match payload.get(ty.tag()) {
                Some(Value::Object(body)) => Some(Self::wrap(ty, body)),
                _ => None,
            })
            .unwrap_or(TelemetryPayload::Unknown)
    }

    fn wrap(ty: MessageType, body: &'a Body) -> Self {
        match ty {
            MessageType::Fm => TelemetryPayload::Fm(body),
            MessageType::Cc => TelemetryPayload::Cc(body),
            MessageType::Hc => TelemetryPayload::Hc(body),
            MessageType::Sm => TelemetryPayload::Sm(body),
        }
    }

    pub fn parts(&self) -> Option<(MessageType, &'a Body)> {
        match *self {
            TelemetryPayload::Fm(body) => Some((MessageType::Fm, body)),
            TelemetryPayload::Cc(body) => Some((MessageType::Cc, body)),
            TelemetryPayload::Hc(body) => Some((MessageType::Hc, body)),
            TelemetryPayload::Sm(body) => Some((MessageType::Sm, body)),
            TelemetryPayload::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn message_type(payload: &Body) -> Option<MessageType> {
        TelemetryPayload::classify(Some(payload)).parts().map(|(ty, _)| ty)
    }

    #[test]
    fn test_priority_order() {
        let payload = object(json!({"sm": {}, "cc": {"cf": 1}, "fm": {}}));
        assert_eq!(message_type(&payload), Some(MessageType::Fm));

        let payload = object(json!({"sm": {}, "hc": {}}));
        assert_eq!(
            message_type(&payload),
            Some(MessageType::Hc)
        );
    }

    #[test]
    fn test_unknown_shapes() {
        let payload = object(json!({"xx": {}}));
        assert_eq!(TelemetryPayload::classify(Some(&payload)), TelemetryPayload::Unknown);
        assert_eq!(TelemetryPayload::classify(None), TelemetryPayload::Unknown);

        // a type key that does not hold an object is not that type
        let payload = object(json!({"fm": 3, "cc": {}}));
        assert_eq!(
            message_type(&payload),
            Some(MessageType::Cc)
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(MessageType::from_tag("sm"), Some(MessageType::Sm));
        assert_eq!(MessageType::from_tag("SM"), None);
        assert_eq!(MessageType::Cc.to_string(), "cc");
    }
}
