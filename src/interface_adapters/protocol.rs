// Wire protocol: the JSON shape of a server-to-client envelope. Client-to-
// server payloads are opaque and never parsed here (see §6 of the relay
// contract); only server emissions get a DTO.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use crate::domain::{Envelope, Intent};

#[derive(Debug, Clone, Copy, Serialize)]
pub enum IntentDto {
    Welcome,
    Receipt,
    Peer,
    Joiner,
    Leaver,
}

impl From<Intent> for IntentDto {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Welcome => IntentDto::Welcome,
            Intent::Receipt => IntentDto::Receipt,
            Intent::Peer => IntentDto::Peer,
            Intent::Joiner => IntentDto::Joiner,
            Intent::Leaver => IntentDto::Leaver,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvelopeDto {
    #[serde(rename = "Intent")]
    pub intent: IntentDto,
    #[serde(rename = "From")]
    pub from: Vec<String>,
    #[serde(rename = "To")]
    pub to: Vec<String>,
    #[serde(rename = "Num")]
    pub num: u64,
    #[serde(rename = "Time")]
    pub time: u64,
    #[serde(rename = "Body", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<&Envelope> for EnvelopeDto {
    fn from(env: &Envelope) -> Self {
        EnvelopeDto {
            intent: env.intent.into(),
            from: env.from.clone(),
            to: env.to.clone(),
            num: env.num,
            time: env.time_ms,
            body: env.body.as_ref().map(|b| STANDARD.encode(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_base64_encoded_and_omitted_when_absent() {
        let welcome = Envelope::welcome(vec![], "a".into(), 0, 0);
        let dto = EnvelopeDto::from(&welcome);
        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("Body"));

        let receipt = Envelope::receipt("a".into(), 1, 0, b"hi".to_vec());
        let dto = EnvelopeDto::from(&receipt);
        assert_eq!(dto.body.as_deref(), Some("aGk="));
    }

    #[test]
    fn field_names_match_the_wire_contract() {
        let welcome = Envelope::welcome(vec!["b".into()], "a".into(), 2, 100);
        let json = serde_json::to_value(EnvelopeDto::from(&welcome)).unwrap();
        for key in ["Intent", "From", "To", "Num", "Time"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
