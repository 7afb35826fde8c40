//! Interpretation of `/chat` response bodies

use serde::Deserialize;
use serde_json::Value;

/// What the widget shows for a successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReply {
    /// A recognized reply string
    Reply { text: String, tool: Option<String> },
    /// Unrecognized shape, serialized verbatim
    Raw(String),
}

#[derive(Deserialize)]
struct ReplyEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    reply: String,
    tool: Option<String>,
}

/// Map a response body to the text shown in the agent bubble.
///
/// A string `reply` is recognized when `type` is absent, `"reply"` or
/// `"final"`. Anything else is rendered as compact JSON so no response is
/// dropped.
pub fn interpret(body: &Value) -> AgentReply {
    if let Ok(envelope) = ReplyEnvelope::deserialize(body) {
        match envelope.kind.as_deref() {
            None | Some("reply") => {
                return AgentReply::Reply {
                    text: envelope.reply,
                    tool: None,
                };
            }
            Some("final") => {
                return AgentReply::Reply {
                    text: envelope.reply,
                    tool: envelope.tool,
                };
            }
            Some(_) => {}
        }
    }

    AgentReply::Raw(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_reply_field() {
        let reply = interpret(&json!({"reply": "Try Manali in February"}));
        assert_eq!(
            reply,
            AgentReply::Reply {
                text: "Try Manali in February".to_string(),
                tool: None
            }
        );
    }

    #[test]
    fn test_typed_reply() {
        let reply = interpret(&json!({"type": "reply", "reply": "Which dates?"}));
        assert_eq!(
            reply,
            AgentReply::Reply {
                text: "Which dates?".to_string(),
                tool: None
            }
        );
    }

    #[test]
    fn test_final_reply_keeps_tool() {
        let body = json!({
            "type": "final",
            "reply": "Day 1: Solang Valley",
            "tool": "generate_itinerary",
            "tool_output": {"days": []}
        });
        assert_eq!(
            interpret(&body),
            AgentReply::Reply {
                text: "Day 1: Solang Valley".to_string(),
                tool: Some("generate_itinerary".to_string())
            }
        );
    }

    #[test]
    fn test_unknown_discriminator_falls_back() {
        let body = json!({"type": "clarify", "reply": "?"});
        let AgentReply::Raw(text) = interpret(&body) else {
            panic!("expected raw fallback");
        };
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_unrecognized_shape_round_trips() {
        let body = json!({"status": "ok"});
        let reply = interpret(&body);
        assert_eq!(reply, AgentReply::Raw(r#"{"status":"ok"}"#.to_string()));
    }

    #[test]
    fn test_non_string_reply_falls_back() {
        let body = json!({"type": "reply", "reply": null});
        assert!(matches!(interpret(&body), AgentReply::Raw(_)));

        let body = json!(["a", "b"]);
        assert_eq!(interpret(&body), AgentReply::Raw(r#"["a","b"]"#.to_string()));
    }
}
