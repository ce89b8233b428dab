use extendo_core_models::{ConversationEvent, ConversationPayload};
use serde_json::Value;

const GENERIC_TITLES: [&str; 4] = ["New chat", "Google Gemini", "Gemini Conversation", "Chats"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayloadQuality {
    pub has_user_prompt: bool,
    pub has_assistant_text: bool,
    /// Informational only, never blocks persistence.
    pub generic_title: bool,
    pub title: String,
    pub ready_for_persist: bool,
}

pub fn evaluate_quality(payload: &ConversationPayload) -> PayloadQuality {
    let title = payload
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let mut has_user_prompt = false;
    let mut has_assistant_text = false;
    if let Some(Value::Object(mapping)) = payload.get("mapping") {
        for node in mapping.values() {
            if node_text(node).is_empty() {
                continue;
            }
            match node_role(node) {
                Some("user") => has_user_prompt = true,
                Some("assistant") => has_assistant_text = true,
                _ => {}
            }
            if has_user_prompt && has_assistant_text {
                break;
            }
        }
    }

    PayloadQuality {
        has_user_prompt,
        has_assistant_text,
        generic_title: title.is_empty() || GENERIC_TITLES.contains(&title.as_str()),
        title,
        ready_for_persist: has_user_prompt && has_assistant_text,
    }
}

/// Absent capture metadata is trusted; explicit metadata must claim a complete
/// high-fidelity capture from the canonical API.
pub fn is_canonical_capture_meta(event: &ConversationEvent) -> bool {
    event
        .capture_meta
        .as_ref()
        .map_or(true, |meta| meta.is_canonical())
}

fn node_role(node: &Value) -> Option<&str> {
    node.pointer("/message/author/role").and_then(Value::as_str)
}

fn node_text(node: &Value) -> String {
    let Some(content) = node.pointer("/message/content").filter(|c| c.is_object()) else {
        return String::new();
    };

    if let Some(Value::Array(parts)) = content.get("parts") {
        let joined = parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let joined = joined.trim();
        if !joined.is_empty() {
            return joined.to_string();
        }
    }

    content
        .get("content")
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extendo_core_models::{CaptureMeta, Completeness, ConversationEventType, Fidelity};
    use serde_json::json;

    fn payload(value: Value) -> ConversationPayload {
        value.as_object().cloned().expect("object payload")
    }

    fn turn(role: &str, parts: Value) -> Value {
        json!({"message": {"author": {"role": role}, "content": {"parts": parts}}})
    }

    #[test]
    fn needs_user_and_assistant_turns() {
        let ready = evaluate_quality(&payload(json!({
            "title": "Tafsir notes",
            "mapping": {
                "root": {"message": null},
                "u": turn("user", json!(["What is this?"])),
                "a": turn("assistant", json!(["An answer", 7])),
            }
        })));
        assert!(ready.ready_for_persist);
        assert!(!ready.generic_title);
        assert_eq!(ready.title, "Tafsir notes");

        let user_only = evaluate_quality(&payload(json!({
            "title": "x",
            "mapping": {"u": turn("user", json!(["hi"])), "a": turn("assistant", json!(["   "]))}
        })));
        assert!(user_only.has_user_prompt);
        assert!(!user_only.has_assistant_text);
        assert!(!user_only.ready_for_persist);
    }

    #[test]
    fn falls_back_to_flat_content() {
        let quality = evaluate_quality(&payload(json!({
            "mapping": {
                "u": {"message": {"author": {"role": "user"}, "content": {"content": "prompt"}}},
                "a": {"message": {"author": {"role": "assistant"}, "content": {"parts": [], "content": "reply"}}},
            }
        })));
        assert!(quality.ready_for_persist);
        assert!(quality.generic_title);
        assert_eq!(quality.title, "");
    }

    #[test]
    fn generic_titles_are_flagged_but_not_blocking() {
        let quality = evaluate_quality(&payload(json!({
            "title": " New chat ",
            "mapping": {"u": turn("user", json!(["q"])), "a": turn("assistant", json!(["a"]))}
        })));
        assert!(quality.generic_title);
        assert!(quality.ready_for_persist);
    }

    #[test]
    fn missing_mapping_is_not_ready() {
        let quality = evaluate_quality(&payload(json!({"title": "t", "mapping": "nope"})));
        assert!(!quality.ready_for_persist);
    }

    #[test]
    fn capture_meta_must_be_absent_or_canonical() {
        let mut event = ConversationEvent {
            api: "blackiya.events.v1".into(),
            event_type: ConversationEventType::Ready,
            event_id: "e".into(),
            conversation_id: "c".into(),
            payload: ConversationPayload::new(),
            capture_meta: None,
            content_hash: None,
        };
        assert!(is_canonical_capture_meta(&event));

        event.capture_meta = Some(CaptureMeta::canonical());
        assert!(is_canonical_capture_meta(&event));

        let mut degraded = CaptureMeta::canonical();
        degraded.fidelity = Some(Fidelity::Degraded);
        event.capture_meta = Some(degraded);
        assert!(!is_canonical_capture_meta(&event));

        event.capture_meta = Some(CaptureMeta {
            completeness: Some(Completeness::Complete),
            ..CaptureMeta::default()
        });
        assert!(!is_canonical_capture_meta(&event));
    }
}
