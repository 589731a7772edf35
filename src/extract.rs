//! 响应内容提取：按优先级尝试历史上出现过的几种消息形态
//!
//! 厂商响应形态随版本演变（content parts / output_text / output[] /
//! choices[0].message）。每种形态是一个纯函数策略，按序尝试，首个命中即
//! 采用，避免层层嵌套的条件分支，后续形态新增时只需加一个策略。

use serde_json::Value;

/// 提取结果：正文、按原顺序收集的引用、是否带标注
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub citations: Vec<String>,
    pub annotated: bool,
}

type Strategy = fn(&Value) -> Option<Extracted>;

/// 优先级从高到低
const STRATEGIES: [Strategy; 4] = [
    from_content_parts,
    from_output_text,
    from_output_array,
    from_chat_choices,
];

/// 对原始消息 content JSON 依次尝试各策略
pub fn extract_content(raw: &Value) -> Option<Extracted> {
    STRATEGIES.iter().find_map(|s| s(raw))
}

/// 现行 Assistants 形态：[{type:"text", text:{value, annotations[]}}]
/// 多个 text part 按顺序拼接
fn from_content_parts(raw: &Value) -> Option<Extracted> {
    let parts = raw.as_array()?;
    let mut out = Extracted::default();
    let mut matched = false;

    for part in parts {
        if part.get("type").and_then(|t| t.as_str()) != Some("text") {
            continue;
        }
        let Some(text) = part.get("text") else {
            continue;
        };
        matched = true;
        if let Some(value) = text.get("value").and_then(|v| v.as_str()) {
            out.text.push_str(value);
        }
        if let Some(annotations) = text.get("annotations").and_then(|a| a.as_array()) {
            if !annotations.is_empty() {
                out.annotated = true;
            }
            for ann in annotations {
                if let Some(c) = citation_label(ann) {
                    out.citations.push(c);
                }
            }
        }
    }

    matched.then_some(out)
}

/// 标注转引用标签：优先标注原文，退回 file_citation 的文件 ID
fn citation_label(ann: &Value) -> Option<String> {
    if ann.get("type").and_then(|t| t.as_str()) != Some("file_citation") {
        return None;
    }
    if let Some(text) = ann.get("text").and_then(|t| t.as_str()) {
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    ann.get("file_citation")
        .and_then(|fc| fc.get("file_id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

/// 早期 Responses 形态：{"output_text": "..."}
fn from_output_text(raw: &Value) -> Option<Extracted> {
    let text = raw.get("output_text")?.as_str()?;
    Some(Extracted {
        text: text.to_string(),
        ..Default::default()
    })
}

/// {"output": [...]} 形态：元素为字符串或带 text 字段的对象
fn from_output_array(raw: &Value) -> Option<Extracted> {
    let items = raw.get("output")?.as_array()?;
    let mut text = String::new();
    for item in items {
        if let Some(s) = item.as_str() {
            text.push_str(s);
        } else if let Some(s) = item.get("text").and_then(|t| t.as_str()) {
            text.push_str(s);
        }
    }
    Some(Extracted {
        text,
        ..Default::default()
    })
}

/// Chat Completions 形态：choices[0].message.content
fn from_chat_choices(raw: &Value) -> Option<Extracted> {
    let content = raw
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;
    Some(Extracted {
        text: content.to_string(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_parts_concatenated_in_order() {
        let raw = json!([
            {"type": "text", "text": {"value": "Hello, ", "annotations": []}},
            {"type": "image_file", "image_file": {"file_id": "f1"}},
            {"type": "text", "text": {"value": "world.", "annotations": []}}
        ]);
        let e = extract_content(&raw).unwrap();
        assert_eq!(e.text, "Hello, world.");
        assert!(!e.annotated);
        assert!(e.citations.is_empty());
    }

    #[test]
    fn test_content_parts_collect_citations() {
        let raw = json!([
            {"type": "text", "text": {
                "value": "Fact【1】",
                "annotations": [
                    {"type": "file_citation", "text": "【1】", "file_citation": {"file_id": "file_a"}},
                    {"type": "file_citation", "text": "", "file_citation": {"file_id": "file_b"}},
                    {"type": "file_path", "file_path": {"file_id": "file_c"}}
                ]
            }}
        ]);
        let e = extract_content(&raw).unwrap();
        assert!(e.annotated);
        assert_eq!(e.citations, vec!["【1】", "file_b"]);
    }

    #[test]
    fn test_output_text_shape() {
        let raw = json!({"output_text": "plain answer"});
        assert_eq!(extract_content(&raw).unwrap().text, "plain answer");
    }

    #[test]
    fn test_output_array_shape() {
        let raw = json!({"output": ["a", {"text": "b"}, {"other": 1}]});
        assert_eq!(extract_content(&raw).unwrap().text, "ab");
    }

    #[test]
    fn test_chat_choices_shape() {
        let raw = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(extract_content(&raw).unwrap().text, "hi");
    }

    #[test]
    fn test_parts_take_priority_over_other_shapes() {
        // content parts 命中后不再看其余字段
        let raw = json!([
            {"type": "text", "text": {"value": "from parts"}}
        ]);
        assert_eq!(extract_content(&raw).unwrap().text, "from parts");
    }

    #[test]
    fn test_unrecognized_shape_yields_none() {
        assert!(extract_content(&json!({"foo": "bar"})).is_none());
        assert!(extract_content(&json!(null)).is_none());
    }
}
