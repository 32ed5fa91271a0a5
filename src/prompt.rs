use std::collections::HashMap;

use crate::core::errors::ApiError;
use crate::llm::types::ChatMessage;

/// System-instruction template with `{name}` placeholders. `{{` and `}}`
/// render as literal braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitutes every placeholder. Substitution is total: an unbound
    /// placeholder fails the render instead of leaking a `{marker}` into
    /// the prompt. Bindings without a matching placeholder are ignored.
    pub fn render_text(&self, bindings: &HashMap<&str, String>) -> Result<String, ApiError> {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        out.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(ApiError::MissingPlaceholder(name));
                            }
                        }
                    }
                    match bindings.get(name.as_str()) {
                        Some(value) => out.push_str(value),
                        None => return Err(ApiError::MissingPlaceholder(name)),
                    }
                }
                '}' => {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                    out.push('}');
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

/// Assembles the message sequence fed to the model: rendered system
/// instructions first, then prior turns in order, then the user text.
pub fn render(
    template: &PromptTemplate,
    bindings: &HashMap<&str, String>,
    history: &[ChatMessage],
    user_text: &str,
) -> Result<Vec<ChatMessage>, ApiError> {
    let system = template.render_text(bindings)?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(user_text));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn renders_user_text_verbatim_without_markers() {
        let template = PromptTemplate::new("You answer questions about {table}.");
        let messages = render(
            &template,
            &bindings(&[("table", "MOVIE")]),
            &[],
            "How many entries of records are present?",
        )
        .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "You answer questions about MOVIE.");
        assert_eq!(messages[1].content, "How many entries of records are present?");
        assert!(!messages[0].content.contains('{'));
    }

    #[test]
    fn unbound_placeholder_fails() {
        let template = PromptTemplate::new("Columns: {columns}");
        let err = template.render_text(&HashMap::new()).unwrap_err();
        match err {
            ApiError::MissingPlaceholder(name) => assert_eq!(name, "columns"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn escaped_braces_render_literally() {
        let template = PromptTemplate::new("Output JSON like {{\"topic\": ...}} for {q}.");
        let text = template.render_text(&bindings(&[("q", "anything")])).unwrap();
        assert_eq!(text, "Output JSON like {\"topic\": ...} for anything.");
    }

    #[test]
    fn history_order_is_preserved() {
        let template = PromptTemplate::new("system text");
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
        ];
        let messages = render(&template, &HashMap::new(), &history, "third").unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["system text", "first", "second", "third"]);
    }

    #[test]
    fn extra_bindings_are_ignored() {
        let template = PromptTemplate::new("no placeholders");
        let text = template
            .render_text(&bindings(&[("unused", "value")]))
            .unwrap();
        assert_eq!(text, "no placeholders");
    }
}
