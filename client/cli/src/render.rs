//! Plain-text rendering for the line-oriented surface

use experience_client_core::{Experience, Message, MessageRole, ToolActivity};

/// What a line of user input asks for
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// `/quit` or `/exit`
    Quit,
    /// `/clear`: forget the conversation
    Clear,
    /// Anything else is a chat turn
    Turn(String),
}

/// Classify one input line
pub fn parse_input(line: &str) -> Input {
    match line.trim() {
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        _ => Input::Turn(line.to_string()),
    }
}

/// One finalized message
pub fn message(message: &Message) -> String {
    let who = match message.role() {
        MessageRole::User => "tú",
        MessageRole::Assistant => "asistente",
    };
    format!("[{who}] {}", message.content())
}

/// One experience as a single line
pub fn experience(experience: &Experience) -> String {
    let mut line = format!("  • {}", experience.name);
    if !experience.location.is_empty() {
        line.push_str(&format!(" ({})", experience.location));
    }
    if let Some(ref duration) = experience.duration {
        line.push_str(&format!(" · {duration}"));
    }
    if let Some((lat, lon)) = experience.coordinates() {
        line.push_str(&format!(" @ {lat:.4},{lon:.4}"));
    }
    line
}

/// Current tool activity
pub fn tool(activity: &ToolActivity) -> String {
    match activity.tool {
        Some(ref name) => format!("… {} [{name}]", activity.message),
        None => format!("… {}", activity.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("  /exit "), Input::Quit);
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(
            parse_input("Cenotes cerca de Tulum"),
            Input::Turn("Cenotes cerca de Tulum".to_string())
        );
    }

    #[test]
    fn test_experience_line() {
        let mut e = Experience::new("e1", "Cenote X").with_coordinates(20.2, -87.4);
        e.location = "Tulum".to_string();
        e.duration = Some("3 horas".to_string());

        assert_eq!(
            experience(&e),
            "  • Cenote X (Tulum) · 3 horas @ 20.2000,-87.4000"
        );
    }

    #[test]
    fn test_experience_line_minimal() {
        assert_eq!(experience(&Experience::new("e2", "Ruinas")), "  • Ruinas");
    }

    #[test]
    fn test_tool_line() {
        let activity = ToolActivity {
            message: "Buscando experiencias...".to_string(),
            tool: Some("search_experiences".to_string()),
        };
        assert_eq!(
            tool(&activity),
            "… Buscando experiencias... [search_experiences]"
        );
    }
}
