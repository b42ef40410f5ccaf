use serde_json::{json, Value};

/// Outcome of one tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolResult {
    Success { payload: Value },
    Failure { error: String, message: Option<String> },
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        ToolResult::Success { payload }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult::Failure {
            error: error.into(),
            message: None,
        }
    }

    /// Attaches a human-readable summary to a failure; successes are unchanged.
    pub fn with_message(self, text: impl Into<String>) -> Self {
        match self {
            ToolResult::Failure { error, .. } => ToolResult::Failure {
                error,
                message: Some(text.into()),
            },
            success => success,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    /// JSON shape sent over the wire. Failures always carry `success: false`.
    pub fn to_wire(&self) -> Value {
        match self {
            ToolResult::Success { payload } => payload.clone(),
            ToolResult::Failure { error, message } => {
                let mut wire = json!({
                    "success": false,
                    "error": error,
                });
                if let Some(message) = message {
                    wire["message"] = Value::String(message.clone());
                }
                wire
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_wire_shape() {
        let wire = ToolResult::failure("browser crashed").to_wire();
        assert_eq!(wire, json!({"success": false, "error": "browser crashed"}));
    }

    #[test]
    fn failure_message_is_carried_on_the_wire() {
        let wire = ToolResult::failure("timeout")
            .with_message("Error retrieving forecast: timeout")
            .to_wire();
        assert_eq!(
            wire,
            json!({"success": false, "error": "timeout", "message": "Error retrieving forecast: timeout"})
        );
    }

    #[test]
    fn success_wire_is_payload() {
        let payload = json!({"success": true, "weather_data": "Sunny"});
        assert_eq!(ToolResult::success(payload.clone()).to_wire(), payload);
    }
}
