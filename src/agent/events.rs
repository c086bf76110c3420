use std::fmt::Display;

use eventsource_stream::{Event, Eventsource};
use futures::{pin_mut, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::ScanError;

/// Progress reported by the automation agent while a behavior runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    ChainStarted {
        uuid: Option<String>,
    },
    StepStarted,
    StepCompleted,
    TextDelta {
        text: String,
    },
    ToolCall {
        name: String,
    },
    ChainCompleted {
        uuid: Option<String>,
        response: Option<String>,
    },
    ChainError {
        message: String,
    },
    Other {
        event: String,
        kind: String,
    },
}

impl AgentEvent {
    /// Decode one server-sent event. An SSE event named `error` is a gateway
    /// failure; everything else is classified by its JSON `type` field.
    pub fn from_sse(sse: &Event) -> Self {
        let data: Value = match serde_json::from_str(&sse.data) {
            Ok(v) => v,
            Err(_) if sse.event == "error" => {
                return AgentEvent::ChainError {
                    message: sse.data.clone(),
                }
            }
            Err(_) => {
                return AgentEvent::Other {
                    event: sse.event.clone(),
                    kind: "unparsed".into(),
                }
            }
        };

        let text = |v: &Value| v.as_str().map(String::from);

        if sse.event == "error" {
            return AgentEvent::ChainError {
                message: text(&data["message"]).unwrap_or_else(|| sse.data.clone()),
            };
        }

        let kind = data["type"].as_str().unwrap_or_default();
        match kind {
            "chain-started" => AgentEvent::ChainStarted {
                uuid: text(&data["uuid"]),
            },
            "step-started" => AgentEvent::StepStarted,
            "step-completed" => AgentEvent::StepCompleted,
            "text-delta" => AgentEvent::TextDelta {
                text: text(&data["textDelta"]).unwrap_or_default(),
            },
            "tool-call" => AgentEvent::ToolCall {
                name: text(&data["toolName"]).unwrap_or_default(),
            },
            "chain-completed" => AgentEvent::ChainCompleted {
                uuid: text(&data["uuid"]),
                response: text(&data["response"]["text"]),
            },
            "chain-error" => AgentEvent::ChainError {
                message: text(&data["error"]["message"])
                    .unwrap_or_else(|| "agent reported an error".into()),
            },
            other => AgentEvent::Other {
                event: sse.event.clone(),
                kind: other.to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::ChainCompleted { .. } | AgentEvent::ChainError { .. })
    }
}

/// Success payload of a run that ended with `chain-completed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunCompletion {
    pub uuid: Option<String>,
    pub response: Option<String>,
}

/// Decide a run's result from its event list. The first terminal event wins;
/// a list without one is a failed run.
pub fn run_result(events: &[AgentEvent]) -> Result<RunCompletion, String> {
    match events.iter().find(|e| e.is_terminal()) {
        Some(AgentEvent::ChainCompleted { uuid, response }) => Ok(RunCompletion {
            uuid: uuid.clone(),
            response: response.clone(),
        }),
        Some(AgentEvent::ChainError { message }) => Err(message.clone()),
        _ => Err("event stream ended without a completion or error event".into()),
    }
}

/// Decode a streamed response body into the run's event list. Reading stops
/// at the end of the body; a broken connection is a transport error.
pub async fn read_events<S, B, E>(body: S, behavior: &str) -> Result<Vec<AgentEvent>, ScanError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let stream = body.eventsource();
    pin_mut!(stream);

    let mut events = Vec::new();
    while let Some(sse) = stream.next().await {
        let sse = sse.map_err(|e| ScanError::Transport(format!("Agent stream interrupted: {}", e)))?;
        let event = AgentEvent::from_sse(&sse);
        debug!(behavior, ?event, "Agent event");
        events.push(event);
    }
    Ok(events)
}
