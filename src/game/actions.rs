use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// Out-of-band requests drained at the start of the next tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    /// Fire a throw as if the face had jerked.
    ManualThrow,
    DebugLevitate { entity: EntityId },
    DebugThrow { entity: EntityId, direction: [f32; 3] },
}

/// Both ends of the session's command channel.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    sender: Sender<SessionCommand>,
    receiver: Receiver<SessionCommand>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender other threads can use to feed the session.
    pub fn sender(&self) -> Sender<SessionCommand> {
        self.sender.clone()
    }

    pub fn push(&self, command: SessionCommand) {
        // The receiver lives as long as self, so send cannot fail.
        let _ = self.sender.send(command);
    }

    pub fn drain(&self) -> Vec<SessionCommand> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let queue = CommandQueue::new();
        queue.push(SessionCommand::DebugLevitate { entity: 3 });
        queue.sender().send(SessionCommand::ManualThrow).unwrap();
        assert_eq!(
            queue.drain(),
            vec![
                SessionCommand::DebugLevitate { entity: 3 },
                SessionCommand::ManualThrow
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_string(&SessionCommand::DebugThrow {
            entity: 7,
            direction: [0.0, 0.0, 1.0],
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"command":"debug_throw","entity":7,"direction":[0.0,0.0,1.0]}"#
        );
        let back: SessionCommand = serde_json::from_str(r#"{"command":"manual_throw"}"#).unwrap();
        assert_eq!(back, SessionCommand::ManualThrow);
    }
}
