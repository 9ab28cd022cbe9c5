use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text produced by a completer, plus what the process left behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Model text (process stdout)
    pub text: String,
    /// Diagnostics the model process wrote to stderr
    pub stderr: String,
    /// Exit code from the process
    pub exit_code: i32,
    /// Duration of the call
    #[serde(with = "secs_f64")]
    pub duration: Duration,
}

impl Completion {
    pub fn new(text: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            text,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the model process exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Count lines in the model text
    pub fn text_lines(&self) -> usize {
        self.text.lines().count()
    }
}

mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_serializes_as_seconds() {
        let completion = Completion::new(
            "hello\nworld".into(),
            String::new(),
            0,
            Duration::from_millis(1500),
        );
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["duration"], serde_json::json!(1.5));
        assert!(completion.success());
        assert_eq!(completion.text_lines(), 2);

        let back: Completion = serde_json::from_value(json).unwrap();
        assert_eq!(back.duration, Duration::from_millis(1500));
    }
}
