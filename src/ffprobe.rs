use std::path::Path;

use serde::Deserialize;
use serde_aux::prelude::*;

#[derive(thiserror::Error, Debug)]
pub enum FfprobeError {
    #[error("I/O error")]
    IoError(#[from] std::io::Error),
    #[error("ffprobe exited with {0}")]
    NonZeroExit(std::process::ExitStatus),
    #[error("Could not parse ffprobe output")]
    ParseOutput(#[from] serde_json::Error),
    #[error("No duration in ffprobe output")]
    MissingDuration,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    duration: Option<f64>,
}

/// Reads the duration of a finished recording, in seconds.
pub async fn probe_duration(input: &Path) -> Result<f64, FfprobeError> {
    let output = tokio::process::Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("json")
        .arg(input)
        .output()
        .await?;

    if !output.status.success() {
        return Err(FfprobeError::NonZeroExit(output.status));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(bytes: &[u8]) -> Result<f64, FfprobeError> {
    let parsed: ProbeOutput = serde_json::from_slice(bytes)?;
    parsed
        .format
        .and_then(|f| f.duration)
        .ok_or(FfprobeError::MissingDuration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_string_typed() {
        let out = br#"{"format": {"duration": "5025.347000"}}"#;
        let duration = parse_probe_output(out).expect("duration");
        assert!((duration - 5025.347).abs() < 1e-6);
    }

    #[test]
    fn missing_duration_is_an_error() {
        assert!(matches!(
            parse_probe_output(br#"{"format": {}}"#),
            Err(FfprobeError::MissingDuration)
        ));
        assert!(matches!(
            parse_probe_output(br#"{}"#),
            Err(FfprobeError::MissingDuration)
        ));
    }
}
