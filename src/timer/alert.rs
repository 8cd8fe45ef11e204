//! Completion alert played when a countdown reaches zero

use std::{
    f32::consts::PI,
    io::{self, Write},
    time::Duration,
};

/// Notification fired once per completed countdown.
///
/// Errors are reported to the controller, which logs and swallows them.
pub trait CompletionAlert: Send {
    fn play(&mut self) -> anyhow::Result<()>;
}

/// Short sine beep with an exponential decay envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub duration: Duration,
    pub start_gain: f32,
    pub end_gain: f32,
    pub sample_rate: u32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency: 800.0,
            duration: Duration::from_millis(500),
            start_gain: 0.3,
            end_gain: 0.01,
            sample_rate: 44_100,
        }
    }
}

impl Tone {
    /// Render the tone as mono f32 samples
    pub fn samples(&self) -> Vec<f32> {
        let seconds = self.duration.as_secs_f32();
        let count = (self.sample_rate as f32 * seconds) as usize;
        let ratio = self.end_gain / self.start_gain;

        (0..count)
            .map(|i| {
                let t = i as f32 / self.sample_rate as f32;
                let gain = self.start_gain * ratio.powf(t / seconds);
                (2.0 * PI * self.frequency * t).sin() * gain
            })
            .collect()
    }
}

/// Plays a `Tone` on the default output device.
///
/// Only available with the `audio` feature; otherwise `play` always reports
/// that no audio output exists.
#[derive(Debug, Clone, Default)]
pub struct ToneAlert {
    pub tone: Tone,
}

impl CompletionAlert for ToneAlert {
    #[cfg(feature = "audio")]
    fn play(&mut self) -> anyhow::Result<()> {
        let tone = self.tone.clone();
        // The output stream is not Send; open and drive it on its own thread
        std::thread::Builder::new()
            .name("completion-tone".into())
            .spawn(move || {
                if let Err(e) = play_on_default_device(&tone) {
                    tracing::debug!("Completion tone unavailable: {}", e);
                }
            })?;
        Ok(())
    }

    #[cfg(not(feature = "audio"))]
    fn play(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("built without audio output support")
    }
}

#[cfg(feature = "audio")]
fn play_on_default_device(tone: &Tone) -> anyhow::Result<()> {
    let (_stream, handle) = rodio::OutputStream::try_default()?;
    let sink = rodio::Sink::try_new(&handle)?;
    sink.append(rodio::buffer::SamplesBuffer::new(1, tone.sample_rate, tone.samples()));
    sink.sleep_until_end();
    Ok(())
}

/// Rings the terminal bell on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl CompletionAlert for TerminalBell {
    fn play(&mut self) -> anyhow::Result<()> {
        let mut stderr = io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_expected_length_and_envelope() {
        let tone = Tone::default();
        let samples = tone.samples();
        assert_eq!(samples.len(), 22_050);
        assert_eq!(samples[0], 0.0);

        let head = samples[..500].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let tail = samples[samples.len() - 500..].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(head <= 0.3 + f32::EPSILON);
        assert!(head > 0.25);
        assert!(tail < 0.02);
    }

    #[test]
    fn terminal_bell_plays() {
        assert!(TerminalBell.play().is_ok());
    }
}
