use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

pub const SAMPLE_RATE: u32 = 44100;

/// Streaming audio source backed by a channel. When there's no data, it outputs silence to avoid
/// underruns.
struct StreamSource {
    rx: Receiver<i16>,
    sample_rate: u32,
}

impl Iterator for StreamSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let s = self.rx.try_recv().unwrap_or(0);
        Some(s as f32 / 32768.0)
    }
}

impl Source for StreamSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}

/// Output device plus the sink the emulator feeds. Pausing the sink stops
/// the device callback from pulling samples.
pub struct AudioOutput {
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    sink: Sink,
    tx: SyncSender<i16>,
}

impl AudioOutput {
    /// Open the default device, or `None` when there is no usable output
    pub fn open() -> Option<Self> {
        let (stream, handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to initialize audio: {}. Audio will be disabled.", e);
                return None;
            }
        };
        let sink = match Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                log::warn!("Failed to start audio playback: {}", e);
                return None;
            }
        };

        let (tx, rx) = sync_channel::<i16>(SAMPLE_RATE as usize * 2);
        sink.append(StreamSource {
            rx,
            sample_rate: SAMPLE_RATE,
        });
        Some(Self {
            _stream: stream,
            _handle: handle,
            sink,
            tx,
        })
    }

    pub fn queue(&self, samples: &[i16]) {
        for &s in samples {
            // Drop samples rather than block the frame when the device lags
            if self.tx.try_send(s).is_err() {
                break;
            }
        }
    }

    pub fn pause(&self) {
        self.sink.pause();
    }

    pub fn resume(&self) {
        self.sink.play();
    }
}
