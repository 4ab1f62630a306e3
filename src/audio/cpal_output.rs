use crate::audio::{AudioBuffer, AudioOutput, OutputError, OutputHandle};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, StreamConfig};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};
use tracing::{error, info, warn};

/// Default-device output built on cpal.
pub struct CpalOutput {
    live_streams: usize,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self { live_streams: 0 }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn acquire(&mut self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputHandle>, OutputError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| OutputError::Unavailable("No output device available".into()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| OutputError::Unavailable(format!("Failed to get default output config: {}", e)))?;

        let config: StreamConfig = supported.config();
        let device_rate = config.sample_rate;
        let device_channels = config.channels as usize;

        let voice = Arc::new(Mutex::new(Voice::new(device_rate)));
        let gain = Arc::new(AtomicU32::new(1.0f32.to_bits()));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, voice.clone(), gain.clone()),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, voice.clone(), gain.clone()),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, voice.clone(), gain.clone()),
            format => {
                return Err(OutputError::Unavailable(format!(
                    "Unsupported sample format: {:?}",
                    format
                )))
            }
        }?;

        self.live_streams += 1;
        info!(
            "Output stream opened: device {}Hz x{} for buffer {}Hz x{} (live={})",
            device_rate, device_channels, sample_rate, channels, self.live_streams
        );

        Ok(Box::new(CpalHandle {
            stream,
            voice,
            gain,
        }))
    }

    fn release(&mut self, mut handle: Box<dyn OutputHandle>) {
        handle.stop();
        drop(handle);
        self.live_streams = self.live_streams.saturating_sub(1);
        info!("Output stream released (live={})", self.live_streams);
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    voice: Arc<Mutex<Voice>>,
    gain: Arc<AtomicU32>,
) -> Result<cpal::Stream, OutputError>
where
    T: SizedSample + FromSample<f32>,
{
    let out_channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                let gain = f32::from_bits(gain.load(Ordering::Relaxed));
                match voice.lock() {
                    Ok(mut voice) => voice.fill(&mut scratch, out_channels, gain),
                    Err(_) => scratch.iter_mut().for_each(|s| *s = 0.0),
                }
                for (out, value) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(*value);
                }
            },
            |err| error!("Audio output error: {}", err),
            None,
        )
        .map_err(|e| OutputError::Unavailable(format!("Failed to build output stream: {}", e)))
}

struct CpalHandle {
    stream: cpal::Stream,
    voice: Arc<Mutex<Voice>>,
    gain: Arc<AtomicU32>,
}

impl OutputHandle for CpalHandle {
    fn start(&mut self, buffer: Arc<AudioBuffer>, offset_secs: f64, rate: f64) -> Result<(), OutputError> {
        {
            let mut voice = self
                .voice
                .lock()
                .map_err(|e| OutputError::Stream(e.to_string()))?;
            voice.start(buffer, offset_secs, rate);
        }
        self.stream
            .play()
            .map_err(|e| OutputError::Stream(format!("Failed to start stream: {}", e)))
    }

    fn stop(&mut self) {
        if let Ok(mut voice) = self.voice.lock() {
            voice.stop();
        }
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause output stream: {}", e);
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn set_rate(&mut self, rate: f64) {
        if let Ok(mut voice) = self.voice.lock() {
            voice.set_rate(rate);
        }
    }
}

/// Render state shared with the device callback.
struct Voice {
    device_rate: u32,
    buffer: Option<Arc<AudioBuffer>>,
    /// Read position in source frames
    cursor: f64,
    /// Source frames advanced per device frame
    step: f64,
    playing: bool,
}

impl Voice {
    fn new(device_rate: u32) -> Self {
        Self {
            device_rate,
            buffer: None,
            cursor: 0.0,
            step: 1.0,
            playing: false,
        }
    }

    fn start(&mut self, buffer: Arc<AudioBuffer>, offset_secs: f64, rate: f64) {
        self.cursor = offset_secs.max(0.0) * buffer.sample_rate() as f64;
        self.buffer = Some(buffer);
        self.set_rate(rate);
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn set_rate(&mut self, rate: f64) {
        let source_rate = self
            .buffer
            .as_ref()
            .map(|b| b.sample_rate() as f64)
            .unwrap_or(self.device_rate as f64);
        self.step = rate * source_rate / self.device_rate.max(1) as f64;
    }

    /// Fill an interleaved device buffer; silence when stopped or past the end
    fn fill(&mut self, out: &mut [f32], out_channels: usize, gain: f32) {
        let out_channels = out_channels.max(1);
        let Some(buffer) = self.buffer.as_ref().filter(|_| self.playing) else {
            out.iter_mut().for_each(|s| *s = 0.0);
            return;
        };

        let frames = buffer.frame_count();
        let source_channels = buffer.channel_count() as usize;

        for frame in out.chunks_mut(out_channels) {
            if self.cursor >= frames as f64 {
                self.playing = false;
                frame.iter_mut().for_each(|s| *s = 0.0);
                continue;
            }

            let index = self.cursor as usize;
            let frac = (self.cursor - index as f64) as f32;
            for (c, slot) in frame.iter_mut().enumerate() {
                let samples = buffer.channel(c % source_channels).unwrap_or(&[]);
                let a = samples.get(index).copied().unwrap_or(0.0);
                let b = samples.get(index + 1).copied().unwrap_or(a);
                *slot = (a + (b - a) * frac) * gain;
            }
            self.cursor += self.step;
        }
    }
}
