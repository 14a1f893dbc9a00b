/// Sound engine: procedural chiptune effects via rodio.
///
/// All effects are synthesized into in-memory WAV buffers at init time and
/// played fire-and-forget through a detached Sink.
///
/// Without the "sound" feature the stub SoundEngine does nothing.

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::TAU;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_add: Arc<Vec<u8>>,
        sfx_remove: Arc<Vec<u8>>,
        sfx_wall: Arc<Vec<u8>>,
        sfx_obstacle: Arc<Vec<u8>>,
        sfx_missed: Arc<Vec<u8>>,
        sfx_success: Arc<Vec<u8>>,
        sfx_chime: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_add: Arc::new(make_wav(&gen_blip(880.0, 0.05, 0.25))),
                sfx_remove: Arc::new(make_wav(&gen_blip(440.0, 0.05, 0.25))),
                sfx_wall: Arc::new(make_wav(&gen_thud())),
                sfx_obstacle: Arc::new(make_wav(&gen_slide_down())),
                sfx_missed: Arc::new(make_wav(&gen_sequence(&[440.0, 370.0, 311.0], 0.11))),
                sfx_success: Arc::new(make_wav(&gen_fanfare())),
                sfx_chime: Arc::new(make_wav(&gen_sequence(&[784.0, 1047.0], 0.08))),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            self.play_bytes(buf.as_ref().clone());
        }

        fn play_bytes(&self, bytes: Vec<u8>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(bytes)) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        /// Footstep; pitch climbs as the program progresses.
        pub fn play_step(&self, step: usize) {
            let freq = 330.0 + (step.min(16) as f32) * 40.0;
            self.play_bytes(make_wav(&gen_blip(freq, 0.04, 0.2)));
        }

        pub fn play_add(&self) { self.play(&self.sfx_add); }
        pub fn play_remove(&self) { self.play(&self.sfx_remove); }
        pub fn play_wall(&self) { self.play(&self.sfx_wall); }
        pub fn play_obstacle(&self) { self.play(&self.sfx_obstacle); }
        pub fn play_missed(&self) { self.play(&self.sfx_missed); }
        pub fn play_success(&self) { self.play(&self.sfx_success); }
        pub fn play_chime(&self) { self.play(&self.sfx_chime); }
    }

    // ── Waveform generators (mono f32 samples) ──

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Notes played back to back, square-ish timbre.
    fn gen_sequence(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.28);
            }
        }
        fade_tail(&mut samples, 4);
        samples
    }

    /// Wall bump: low tone under a noise burst.
    fn gen_thud() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.14) as usize;
        let mut rng: u32 = 0x2545_f491;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * (140.0 - t * 60.0) * TAU).sin();
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.6 + noise * 0.4) * (1.0 - t).powf(1.5) * 0.35
            })
            .collect()
    }

    /// Obstacle: descending whistle.
    fn gen_slide_down() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.2) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                (ti * (700.0 - t * 450.0) * TAU).sin() * (1.0 - t).powf(0.6) * 0.25
            })
            .collect()
    }

    /// Success: C major arpeggio with a held top note.
    fn gen_fanfare() -> Vec<f32> {
        let mut samples = gen_sequence(&[523.0, 659.0, 784.0], 0.1);
        let n = (SAMPLE_RATE as f32 * 0.3) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            let wave = (t * 1047.0 * TAU).sin() * 0.7 + (t * 2094.0 * TAU).sin() * 0.3;
            samples.push(wave * env * 0.3);
        }
        samples
    }

    fn fade_tail(samples: &mut [f32], fraction: usize) {
        let total = samples.len();
        let fade_len = total / fraction.max(1);
        if fade_len == 0 {
            return;
        }
        for i in (total - fade_len)..total {
            samples[i] *= (total - i) as f32 / fade_len as f32;
        }
    }

    // ── WAV encoder: 16-bit PCM mono ──

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_step(&self, _step: usize) {}
    pub fn play_add(&self) {}
    pub fn play_remove(&self) {}
    pub fn play_wall(&self) {}
    pub fn play_obstacle(&self) {}
    pub fn play_missed(&self) {}
    pub fn play_success(&self) {}
    pub fn play_chime(&self) {}
}

/// Play the effect for each session event.
pub fn play_events(sound: &SoundEngine, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::BlockAdded => sound.play_add(),
            GameEvent::BlockRemoved => sound.play_remove(),
            GameEvent::StepCommitted { step, .. } => sound.play_step(*step),
            GameEvent::HitWall => sound.play_wall(),
            GameEvent::HitObstacle => sound.play_obstacle(),
            GameEvent::MissedTarget => sound.play_missed(),
            GameEvent::ReachedTarget => sound.play_success(),
            GameEvent::HintArrived | GameEvent::LevelStarted { .. } => sound.play_chime(),
            GameEvent::RunStarted => {}
        }
    }
}
