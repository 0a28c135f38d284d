//! Completion chimes.
//!
//! [`RodioSound`] synthesizes tones on the default output device (behind the
//! `audio` feature). [`TerminalBell`] rings `BEL` and is used when no audio
//! device is available.

use crate::ports::SoundPort;
use std::cell::RefCell;
use std::io::{self, Stderr, Write};
use tracing::warn;

#[cfg(feature = "audio")]
pub use self::rodio_sound::{AudioError, RodioSound};

#[cfg(feature = "audio")]
mod rodio_sound {
    use crate::ports::SoundPort;
    use rodio::source::{SineWave, Source, Zero};
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use std::time::Duration;
    use thiserror::Error;
    use tracing::warn;

    #[derive(Error, Debug)]
    pub enum AudioError {
        #[error("Failed to initialize audio output: {0}")]
        Stream(#[from] rodio::StreamError),
        #[error("Failed to play audio: {0}")]
        Play(#[from] rodio::PlayError),
    }

    /// A tone in a chime: frequency in Hz and length in milliseconds.
    type Note = (f32, u64);

    /// Rising A5 to C6 after a work session.
    const WORK_CHIME: &[Note] = &[(880.0, 150), (1046.5, 200)];
    /// Falling E5 to A4 after a break.
    const BREAK_CHIME: &[Note] = &[(659.25, 150), (440.0, 250)];

    const GAP: Duration = Duration::from_millis(50);

    pub struct RodioSound {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl RodioSound {
        /// Opens the default output device.
        pub fn new() -> Result<Self, AudioError> {
            let (stream, handle) = OutputStream::try_default()?;
            Ok(Self {
                _stream: stream,
                handle,
            })
        }

        fn play(&self, notes: &[Note]) -> Result<(), AudioError> {
            let sink = Sink::try_new(&self.handle)?;
            for (i, &(frequency, millis)) in notes.iter().enumerate() {
                if i > 0 {
                    sink.append(Zero::<f32>::new(1, 44100).take_duration(GAP));
                }
                sink.append(
                    SineWave::new(frequency)
                        .take_duration(Duration::from_millis(millis))
                        .amplify(0.3),
                );
            }
            // Play in background
            sink.detach();
            Ok(())
        }

        fn chime(&self, notes: &[Note]) {
            if let Err(e) = self.play(notes) {
                warn!(error = %e, "failed to play chime");
            }
        }
    }

    impl SoundPort for RodioSound {
        fn play_work_complete(&self) {
            self.chime(WORK_CHIME);
        }

        fn play_break_complete(&self) {
            self.chime(BREAK_CHIME);
        }
    }

}

/// Rings `BEL` on a writer: two chimes for a finished work session, one for
/// a finished break.
pub struct TerminalBell<W: Write = Stderr> {
    out: RefCell<W>,
}

impl TerminalBell {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    fn ring(&self, chimes: usize) {
        let mut out = self.out.borrow_mut();
        if let Err(e) = out
            .write_all("\x07".repeat(chimes).as_bytes())
            .and_then(|()| out.flush())
        {
            warn!(error = %e, "failed to ring terminal bell");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> SoundPort for TerminalBell<W> {
    fn play_work_complete(&self) {
        self.ring(2);
    }

    fn play_break_complete(&self) {
        self.ring(1);
    }
}
