// Audio module - WAV input/output and resampling
//
// Everything that touches raw audio samples on disk lives here. Downstream
// stages (flatfielding, spectrogram extraction) only ever see `Waveform`.

pub mod io;
pub mod resample;

pub use io::{load_resampled, read_audio, write_audio, ChannelMode, Waveform, WAV_EXTENSION};
pub use resample::resample_mono;
