// Resample module - band-limited sample rate conversion
//
// Clips are loaded at one fixed rate before flatfielding so that "N seconds"
// always means the same number of samples. Conversion uses rubato's sinc
// interpolator with an anti-aliasing cutoff just below Nyquist.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::AudioError;

const CHUNK_SIZE: usize = 1024;

/// Resample a mono signal from `source_rate` to `target_rate`.
///
/// The output is truncated to `round(len * target_rate / source_rate)` samples.
pub fn resample_mono(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AudioError::ResampleFailed {
            reason: format!(
                "sample rates must be > 0 (got {} -> {})",
                source_rate, target_rate
            ),
        });
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    // max_resample_ratio_relative must cover the actual ratio
    let max_ratio = ratio.max(1.0 / ratio) * 1.1;

    let mut resampler = SincFixedIn::<f32>::new(ratio, max_ratio, params, CHUNK_SIZE, 1)
        .map_err(|err| AudioError::ResampleFailed {
            reason: err.to_string(),
        })?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + CHUNK_SIZE);
    for chunk in samples.chunks(CHUNK_SIZE) {
        let mut block = chunk.to_vec();
        block.resize(CHUNK_SIZE, 0.0);

        let resampled = resampler
            .process(&[block], None)
            .map_err(|err| AudioError::ResampleFailed {
                reason: err.to_string(),
            })?;
        output.extend_from_slice(&resampled[0]);
    }

    // Flush the filter delay so the tail of the signal is not lost
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    while output.len() < expected_len {
        let resampled = resampler
            .process(&[vec![0.0f32; CHUNK_SIZE]], None)
            .map_err(|err| AudioError::ResampleFailed {
                reason: err.to_string(),
            })?;
        if resampled[0].is_empty() {
            break;
        }
        output.extend_from_slice(&resampled[0]);
    }

    output.truncate(expected_len);
    output.resize(expected_len, 0.0);
    Ok(output)
}
