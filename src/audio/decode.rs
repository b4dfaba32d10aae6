use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::AudioSignal;
use crate::error::DecodeError;

/// Bit depth assumed when the container does not report one.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

/// Turns a compressed or PCM file into an [`AudioSignal`].
pub trait Decoder: Send + Sync {
    /// Decode at most `max_seconds` of audio (all of it when `None`).
    fn decode_limited(&self, path: &Path, max_seconds: Option<f64>) -> Result<AudioSignal, DecodeError>;

    fn decode(&self, path: &Path) -> Result<AudioSignal, DecodeError> {
        self.decode_limited(path, None)
    }
}

/// Decoder backed by symphonia's default codec and format registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl Decoder for SymphoniaDecoder {
    fn decode_limited(&self, path: &Path, max_seconds: Option<f64>) -> Result<AudioSignal, DecodeError> {
        decode_audio(path, max_seconds)
    }
}

pub fn decode_audio(path: &Path, max_seconds: Option<f64>) -> Result<AudioSignal, DecodeError> {
    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(DecodeError::Probe)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let container_channels = track.codec_params.channels.map(|c| c.count());
    let sample_rate = track.codec_params.sample_rate.ok_or(DecodeError::UnknownSampleRate)?;
    let bits_per_sample = track
        .codec_params
        .bits_per_sample
        .and_then(|b| u16::try_from(b).ok())
        .filter(|&b| b > 0)
        .unwrap_or(DEFAULT_BITS_PER_SAMPLE);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let max_frames = max_seconds.map(|s| (s * sample_rate as f64) as usize);
    let mut decoded_channels: Option<usize> = None;
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        if let (Some(max), Some(ch)) = (max_frames, decoded_channels) {
            if interleaved.len() >= max * ch {
                break;
            }
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(DecodeError::Packet(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(DecodeError::Packet(e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if decoded_channels.is_none() {
            decoded_channels = Some(spec.channels.count());
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let channels = resolve_channels(decoded_channels, container_channels);
    if let Some(max) = max_frames {
        interleaved.truncate(max * channels);
    }

    let signal = AudioSignal::from_interleaved(&interleaved, channels, sample_rate, bits_per_sample);

    log::info!(
        "Decoded audio: {} frames x {} ch, {}Hz, {:.1}s",
        signal.frames_per_channel(),
        signal.channel_count(),
        sample_rate,
        signal.duration_secs()
    );

    Ok(signal)
}

/// The layout of the first decoded packet wins; containers may leave the
/// channel field unset.
fn resolve_channels(decoded: Option<usize>, container: Option<usize>) -> usize {
    decoded.or(container).filter(|&c| c > 0).unwrap_or(1)
}
