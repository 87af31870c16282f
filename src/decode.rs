// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Sample decoding into resident buffers.
//!
//! This module provides:
//! - RIFF/WAVE header classification for the two stored codecs
//! - Zero-copy residency for linear PCM (the file bytes become the buffer)
//! - IMA ADPCM block decode into fresh 16-bit PCM
//! - Mono enforcement for positional requests

mod adpcm;
mod error;
mod wav;

use std::ops::Range;

use tracing::debug;

pub use error::DecodeError;

/// How a resident buffer was produced. Determines which release path the
/// original allocation follows and is surfaced in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    /// Linear PCM reused straight from the file read, payload pointing at the
    /// data chunk inside the original allocation.
    PcmFile,
    /// Produced by the ADPCM decoder; the compressed file bytes were dropped.
    AdpcmDecoded,
}

/// One resident decoded sample buffer.
///
/// Holds the backing allocation together with the payload range and format
/// metadata. Shared between the registry and playback voices via `Arc`, so a
/// voice still reading an evicted buffer keeps it alive until it stops.
#[derive(Debug)]
pub struct SampleBuffer {
    bytes: Vec<u8>,
    payload: Range<usize>,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    origin: BufferOrigin,
}

impl SampleBuffer {
    /// The PCM frame bytes.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.payload.clone()]
    }

    /// Resident size in bytes: the whole backing allocation, which for
    /// zero-copy PCM includes the file header around the payload.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the sample rate of the PCM payload.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the bit depth of the PCM payload.
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Returns how this buffer was produced.
    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }
}

#[cfg(test)]
impl SampleBuffer {
    /// Builds a decoded-form buffer straight from samples, for bookkeeping
    /// tests that don't need a file behind the buffer.
    pub(crate) fn from_samples(samples: &[i16], channels: u16, sample_rate: u32) -> SampleBuffer {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let payload = 0..bytes.len();
        SampleBuffer {
            bytes,
            payload,
            channels,
            sample_rate,
            bits_per_sample: 16,
            origin: BufferOrigin::AdpcmDecoded,
        }
    }
}

/// Decodes a fully read audio file into a resident buffer.
///
/// Linear PCM takes ownership of `bytes` unchanged; IMA ADPCM decodes into a
/// new allocation and drops the compressed bytes. A positional request
/// (`require_mono`) is rejected before any decode work if the file carries
/// more than one channel.
pub fn decode(bytes: Vec<u8>, require_mono: bool) -> Result<SampleBuffer, DecodeError> {
    let header = wav::parse(&bytes)?;

    if require_mono && header.channels != 1 {
        return Err(DecodeError::ChannelMismatch(header.channels));
    }

    match header.codec {
        wav::Codec::Pcm => {
            debug!(
                channels = header.channels,
                sample_rate = header.sample_rate,
                payload_bytes = header.data.len(),
                "Resident PCM buffer from file bytes"
            );
            Ok(SampleBuffer {
                payload: header.data.clone(),
                channels: header.channels,
                sample_rate: header.sample_rate,
                bits_per_sample: header.bits_per_sample,
                origin: BufferOrigin::PcmFile,
                bytes,
            })
        }
        wav::Codec::ImaAdpcm => {
            // Fall back to the computed per-block sample count if the fmt
            // extension carries a zero.
            let samples_per_block = match header.samples_per_block {
                Some(spb) if spb > 0 => spb as usize,
                _ => {
                    let nibble_bytes = (header.block_align as usize)
                        .saturating_sub(4 * header.channels as usize);
                    nibble_bytes * 2 / header.channels as usize + 1
                }
            };
            let pcm = adpcm::decode_blocks(
                &bytes[header.data.clone()],
                header.channels,
                header.block_align as usize,
                samples_per_block,
            )?;
            debug!(
                channels = header.channels,
                sample_rate = header.sample_rate,
                compressed_bytes = header.data.len(),
                decoded_bytes = pcm.len(),
                "Decoded ADPCM into resident buffer"
            );
            let payload = 0..pcm.len();
            Ok(SampleBuffer {
                bytes: pcm,
                payload,
                channels: header.channels,
                sample_rate: header.sample_rate,
                bits_per_sample: 16,
                origin: BufferOrigin::AdpcmDecoded,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{adpcm_wav_bytes, pcm_wav_bytes};

    #[test]
    fn test_pcm_zero_copy_round_trip() {
        let samples = [0i16, 1000, -1000, 32767, -32768, 12345];
        let bytes = pcm_wav_bytes(&samples, 1, 22050);
        let source = bytes.clone();
        let source_ptr = bytes.as_ptr() as usize;

        let buffer = decode(bytes, false).unwrap();

        assert_eq!(buffer.origin(), BufferOrigin::PcmFile);
        assert_eq!(buffer.size_bytes(), source.len());

        // Byte-identical to the source file's payload.
        let payload_offset = source.len() - buffer.payload().len();
        assert_eq!(buffer.payload(), &source[payload_offset..]);

        // Pointer-identical: the payload lives inside the original allocation.
        let payload_ptr = buffer.payload().as_ptr() as usize;
        assert_eq!(payload_ptr, source_ptr + payload_offset);
    }

    #[test]
    fn test_adpcm_decodes_into_fresh_buffer() {
        let block = [0u8, 0, 0, 0, 0x74, 0x0C, 0x00, 0x00];
        let bytes = adpcm_wav_bytes(&block, 1, 11025, 8, 9);

        let buffer = decode(bytes, false).unwrap();

        assert_eq!(buffer.origin(), BufferOrigin::AdpcmDecoded);
        assert_eq!(buffer.bits_per_sample(), 16);
        assert_eq!(buffer.sample_rate(), 11025);
        // 9 decoded 16-bit samples.
        assert_eq!(buffer.payload().len(), 18);
        assert_eq!(buffer.size_bytes(), 18);
    }

    #[test]
    fn test_mono_enforcement() {
        let stereo = pcm_wav_bytes(&[0i16, 0, 100, -100], 2, 22050);
        assert!(matches!(
            decode(stereo, true),
            Err(DecodeError::ChannelMismatch(2))
        ));

        // The same file is fine when the request is not positional.
        let stereo = pcm_wav_bytes(&[0i16, 0, 100, -100], 2, 22050);
        assert!(decode(stereo, false).is_ok());
    }

    #[test]
    fn test_unrecognized_bytes_fail() {
        assert!(matches!(
            decode(b"garbage".to_vec(), false),
            Err(DecodeError::UnsupportedFormat(_))
        ));
    }
}
