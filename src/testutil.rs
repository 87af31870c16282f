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

#[cfg(test)]
use std::{io::Cursor, path::Path};

#[cfg(test)]
use hound::{SampleFormat, WavSpec, WavWriter};

#[cfg(test)]
use crate::decode::SampleBuffer;

/// Renders a 16-bit PCM WAV file into memory.
#[cfg(test)]
pub fn pcm_wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let cursor = Cursor::new(&mut bytes);
        let mut writer = WavWriter::new(
            cursor,
            WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        )
        .expect("Error creating WAV writer");
        for sample in samples {
            writer.write_sample(*sample).expect("Error writing sample");
        }
        writer.finalize().expect("Error finalizing WAV");
    }
    bytes
}

/// Writes a 16-bit PCM WAV file to disk.
#[cfg(test)]
pub fn write_pcm_wav(path: &Path, samples: &[i16], channels: u16, sample_rate: u32) {
    std::fs::write(path, pcm_wav_bytes(samples, channels, sample_rate))
        .expect("Error writing WAV fixture");
}

/// Assembles an IMA ADPCM WAV file around raw block data. Built by hand
/// since the WAV tooling used for PCM fixtures only writes linear formats.
#[cfg(test)]
pub fn adpcm_wav_bytes(
    blocks: &[u8],
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    samples_per_block: u16,
) -> Vec<u8> {
    let byte_rate =
        sample_rate * block_align as u32 / samples_per_block.max(1) as u32;

    let mut fmt = Vec::new();
    fmt.extend_from_slice(&0x0011u16.to_le_bytes());
    fmt.extend_from_slice(&channels.to_le_bytes());
    fmt.extend_from_slice(&sample_rate.to_le_bytes());
    fmt.extend_from_slice(&byte_rate.to_le_bytes());
    fmt.extend_from_slice(&block_align.to_le_bytes());
    fmt.extend_from_slice(&4u16.to_le_bytes());
    fmt.extend_from_slice(&2u16.to_le_bytes());
    fmt.extend_from_slice(&samples_per_block.to_le_bytes());

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    let riff_size = 4 + 8 + fmt.len() + 8 + blocks.len();
    bytes.extend_from_slice(&(riff_size as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&fmt);
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(blocks.len() as u32).to_le_bytes());
    bytes.extend_from_slice(blocks);
    bytes
}

/// Builds a bare decoded buffer straight from samples, for bookkeeping tests
/// that don't need a file behind the buffer.
#[cfg(test)]
pub fn decoded_pcm_buffer(samples: &[i16], channels: u16, sample_rate: u32) -> SampleBuffer {
    SampleBuffer::from_samples(samples, channels, sample_rate)
}
